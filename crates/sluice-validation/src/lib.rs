//! # sluice-validation
//!
//! Input schemas for the request pipeline: declared fields with type
//! coercion, built-in field rules, and an ordered list of violations when
//! input is rejected.

pub mod error;
pub mod schema;
pub mod traits;
pub mod validators;

pub use error::{ValidationError, ValidationErrors, ValidationResult};
pub use schema::{FieldSchema, FieldType, Schema, UnknownFields};
pub use traits::{InputSchema, ValidationRule};

pub use validators::{
    custom::CustomValidator, email::EmailValidator, length::LengthValidator,
    numeric::NumericValidator, pattern::PatternValidator, required::RequiredValidator,
};
