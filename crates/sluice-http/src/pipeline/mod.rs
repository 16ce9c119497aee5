//! The validate-then-execute pipeline

pub mod controller;
pub mod input;
pub mod outcome;

pub use controller::{CrudController, CrudIntent};
pub use input::RequestInput;
pub use outcome::{Rejection, ValidatedParams, ValidationOutcome};
