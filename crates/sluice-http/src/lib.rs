//! # sluice-http
//!
//! The HTTP side of sluice: every CRUD request runs through a
//! [`CrudController`] (merge, validate, authorize) before any routine is
//! invoked, results go out in a [`ResponseEnvelope`], and every failure ends
//! up as an [`HttpError`] rendered by the error middleware.

pub mod envelope;
pub mod errors;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod router;

pub use envelope::{timestamp, ErrorBody, ResponseEnvelope};
pub use errors::{ErrorReport, HttpError, HttpResult};
pub use logging::{init_logging, LoggingConfig};
pub use middleware::ErrorHandlerConfig;
pub use pipeline::{CrudController, CrudIntent, Rejection, RequestInput, ValidatedParams, ValidationOutcome};
pub use router::ApiRouter;
