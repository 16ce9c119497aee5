//! # Prelude
//!
//! ```rust
//! use sluice::prelude::*;
//! ```

pub use crate::Server;

pub use sluice_core::{AppConfig, AppConfigTrait, DatabaseConfig, Environment};

pub use sluice_gateway::{
    DatabaseGateway, DatabaseValue, GatewayError, MemoryBackend, Parameters, PostgresBackend, ProcedureCall,
    Record, RecordSet, ResultShape, RoutineOutput, TransactionScope,
};

pub use sluice_validation::{FieldSchema, FieldType, InputSchema, Schema, UnknownFields, ValidationError, ValidationErrors};

pub use sluice_auth::{
    AuthContext, Credentials, Identity, IdentityProvider, PermissionGate, SecurityRequirement,
    StaticIdentityProvider, TokenIdentityProvider,
};

pub use sluice_http::{
    ApiRouter, CrudController, ErrorHandlerConfig, HttpError, HttpResult, RequestInput, ResponseEnvelope,
    ValidatedParams, ValidationOutcome,
};
