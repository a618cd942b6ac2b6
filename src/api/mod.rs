//! Backend access: endpoint registry, request executor, error taxonomy.

mod endpoints;
mod error;
mod executor;
mod resource;

pub use endpoints::{EndpointSpec, Mutation, MutationHook, PROFILE_ID, Query, RequestSpec};
pub use error::{ApiError, ApiErrorKind};
pub use executor::RequestExecutor;
pub use resource::{Resource, ResponseShape};
