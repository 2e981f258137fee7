//! Request/response models for the sqlgate REST API.

mod response;

pub use response::{status_for, ApiResponse, ErrorDetail};
