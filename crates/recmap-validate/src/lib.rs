//! Required-field validation for mapped objects.

mod error;
mod validator;

pub use error::{Result, ValidationError};
pub use validator::{TRANSIENT_FIELDS, Validator};
