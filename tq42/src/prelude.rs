//! # Basic imports

pub use crate::errors::{Error, HandlerError, Result};
