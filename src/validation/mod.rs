//! Validation requests and their persisted outcomes

mod outcome;
mod request;

pub use outcome::{ValidationOutcome, ValidationStatus, ValidationUpdate};
pub use request::{
    ValidationRequest, ValidationType, DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY,
};
