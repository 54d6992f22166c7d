//! Detail transforms
//!
//! The computation behind the detail pane. It runs on the detail worker
//! thread, never on the consumer thread.

use thiserror::Error;

/// Why a transform produced no text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// No transform is defined; the raw value is shown instead
    #[error("transform not implemented")]
    Unimplemented,

    /// The transform ran and failed
    #[error("{0}")]
    Failed(String),
}

/// Derives the detail text for a selected row
pub trait DetailTransform {
    fn transform(&self, key: u64, value: &str) -> Result<String, TransformError>;
}

impl<F> DetailTransform for F
where
    F: Fn(u64, &str) -> Result<String, TransformError>,
{
    fn transform(&self, key: u64, value: &str) -> Result<String, TransformError> {
        self(key, value)
    }
}

/// Default transform: always falls back to the raw value
#[derive(Debug, Clone, Copy, Default)]
pub struct RawValue;

impl DetailTransform for RawValue {
    fn transform(&self, _key: u64, _value: &str) -> Result<String, TransformError> {
        Err(TransformError::Unimplemented)
    }
}
