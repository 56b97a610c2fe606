use thiserror::Error;

/// Failure reported by the diff engine.
///
/// A comparison either happened or it did not. A caller must never read
/// this as "no change".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl DiffError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DiffError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn decode(which: &str, err: impl std::fmt::Display) -> Self {
        Self::invalid(format!("failed to decode {which} image: {err}"))
    }

    pub fn zero_area(width: u32, height: u32) -> Self {
        Self::invalid(format!("comparison area is empty ({width}x{height})"))
    }

    pub fn buffer_length(width: u32, height: u32, len: usize) -> Self {
        Self::invalid(format!(
            "pixel buffer of {len} bytes does not match {width}x{height} RGBA"
        ))
    }

    pub fn message(&self) -> &str {
        match self {
            DiffError::InvalidInput { message } => message,
        }
    }
}
