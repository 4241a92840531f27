/// Failures anywhere in the detection-to-notification pipeline.
///
/// None of these are fatal to the process. The scheduler catches them at the
/// cycle boundary; only initialization failures reach the user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Capture or OCR used outside its initialize/stop window
    #[error("{0} used before initialization or after release")]
    NotInitialized(&'static str),

    #[error("patient lookup failed: {0}")]
    LookupFailed(String),

    #[error("delivery to {destination} failed: {reason}")]
    DeliveryFailed { destination: String, reason: String },

    /// Nothing usable was extracted, the cycle is skipped
    #[error("no identity found in recognized text")]
    MissingIdentity,

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),
}

impl Error {
    pub fn delivery(destination: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeliveryFailed {
            destination: destination.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors after which the capture/OCR resources cannot be trusted
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::NotInitialized(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
