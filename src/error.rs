//! Error taxonomy for the extraction and ledger subsystems.
//!
//! Configuration and tab-resolution errors are evaluated eagerly and never
//! consume retry budget. Extraction errors (`ValueNotFound`,
//! `OverlayNotReady`, `CalculatorNotOpened`) surface to the retry layer.
//! `RemoteWrite` propagates uncaught from the ledger writer; callers own
//! the retry policy.

#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("worksheet tab {tab:?} not found in spreadsheet {spreadsheet}")]
    TabNotFound { spreadsheet: String, tab: String },

    #[error("no value found for label {label:?} (all {strategies} strategies exhausted)")]
    ValueNotFound { label: String, strategies: usize },

    #[error("overlay not detected: {0}")]
    OverlayNotReady(String),

    #[error("calculator panel did not open: {0}")]
    CalculatorNotOpened(String),

    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScribeError {
    /// Whether retrying the failed operation can plausibly succeed.
    ///
    /// Configuration and missing-tab errors are deterministic; everything
    /// driven through the browser or the spreadsheet backend is flaky.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ScribeError::Configuration(_) | ScribeError::TabNotFound { .. }
        )
    }
}

pub type Result<T, E = ScribeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_split() {
        assert!(!ScribeError::Configuration("x".into()).is_retryable());
        assert!(!ScribeError::TabNotFound {
            spreadsheet: "s".into(),
            tab: "UK".into()
        }
        .is_retryable());
        assert!(ScribeError::ValueNotFound {
            label: "Total Revenue".into(),
            strategies: 3
        }
        .is_retryable());
        assert!(ScribeError::RemoteWrite("500".into()).is_retryable());
    }

    #[test]
    fn messages_carry_context() {
        let e = ScribeError::TabNotFound {
            spreadsheet: "abc123".into(),
            tab: "UAE".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("UAE"));
        assert!(msg.contains("abc123"));
    }
}
