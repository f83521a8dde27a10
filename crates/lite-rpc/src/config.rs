use serde::{Deserialize, Serialize};

/// Runtime switches for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Reply to params validation failures with `-32602 Invalid params`.
    /// When `false` they are treated like any other failure and go through
    /// the error mapper.
    pub validation_errors_as_invalid_params: bool,

    /// Message of the `-32603` reply used when a handler panics or the error
    /// mapper cannot produce an answer.
    pub internal_error_message: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            validation_errors_as_invalid_params: true,
            internal_error_message: "Something went wrong".to_string(),
        }
    }
}
