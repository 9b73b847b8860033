use carehub_core::error::CoreError;

use crate::session::StoreError;

/// Errors surfaced by client operations.
///
/// None of these are retried automatically; callers turn them into inline
/// text with [`ClientError::user_message`] and wait for the user to act.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (connect, DNS, TLS, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status or a failure envelope.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The server answered 2xx with a body that does not parse.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client-side validation or form addressing error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The session store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Short text suitable for display next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(e) if e.is_timeout() => {
                "The server took too long to respond. Try again.".to_string()
            }
            ClientError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Decode(_) => "The server sent an unexpected response.".to_string(),
            ClientError::Core(CoreError::Validation(message)) => message.clone(),
            ClientError::Core(e) => e.to_string(),
            ClientError::Store(e) => e.to_string(),
        }
    }

    /// HTTP status of a server error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_shown_verbatim() {
        let err = ClientError::Server {
            status: 409,
            message: "Email already registered".into(),
        };
        assert_eq!(err.user_message(), "Email already registered");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn validation_message_drops_prefix() {
        let err = ClientError::from(CoreError::Validation("Passwords do not match".into()));
        assert_eq!(err.user_message(), "Passwords do not match");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn form_errors_use_display_text() {
        let err = ClientError::from(CoreError::MinimumItems {
            list: "treatingDoctors".into(),
            min: 1,
        });
        assert_eq!(err.user_message(), "'treatingDoctors' must keep at least 1 row(s)");
    }
}
