use thiserror::Error;

/// Client-side validation failures. These are shown inline and never sent to
/// the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid amount.")]
    InvalidAmount,

    #[error("Please enter a valid phone number.")]
    InvalidPhone,

    #[error("Select a wallet provider.")]
    MissingProvider,

    #[error("Please enter account number and bank.")]
    MissingBankDetails,

    #[error("Enter stake for all bets.")]
    MissingStakes,

    #[error("Enter a total stake.")]
    MissingTotalStake,

    #[error("Please sign in to place bets.")]
    SignInRequired,

    #[error("Select at least two selections for a multiple bet.")]
    NotEnoughSelections,

    #[error("Unknown selection '{0}'.")]
    UnknownSelection(String),
}

/// Failures talking to the sportsbook backend.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The backend answered with an error body; `message` is its own text.
    #[error("backend error {status}: {}", message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not signed in")]
    Unauthenticated,
}

impl ClientError {
    /// Text to show the user: the backend's own message when it sent one,
    /// validation text verbatim, otherwise the per-action fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            ClientError::Validation(v) => v.to_string(),
            ClientError::Unauthenticated => ValidationError::SignInRequired.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_preferred() {
        let err = ClientError::Api {
            status: 400,
            message: Some("Insufficient balance".into()),
        };
        assert_eq!(err.user_message("Failed to place bet"), "Insufficient balance");
    }

    #[test]
    fn test_fallback_when_no_message() {
        let err = ClientError::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.user_message("Failed to place bet"), "Failed to place bet");

        let blank = ClientError::Api {
            status: 500,
            message: Some("  ".into()),
        };
        assert_eq!(blank.user_message("Deposit error"), "Deposit error");
    }

    #[test]
    fn test_validation_text_is_shown_verbatim() {
        let err = ClientError::from(ValidationError::MissingStakes);
        assert_eq!(err.user_message("Failed to place bet"), "Enter stake for all bets.");
    }
}
