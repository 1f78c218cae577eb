use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while generating your story.";
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

/// Input problems caught before any request is sent. The display text is
/// what the error banner shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some keywords for your story.")]
    EmptyKeywords,
    #[error("Please enter valid keywords separated by commas.")]
    NoValidKeywords,
    #[error("Please enter no more than 10 keywords.")]
    TooManyKeywords,
}

#[derive(Debug, Error)]
pub enum StoryError {
    /// The backend answered with `success: false`.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Application(Option<String>),
    /// No usable response: connection failure or a body we could not parse.
    /// The inner error is for logs only.
    #[error("{}", NETWORK_FAILURE_MESSAGE)]
    Transport(anyhow::Error),
}

impl StoryError {
    pub fn transport(err: impl Into<anyhow::Error>, context: &'static str) -> Self {
        Self::Transport(err.into().context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_message_falls_back() {
        let err = StoryError::Application(Some("Rate limited".to_string()));
        assert_eq!(err.to_string(), "Rate limited");

        let err = StoryError::Application(None);
        assert_eq!(err.to_string(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_transport_hides_detail() {
        let err = StoryError::transport(anyhow::anyhow!("connection refused"), "Failed to send");
        assert_eq!(err.to_string(), NETWORK_FAILURE_MESSAGE);
        match err {
            StoryError::Transport(detail) => {
                assert!(format!("{:#}", detail).contains("connection refused"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
