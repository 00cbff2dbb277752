// ⚠️ Feed Errors
// Only configuration and source-fetch failures ever reach the caller

/// Errors surfaced by the feed pipeline and its collaborators.
///
/// Malformed calendar lines are not represented here: the parser drops
/// them silently.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Missing required configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Property store error: {0}")]
    Property(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        FeedError::FetchFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_missing_message() {
        let err = FeedError::ConfigurationMissing("ICS_URL".to_string());
        assert_eq!(err.to_string(), "Missing required configuration: ICS_URL");
    }

    #[test]
    fn test_fetch_failure_message() {
        let err = FeedError::fetch("http://e.com", "HTTP 404");
        assert_eq!(err.to_string(), "Failed to fetch http://e.com: HTTP 404");
    }
}
