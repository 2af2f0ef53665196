use thiserror::Error;

/// Lifecycle stage during which a failure or timeout occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a pool slot.
    Queue,
    /// Option validation before any resource is touched.
    Configure,
    /// Static fetch of the page body.
    Load,
    /// Browser navigation plus readiness wait.
    Navigation,
    /// Running the caller-supplied extractor.
    Extract,
    /// External cancellation before settlement.
    Cancelled,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Queue => write!(f, "queue"),
            Phase::Configure => write!(f, "configure"),
            Phase::Load => write!(f, "load"),
            Phase::Navigation => write!(f, "navigation"),
            Phase::Extract => write!(f, "extract"),
            Phase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Application-wide error taxonomy, partitioned by failure phase.
///
/// Every error reaching a caller is one of these variants carrying the
/// originating URL and enough context to diagnose without the request;
/// underlying library failures are never surfaced bare.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// Connection-level failure while fetching a page.
    #[error("network error for {url}: {cause}")]
    Network { url: String, cause: String },

    /// The configured deadline elapsed, tagged with the phase it hit.
    #[error("timed out in phase '{phase}' after {elapsed_ms}ms for {url}")]
    Timeout {
        url: String,
        phase: Phase,
        elapsed_ms: u64,
    },

    /// The extractor failed or the expected structure was absent.
    #[error("parse error for {url}: {cause}")]
    Parse {
        url: String,
        /// CSS selector involved in the failure, when known.
        selector: Option<String>,
        cause: String,
    },

    /// Page-level failure during load (non-2xx status, aborted navigation).
    #[error("navigation error for {url}: {cause}")]
    Navigation { url: String, cause: String },

    /// Structurally invalid request or options; no resource was touched.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl ScraperError {
    pub fn network(url: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ScraperError::Network {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    pub fn timeout(url: impl Into<String>, phase: Phase, elapsed: std::time::Duration) -> Self {
        ScraperError::Timeout {
            url: url.into(),
            phase,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn parse(
        url: impl Into<String>,
        selector: Option<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        ScraperError::Parse {
            url: url.into(),
            selector,
            cause: cause.to_string(),
        }
    }

    pub fn navigation(url: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ScraperError::Navigation {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        ScraperError::Configuration {
            reason: reason.into(),
        }
    }

    /// The phase this error occurred in, where one is defined.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ScraperError::Network { .. } => Some(Phase::Load),
            ScraperError::Timeout { phase, .. } => Some(*phase),
            ScraperError::Parse { .. } => Some(Phase::Extract),
            ScraperError::Navigation { .. } => Some(Phase::Navigation),
            ScraperError::Configuration { .. } => Some(Phase::Configure),
        }
    }

    /// True for pre-flight failures where no scraper instance was involved.
    pub fn is_preflight(&self) -> bool {
        matches!(self, ScraperError::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_url_and_phase() {
        let err = ScraperError::timeout(
            "https://example.com",
            Phase::Navigation,
            std::time::Duration::from_millis(1500),
        );
        let msg = err.to_string();
        assert!(msg.contains("navigation"));
        assert!(msg.contains("1500ms"));
        assert!(msg.contains("https://example.com"));
    }

    #[test]
    fn phase_partition() {
        assert_eq!(
            ScraperError::network("u", "reset").phase(),
            Some(Phase::Load)
        );
        assert_eq!(
            ScraperError::parse("u", None, "bad").phase(),
            Some(Phase::Extract)
        );
        assert_eq!(
            ScraperError::configuration("bad timeout").phase(),
            Some(Phase::Configure)
        );
    }

    #[test]
    fn preflight_is_configuration_only() {
        assert!(ScraperError::configuration("queue saturated").is_preflight());
        assert!(!ScraperError::navigation("u", "HTTP 404").is_preflight());
    }

    #[test]
    fn phase_display_is_lowercase() {
        assert_eq!(Phase::Cancelled.to_string(), "cancelled");
        assert_eq!(Phase::Queue.to_string(), "queue");
    }
}
