use std::fmt;

/// Where a scrape invocation currently is
///
/// Stages advance in declaration order. `Failed` can follow any non-terminal
/// stage; `Completed` only follows `Notifying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    Validating,
    Fetching,
    Parsing,
    Persisting,
    Notifying,
    Completed,
    Failed,
}

impl ScrapeStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Persisting => "persisting",
            Self::Notifying => "notifying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
