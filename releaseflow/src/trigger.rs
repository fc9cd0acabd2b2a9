//! Push-event trigger for release runs.

use serde::{Deserialize, Serialize};

/// A push event to a designated branch that triggers a run.
///
/// The carried reference identity doubles as the release tag for terminal
/// stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// The branch that received the push.
    pub branch: String,

    /// The commit sha at the head of the push.
    pub commit: String,

    /// The reference name, used later as the release tag.
    pub reference: String,

    /// When the push happened (ISO 8601).
    pub pushed_at: String,
}

impl PushEvent {
    /// Creates a new push event.
    #[must_use]
    pub fn new(
        branch: impl Into<String>,
        commit: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            commit: commit.into(),
            reference: reference.into(),
            pushed_at: crate::utils::iso_timestamp(),
        }
    }

    /// The tag name terminal stages release under.
    #[must_use]
    pub fn release_tag(&self) -> &str {
        &self.reference
    }

    /// A short form of the commit sha for logging.
    #[must_use]
    pub fn short_commit(&self) -> &str {
        let mut end = self.commit.len().min(12);
        // Back off to a char boundary for non-ASCII identities.
        while !self.commit.is_char_boundary(end) {
            end -= 1;
        }
        &self.commit[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_release_tag() {
        let event = PushEvent::new("main", "0123456789abcdef0123", "v1.2.3");
        assert_eq!(event.release_tag(), "v1.2.3");
        assert_eq!(event.branch, "main");
    }

    #[test]
    fn test_short_commit() {
        let event = PushEvent::new("main", "0123456789abcdef0123", "v1.2.3");
        assert_eq!(event.short_commit(), "0123456789ab");

        let short = PushEvent::new("main", "abc", "v1");
        assert_eq!(short.short_commit(), "abc");
    }

    #[test]
    fn test_short_commit_non_ascii_identity() {
        // 12 bytes would land mid-character; the cut backs off to the
        // previous boundary instead of panicking.
        let event = PushEvent::new("main", "abcdefghijké0123", "v1");
        assert_eq!(event.short_commit(), "abcdefghijk");
    }

    #[test]
    fn test_push_event_serialization() {
        let event = PushEvent::new("main", "abc123", "v1.0.0");
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: PushEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
