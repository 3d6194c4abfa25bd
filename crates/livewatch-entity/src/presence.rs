//! Presence state value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known presence of one subject on one platform.
///
/// `since` is set exactly while `is_live` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceState {
    /// Whether the subject was live at the last successful check.
    #[serde(default)]
    pub is_live: bool,
    /// Title of the current (or most recent) stream.
    #[serde(default)]
    pub last_title: Option<String>,
    /// When the current live session was first observed.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Time of the last successful check.
    #[serde(default = "epoch")]
    pub last_checked_at: DateTime<Utc>,
}

impl PresenceState {
    /// State of a link that has never been observed live.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            is_live: false,
            last_title: None,
            since: None,
            last_checked_at: now,
        }
    }

    /// Whether the `since`/`is_live` invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.is_live == self.since.is_some()
    }

    /// Restore the `since`/`is_live` invariant. Returns `true` if anything
    /// changed.
    pub fn normalize(&mut self) -> bool {
        match (self.is_live, self.since) {
            (true, None) => {
                self.since = Some(self.last_checked_at);
                true
            }
            (false, Some(_)) => {
                self.since = None;
                true
            }
            _ => false,
        }
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let state: PresenceState = serde_json::from_str("{}").unwrap();
        assert!(!state.is_live);
        assert_eq!(state.since, None);
        assert_eq!(state.last_checked_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_normalize_repairs_since() {
        let now = Utc::now();
        let mut live_without_since = PresenceState {
            is_live: true,
            last_title: None,
            since: None,
            last_checked_at: now,
        };
        assert!(live_without_since.normalize());
        assert_eq!(live_without_since.since, Some(now));

        let mut offline_with_since = PresenceState {
            is_live: false,
            last_title: None,
            since: Some(now),
            last_checked_at: now,
        };
        assert!(offline_with_since.normalize());
        assert!(offline_with_since.is_consistent());
        assert!(!PresenceState::initial(now).clone().normalize());
    }
}
