use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier grouping the transcript, passages, embeddings and chat log of
/// one recorded meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(pub i64);

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MeetingId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for MeetingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Stored meeting row (transcript and summary, without passages).
#[derive(Debug, Clone, Serialize)]
pub struct MeetingRecord {
    pub id: MeetingId,
    pub transcript: String,
    pub summary: Option<String>,
    pub created_at: i64,
}

impl MeetingRecord {
    /// Display name used by listings.
    pub fn name(&self) -> String {
        format!("Meeting {}", self.id)
    }
}

/// One question/answer exchange recorded against a meeting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub user: String,
    pub bot: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meeting_id() {
        assert_eq!("42".parse::<MeetingId>().unwrap(), MeetingId(42));
        assert_eq!(" 7 ".parse::<MeetingId>().unwrap(), MeetingId(7));
        assert!("abc".parse::<MeetingId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&MeetingId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
