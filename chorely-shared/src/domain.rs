use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle of a chore assignment: `Pending -> Completed -> Approved`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChoreStatus {
    Pending,
    Completed,
    Approved,
}

impl ChoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoreStatus::Pending => "Pending",
            ChoreStatus::Completed => "Completed",
            ChoreStatus::Approved => "Approved",
        }
    }

    /// Only a pending chore can be marked done by its assignee.
    pub fn can_complete(&self) -> bool {
        matches!(self, ChoreStatus::Pending)
    }

    /// Only a completed chore is waiting for a parent's approval.
    pub fn can_approve(&self) -> bool {
        matches!(self, ChoreStatus::Completed)
    }
}

impl fmt::Display for ChoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoreStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ChoreStatus::Pending),
            "Completed" => Ok(ChoreStatus::Completed),
            "Approved" => Ok(ChoreStatus::Approved),
            other => Err(ParseEnumError {
                kind: "chore status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    #[default]
    OneTime,
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneTime => "one-time",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time" => Ok(Frequency::OneTime),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(ParseEnumError {
                kind: "frequency",
                value: other.to_string(),
            }),
        }
    }
}

/// Why a user's points balance changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointsReason {
    Approval,
    Redemption,
    Adjustment,
}

impl PointsReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsReason::Approval => "approval",
            PointsReason::Redemption => "redemption",
            PointsReason::Adjustment => "adjustment",
        }
    }
}

impl FromStr for PointsReason {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approval" => Ok(PointsReason::Approval),
            "redemption" => Ok(PointsReason::Redemption),
            "adjustment" => Ok(PointsReason::Adjustment),
            other => Err(ParseEnumError {
                kind: "points reason",
                value: other.to_string(),
            }),
        }
    }
}

/// Parses a due date given either as an RFC 3339 timestamp or a plain
/// `YYYY-MM-DD` day (interpreted as midnight UTC).
pub fn parse_due_date(input: &str) -> Result<NaiveDateTime, String> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date: {s}"));
    }
    Err(format!(
        "invalid date '{s}': expected RFC 3339 timestamp or YYYY-MM-DD"
    ))
}

/// Formats a stored UTC timestamp for the wire.
pub fn to_rfc3339(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
