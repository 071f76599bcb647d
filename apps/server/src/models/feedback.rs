//! Feedback/issue tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    Pending,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Resolved" => Ok(Self::Resolved),
            other => Err(format!("Unknown issue status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterType {
    Patient,
    Employee,
}

impl ReporterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Employee => "employee",
        }
    }
}

impl std::str::FromStr for ReporterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Self::Patient),
            "employee" => Ok(Self::Employee),
            other => Err(format!("Unknown reporter type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub reported_by: Uuid,
    /// Display string resolved at read time, e.g. "doctor - Jane Doe".
    pub reporter: String,
    pub reporter_type: ReporterType,
    /// The companyAdmin whose tenant this issue belongs to.
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}
