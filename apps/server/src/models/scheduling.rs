//! Appointments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Scheduled => "Scheduled",
            Self::Completed => "Completed",
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Scheduled" => Ok(Self::Scheduled),
            "Completed" => Ok(Self::Completed),
            other => Err(format!("Unknown appointment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    #[serde(rename = "In Person")]
    InPerson,
    #[serde(rename = "Over Call")]
    OverCall,
    Video,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPerson => "In Person",
            Self::OverCall => "Over Call",
            Self::Video => "Video",
        }
    }
}

impl std::str::FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In Person" => Ok(Self::InPerson),
            "Over Call" => Ok(Self::OverCall),
            "Video" => Ok(Self::Video),
            other => Err(format!("Unknown appointment type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_no: String,
    pub patient_name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: String,
    pub services: Vec<String>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_type_round_trip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
        ] {
            assert_eq!(
                status.as_str().parse::<AppointmentStatus>().unwrap(),
                status
            );
        }
        for kind in [
            AppointmentType::InPerson,
            AppointmentType::OverCall,
            AppointmentType::Video,
        ] {
            assert_eq!(kind.as_str().parse::<AppointmentType>().unwrap(), kind);
        }
    }
}
