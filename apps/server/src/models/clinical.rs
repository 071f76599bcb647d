//! Clinical records: consultations, prescriptions, lab-test catalog,
//! vaccination doses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub consultation_no: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub services: Vec<String>,
    pub details: String,
    pub temperature: String,
    pub weight: String,
    pub consultation_date: NaiveDate,
    pub consultation_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One medication line on a prescription, stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionLine {
    pub drug: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub prescription_no: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub lines: Vec<PrescriptionLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lab-test catalog entry with its reference range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTest {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub min: Decimal,
    pub max: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseStatus {
    Completed,
    Pending,
}

impl DoseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
        }
    }
}

impl std::str::FromStr for DoseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Completed" => Ok(Self::Completed),
            "Pending" => Ok(Self::Pending),
            other => Err(format!("Unknown dose status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationDose {
    pub id: Uuid,
    pub dose_no: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub vaccine: String,
    /// Dose label within the series, e.g. "1st" or "Booster".
    pub dose: String,
    pub administered_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<Uuid>,
    pub administered_by: Uuid,
    pub status: DoseStatus,
    pub created_at: DateTime<Utc>,
}
