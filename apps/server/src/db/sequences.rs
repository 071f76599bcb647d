//! Per-entity sequential code allocation.
//!
//! Human-readable codes (`INV-1001`, `APT-1001`, ...) are allocated from a
//! shared `sequences` table with an atomic upsert, so two concurrent creates
//! can never observe the same value. This replaces scanning the latest
//! record and parsing its suffix, which races under concurrency.

use sqlx::{PgExecutor, Row};

use crate::Result;

/// First value handed out by every sequence.
const FIRST_VALUE: i64 = 1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Bill,
    Appointment,
    StockItem,
    StockOut,
    Consultation,
    Prescription,
    Dose,
    Patient,
}

impl Sequence {
    fn name(&self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::Appointment => "appointment",
            Self::StockItem => "stock_item",
            Self::StockOut => "stock_out",
            Self::Consultation => "consultation",
            Self::Prescription => "prescription",
            Self::Dose => "dose",
            Self::Patient => "patient",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::Bill => "INV",
            Self::Appointment => "APT",
            Self::StockItem => "STK",
            Self::StockOut => "STO",
            Self::Consultation => "CON",
            Self::Prescription => "RX",
            Self::Dose => "DSE",
            Self::Patient => "PAT",
        }
    }

    pub fn format(&self, value: i64) -> String {
        format!("{}-{}", self.prefix(), value)
    }
}

/// Allocate the next code for `seq`. Callers creating dependent rows should
/// pass their open transaction so an aborted create does not leave a gap in
/// a committed row's wake.
pub async fn next_code<'e, E>(executor: E, seq: Sequence) -> Result<String>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        "INSERT INTO sequences (name, next_value)
         VALUES ($1, $2)
         ON CONFLICT (name)
         DO UPDATE SET next_value = sequences.next_value + 1
         RETURNING next_value",
    )
    .bind(seq.name())
    .bind(FIRST_VALUE)
    .fetch_one(executor)
    .await?;

    let value: i64 = row.get("next_value");
    Ok(seq.format(value))
}

/// Numeric suffix of a code, e.g. `1001` for `INV-1001`.
pub fn parse_suffix(code: &str) -> Option<i64> {
    code.rsplit_once('-').and_then(|(_, n)| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_entity_prefixes() {
        assert_eq!(Sequence::Bill.format(1001), "INV-1001");
        assert_eq!(Sequence::Appointment.format(1002), "APT-1002");
        assert_eq!(Sequence::StockOut.format(1010), "STO-1010");
        assert_eq!(Sequence::Dose.format(1234), "DSE-1234");
    }

    #[test]
    fn suffix_parses_back_out() {
        assert_eq!(parse_suffix("INV-1001"), Some(1001));
        assert_eq!(parse_suffix(&Sequence::Patient.format(2000)), Some(2000));
        assert_eq!(parse_suffix("garbage"), None);
    }

    #[test]
    fn consecutive_values_differ_by_one() {
        let a = Sequence::Consultation.format(FIRST_VALUE);
        let b = Sequence::Consultation.format(FIRST_VALUE + 1);
        assert_eq!(
            parse_suffix(&b).unwrap() - parse_suffix(&a).unwrap(),
            1
        );
    }
}
