//! Commission splits and month-bucketed revenue projections.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Share of paid revenue attributed to the treating doctor. The clinic keeps
/// the remainder.
pub const DOCTOR_SHARE: Decimal = Decimal::from_parts(70, 0, 0, false, 2);

/// A 70/30 doctor/clinic split of some revenue figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub total: Decimal,
    pub doctor_share: Decimal,
    pub clinic_share: Decimal,
}

impl CommissionSplit {
    /// Split `total`, rounding the doctor's share to 2 decimal places and
    /// giving the clinic the exact remainder so the parts always sum to the
    /// total.
    pub fn of(total: Decimal) -> Self {
        let doctor_share = (total * DOCTOR_SHARE).round_dp(2);
        Self {
            total,
            doctor_share,
            clinic_share: total - doctor_share,
        }
    }
}

/// Revenue attributed to one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub label: &'static str,
    pub total: Decimal,
}

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Bucket `(timestamp, amount)` pairs into calendar months of `year`,
/// ascending, keeping only months with non-zero revenue (matching the
/// dashboard's trend chart).
pub fn monthly_buckets(
    year: i32,
    entries: impl IntoIterator<Item = (DateTime<Utc>, Decimal)>,
) -> Vec<MonthlyRevenue> {
    let mut totals = [Decimal::ZERO; 12];
    for (at, amount) in entries {
        if at.year() == year {
            totals[at.month0() as usize] += amount;
        }
    }

    totals
        .iter()
        .enumerate()
        .filter(|(_, total)| !total.is_zero())
        .map(|(idx, total)| MonthlyRevenue {
            month: idx as u32 + 1,
            label: MONTH_LABELS[idx],
            total: *total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn split_is_seventy_thirty() {
        let split = CommissionSplit::of(dec!(1000));
        assert_eq!(split.doctor_share, dec!(700.00));
        assert_eq!(split.clinic_share, dec!(300.00));
    }

    #[test]
    fn split_parts_always_sum_to_total() {
        for total in [dec!(0.01), dec!(333.33), dec!(99.99), dec!(12345.67)] {
            let split = CommissionSplit::of(total);
            assert_eq!(split.doctor_share + split.clinic_share, total);
        }
    }

    #[test]
    fn buckets_by_month_and_skips_empty_months() {
        let at = |m, d| Utc.with_ymd_and_hms(2025, m, d, 10, 0, 0).unwrap();
        let buckets = monthly_buckets(
            2025,
            vec![
                (at(1, 5), dec!(100)),
                (at(1, 20), dec!(150)),
                (at(3, 2), dec!(400)),
                // Wrong year, must be ignored.
                (Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), dec!(999)),
            ],
        );

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[0].total, dec!(250));
        assert_eq!(buckets[1].label, "Mar");
        assert_eq!(buckets[1].total, dec!(400));
    }
}
