//! Billing arithmetic for the Ward clinic backend.
//!
//! Everything in here is pure: the server layers persistence and HTTP on
//! top, but totals, due balances, payment status, and commission splits are
//! computed exclusively through this crate so the invariants live in one
//! place:
//!
//! - `amount == Σ(item.qty × item.unit_price)`
//! - `status == Paid` iff `Σ(payments) >= amount`
//! - `outstanding == max(amount − Σ(payments), 0)`

#![forbid(unsafe_code)]

mod commission;
mod error;
mod ledger;

pub use commission::{monthly_buckets, CommissionSplit, MonthlyRevenue, DOCTOR_SHARE};
pub use error::{BillingError, Result};
pub use ledger::{
    derive_status, outstanding, reconcile, total_amount, total_paid, validate_items,
    validate_payment_amount, BillTotals, LineItem, Payment, PaymentMethod, PaymentStatus,
};
