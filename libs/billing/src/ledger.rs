//! Line items, payments, and bill reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};

/// A single billable service line on a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qty: i32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.qty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Card => "Card",
            Self::Online => "Online",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(Self::Cash),
            "Card" => Ok(Self::Card),
            "Online" => Ok(Self::Online),
            other => Err(format!("Unknown payment method: {other}")),
        }
    }
}

/// A payment recorded against a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Paid/Unpaid is always derived from payments, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Unpaid => "Unpaid",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(Self::Paid),
            "Unpaid" => Ok(Self::Unpaid),
            other => Err(format!("Unknown payment status: {other}")),
        }
    }
}

/// The computed financial state of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillTotals {
    pub amount: Decimal,
    pub total_paid: Decimal,
    pub due_balance: Decimal,
    pub status: PaymentStatus,
}

/// Sum of line-item subtotals.
pub fn total_amount(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::subtotal).sum()
}

/// Sum of recorded payments.
pub fn total_paid(payments: &[Payment]) -> Decimal {
    payments.iter().map(|p| p.amount).sum()
}

/// Outstanding balance, clamped at zero so overpayment never reads negative.
pub fn outstanding(amount: Decimal, paid: Decimal) -> Decimal {
    (amount - paid).max(Decimal::ZERO)
}

pub fn derive_status(amount: Decimal, paid: Decimal) -> PaymentStatus {
    if paid >= amount {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Unpaid
    }
}

/// Reject bills with no items, non-positive quantities, or negative prices.
pub fn validate_items(items: &[LineItem]) -> Result<()> {
    if items.is_empty() {
        return Err(BillingError::EmptyItems);
    }
    for item in items {
        if item.qty <= 0 {
            return Err(BillingError::NonPositiveQuantity {
                service: item.service.clone(),
            });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(BillingError::NegativeUnitPrice {
                service: item.service.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_payment_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositivePayment);
    }
    Ok(())
}

/// Recompute the full financial state of a bill from its items and payments.
///
/// Called after every item or payment mutation; the caller persists the
/// result in the same transaction as the mutation itself.
pub fn reconcile(items: &[LineItem], payments: &[Payment]) -> Result<BillTotals> {
    validate_items(items)?;

    let amount = total_amount(items);
    let paid = total_paid(payments);

    Ok(BillTotals {
        amount,
        total_paid: paid,
        due_balance: outstanding(amount, paid),
        status: derive_status(amount, paid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(service: &str, qty: i32, unit_price: Decimal) -> LineItem {
        LineItem {
            service: service.to_string(),
            description: None,
            qty,
            unit_price,
        }
    }

    fn payment(amount: Decimal) -> Payment {
        Payment {
            method: PaymentMethod::Cash,
            amount,
            reference: None,
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn new_bill_totals_sum_of_items() {
        let items = vec![item("Consultation", 1, dec!(500)), item("X-Ray", 1, dec!(300))];
        let totals = reconcile(&items, &[]).unwrap();

        assert_eq!(totals.amount, dec!(800));
        assert_eq!(totals.due_balance, dec!(800));
        assert_eq!(totals.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn full_payment_flips_status_to_paid() {
        let items = vec![item("Consultation", 1, dec!(500)), item("X-Ray", 1, dec!(300))];
        let totals = reconcile(&items, &[payment(dec!(800))]).unwrap();

        assert_eq!(totals.status, PaymentStatus::Paid);
        assert_eq!(totals.due_balance, dec!(0));
    }

    #[test]
    fn partial_payment_leaves_bill_unpaid() {
        let items = vec![item("Consultation", 2, dec!(250))];
        let totals = reconcile(&items, &[payment(dec!(100)), payment(dec!(150))]).unwrap();

        assert_eq!(totals.amount, dec!(500));
        assert_eq!(totals.total_paid, dec!(250));
        assert_eq!(totals.due_balance, dec!(250));
        assert_eq!(totals.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn quantity_multiplies_unit_price() {
        let items = vec![item("Dressing", 3, dec!(120.50))];
        assert_eq!(total_amount(&items), dec!(361.50));
    }

    #[test]
    fn overpayment_never_reads_negative() {
        let items = vec![item("Consultation", 1, dec!(500))];
        let totals = reconcile(&items, &[payment(dec!(700))]).unwrap();

        assert_eq!(totals.due_balance, dec!(0));
        assert_eq!(totals.status, PaymentStatus::Paid);
    }

    #[test]
    fn empty_items_rejected() {
        assert_eq!(reconcile(&[], &[]), Err(BillingError::EmptyItems));
    }

    #[test]
    fn non_positive_quantity_rejected() {
        let items = vec![item("Consultation", 0, dec!(500))];
        assert!(matches!(
            validate_items(&items),
            Err(BillingError::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn negative_unit_price_rejected() {
        let items = vec![item("Consultation", 1, dec!(-1))];
        assert!(matches!(
            validate_items(&items),
            Err(BillingError::NegativeUnitPrice { .. })
        ));
    }

    #[test]
    fn zero_and_negative_payments_rejected() {
        assert_eq!(
            validate_payment_amount(dec!(0)),
            Err(BillingError::NonPositivePayment)
        );
        assert_eq!(
            validate_payment_amount(dec!(-25)),
            Err(BillingError::NonPositivePayment)
        );
        assert!(validate_payment_amount(dec!(0.01)).is_ok());
    }

    #[test]
    fn item_append_keeps_amount_invariant() {
        let mut items = vec![item("Consultation", 1, dec!(500))];
        let payments = vec![payment(dec!(500))];

        // Paid in full, then a new item arrives and reopens the balance.
        let before = reconcile(&items, &payments).unwrap();
        assert_eq!(before.status, PaymentStatus::Paid);

        items.push(item("Lab Panel", 1, dec!(250)));
        let after = reconcile(&items, &payments).unwrap();

        assert_eq!(after.amount, dec!(750));
        assert_eq!(after.due_balance, dec!(250));
        assert_eq!(after.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn payment_method_round_trips() {
        for method in [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Online] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("Barter".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn status_round_trips() {
        assert_eq!("Paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(
            "Unpaid".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Unpaid
        );
        assert!("Pending".parse::<PaymentStatus>().is_err());
    }
}
