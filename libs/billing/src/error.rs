//! Error types for billing arithmetic.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BillingError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("A bill requires at least one line item")]
    EmptyItems,

    #[error("Line item '{service}' has a non-positive quantity")]
    NonPositiveQuantity { service: String },

    #[error("Line item '{service}' has a negative unit price")]
    NegativeUnitPrice { service: String },

    #[error("Payment amount must be positive")]
    NonPositivePayment,
}
