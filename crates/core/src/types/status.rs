//! Order status derived from the paid/delivered flags.

use serde::{Deserialize, Serialize};

/// Lifecycle position of an order.
///
/// Orders only ever move forward: `Created` can become paid or delivered in
/// either order, and both flags are terminal once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment and delivery.
    #[default]
    Created,
    /// Payment confirmed, not yet delivered.
    Paid,
    /// Delivered before payment was confirmed (e.g. cash on delivery).
    Delivered,
    /// Paid and delivered.
    Completed,
}

impl OrderStatus {
    /// Derive the status from the two persisted flags.
    #[must_use]
    pub const fn from_flags(is_paid: bool, is_delivered: bool) -> Self {
        match (is_paid, is_delivered) {
            (false, false) => Self::Created,
            (true, false) => Self::Paid,
            (false, true) => Self::Delivered,
            (true, true) => Self::Completed,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Paid => write!(f, "paid"),
            Self::Delivered => write!(f, "delivered"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
