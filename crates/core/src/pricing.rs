//! Order and cart total computation.
//!
//! One function, [`compute_totals`], is used both when a cart is updated and
//! when an order is frozen, so the customer always sees the same numbers the
//! order is persisted with.
//!
//! # Rules
//!
//! - `items_total` is the sum of `unit_price * quantity`, rounded half-up to
//!   two places.
//! - Shipping is free strictly above [`FREE_SHIPPING_THRESHOLD`], otherwise
//!   [`FLAT_SHIPPING_FEE`]. An empty cart therefore still pays shipping.
//! - `tax_total` is `items_total * TAX_RATE`, rounded half-up.
//! - `grand_total` is the sum of the three rounded parts.
//! - No total may exceed [`MAX_AMOUNT`] and no line may carry more than
//!   [`MAX_QUANTITY`] units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Money, ProductId};

/// Orders whose item total is strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::ONE_HUNDRED;

/// Shipping charged at or below [`FREE_SHIPPING_THRESHOLD`].
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::TEN;

/// Sales tax applied to the item total (15%).
pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Largest total a cart or order may reach (9,999,999,999.99).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest quantity a single line may carry.
pub const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// What is wrong with a rejected [`LineItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemDefect {
    /// Unit price below zero.
    NegativeUnitPrice,
    /// Quantity of zero.
    ZeroQuantity,
    /// Quantity above [`MAX_QUANTITY`].
    QuantityTooLarge,
    /// The line, or a total including it, exceeds [`MAX_AMOUNT`].
    AmountOverflow,
}

impl std::fmt::Display for LineItemDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeUnitPrice => write!(f, "unit price must not be negative"),
            Self::ZeroQuantity => write!(f, "quantity must be at least 1"),
            Self::QuantityTooLarge => write!(f, "quantity is too large"),
            Self::AmountOverflow => write!(f, "amount is too large"),
        }
    }
}

/// Errors raised by the price calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A line item has a negative price, a zero quantity, or overflows.
    #[error("invalid line item for product {product_id}: {defect}")]
    InvalidLineItem {
        /// Product the offending line refers to.
        product_id: ProductId,
        /// The rule the line broke.
        defect: LineItemDefect,
    },
}

/// One product reference with an authoritative unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Create a line item. Validation happens in [`LineItem::amount`].
    #[must_use]
    pub const fn new(product_id: ProductId, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            product_id,
            unit_price,
            quantity,
        }
    }

    /// Check the line against the pricing invariants.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidLineItem` for a negative price or a
    /// quantity outside `1..=MAX_QUANTITY`.
    pub fn validate(&self) -> Result<(), PricingError> {
        let defect = if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            LineItemDefect::NegativeUnitPrice
        } else if self.quantity == 0 {
            LineItemDefect::ZeroQuantity
        } else if self.quantity > MAX_QUANTITY {
            LineItemDefect::QuantityTooLarge
        } else {
            return Ok(());
        };

        Err(self.reject(defect))
    }

    /// Unrounded `unit_price * quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidLineItem` if the line is invalid or the
    /// product overflows.
    pub fn amount(&self) -> Result<Decimal, PricingError> {
        self.validate()?;
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| self.reject(LineItemDefect::AmountOverflow))
    }

    const fn reject(&self, defect: LineItemDefect) -> PricingError {
        PricingError::InvalidLineItem {
            product_id: self.product_id,
            defect,
        }
    }
}

/// Derived totals for a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub items_total: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub grand_total: Money,
}

impl Totals {
    /// Totals of an empty item list: shipping is still charged.
    #[must_use]
    pub fn empty() -> Self {
        from_items_total(Money::ZERO)
    }
}

impl Default for Totals {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compute the four totals for a sequence of line items.
///
/// ```
/// use bazaar_core::pricing::{LineItem, compute_totals};
/// use bazaar_core::ProductId;
/// use rust_decimal::Decimal;
///
/// let items = [LineItem::new(ProductId::new(1), Decimal::new(6000, 2), 2)];
/// let totals = compute_totals(&items).unwrap();
/// assert_eq!(totals.items_total.to_string(), "120.00");
/// assert_eq!(totals.shipping_total.to_string(), "0.00");
/// assert_eq!(totals.tax_total.to_string(), "18.00");
/// assert_eq!(totals.grand_total.to_string(), "138.00");
/// ```
///
/// # Errors
///
/// Returns `PricingError::InvalidLineItem` for the first line with a
/// negative price or an out-of-range quantity, or the first line that
/// pushes a total above [`MAX_AMOUNT`].
pub fn compute_totals<'a, I>(items: I) -> Result<Totals, PricingError>
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut sum = Decimal::ZERO;
    let mut totals = Totals::empty();
    for item in items {
        let overflow = || item.reject(LineItemDefect::AmountOverflow);
        sum = item
            .amount()?
            .checked_add(sum)
            .filter(|s| *s <= MAX_AMOUNT)
            .ok_or_else(overflow)?;
        // Bounded sum keeps the tax and grand total arithmetic in range.
        totals = from_items_total(Money::from_decimal(sum));
        if totals.grand_total.amount() > MAX_AMOUNT {
            return Err(overflow());
        }
    }

    Ok(totals)
}

fn from_items_total(items_total: Money) -> Totals {
    let shipping_total = if items_total.amount() > FREE_SHIPPING_THRESHOLD {
        Money::ZERO
    } else {
        Money::from_decimal(FLAT_SHIPPING_FEE)
    };
    let tax_total = Money::from_decimal(items_total.amount() * TAX_RATE);
    let grand_total = Money::from_decimal(
        items_total.amount() + shipping_total.amount() + tax_total.amount(),
    );

    Totals {
        items_total,
        shipping_total,
        tax_total,
        grand_total,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, cents: i64, quantity: u32) -> LineItem {
        LineItem::new(ProductId::new(id), Decimal::new(cents, 2), quantity)
    }

    fn totals_of(items: &[LineItem]) -> [String; 4] {
        let t = compute_totals(items).unwrap();
        [
            t.items_total.to_string(),
            t.shipping_total.to_string(),
            t.tax_total.to_string(),
            t.grand_total.to_string(),
        ]
    }

    #[test]
    fn test_empty_list_still_pays_shipping() {
        assert_eq!(totals_of(&[]), ["0.00", "10.00", "0.00", "10.00"]);
        assert_eq!(Totals::empty(), compute_totals(&Vec::<LineItem>::new()).unwrap());
    }

    #[test]
    fn test_free_shipping_above_threshold() {
        assert_eq!(
            totals_of(&[item(1, 6_000, 2)]),
            ["120.00", "0.00", "18.00", "138.00"]
        );
    }

    #[test]
    fn test_exactly_threshold_pays_shipping() {
        assert_eq!(
            totals_of(&[item(1, 10_000, 1)]),
            ["100.00", "10.00", "15.00", "125.00"]
        );
    }

    #[test]
    fn test_one_cent_over_threshold_ships_free() {
        assert_eq!(
            totals_of(&[item(1, 10_001, 1)]),
            ["100.01", "0.00", "15.00", "115.01"]
        );
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 0.15 * 0.10 = 0.015 -> 0.02
        assert_eq!(totals_of(&[item(1, 10, 1)]), ["0.10", "10.00", "0.02", "10.12"]);
        // 0.15 * 0.30 = 0.045 -> 0.05
        assert_eq!(totals_of(&[item(1, 10, 3)]), ["0.30", "10.00", "0.05", "10.35"]);
    }

    #[test]
    fn test_items_total_rounds_sub_cent_prices() {
        let items = [LineItem::new(ProductId::new(1), Decimal::new(3_335, 3), 3)];
        // 3.335 * 3 = 10.005 -> 10.01
        assert_eq!(totals_of(&items)[0], "10.01");
    }

    #[test]
    fn test_multiple_lines() {
        let items = [item(1, 1_999, 2), item(2, 550, 1), item(3, 0, 4)];
        assert_eq!(totals_of(&items), ["45.48", "10.00", "6.82", "62.30"]);
    }

    #[test]
    fn test_grand_total_is_sum_of_parts() {
        for cents in [0, 1, 99, 4_999, 9_999, 10_000, 10_001, 123_457] {
            for quantity in 1..4 {
                let t = compute_totals(&[item(1, cents, quantity)]).unwrap();
                assert_eq!(
                    t.grand_total.amount(),
                    t.items_total.amount() + t.shipping_total.amount() + t.tax_total.amount()
                );
                assert_eq!(
                    t.tax_total,
                    Money::from_decimal(t.items_total.amount() * TAX_RATE)
                );
            }
        }
    }

    #[test]
    fn test_negative_price_rejected() {
        let err = compute_totals(&[item(1, 500, 1), item(7, -1, 1)]).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidLineItem {
                product_id: ProductId::new(7),
                defect: LineItemDefect::NegativeUnitPrice,
            }
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = compute_totals(&[item(2, 500, 0)]).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidLineItem {
                defect: LineItemDefect::ZeroQuantity,
                ..
            }
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        let huge = LineItem::new(ProductId::new(3), Decimal::MAX, 2);
        let err = compute_totals(&[huge]).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidLineItem {
                defect: LineItemDefect::AmountOverflow,
                ..
            }
        ));
    }

    #[test]
    fn test_max_decimal_price_is_rejected() {
        let huge = LineItem::new(ProductId::new(4), Decimal::MAX, 1);
        let err = compute_totals(&[huge]).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidLineItem {
                product_id: ProductId::new(4),
                defect: LineItemDefect::AmountOverflow,
            }
        );
    }

    #[test]
    fn test_grand_total_bounded_by_max_amount() {
        // Items fit, but tax pushes the grand total over the ceiling.
        let items = [LineItem::new(ProductId::new(1), MAX_AMOUNT, 1)];
        assert!(compute_totals(&items).is_err());

        // 60.00 * 200,000,000 = 12,000,000,000.00
        let err = compute_totals(&[item(1, 6_000, 200_000_000)]).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidLineItem {
                defect: LineItemDefect::AmountOverflow,
                ..
            }
        ));

        // Second line is the one that crosses the ceiling.
        let half = Decimal::new(500_000_000_000, 2);
        let items = [
            LineItem::new(ProductId::new(1), half, 1),
            LineItem::new(ProductId::new(2), half, 1),
        ];
        assert_eq!(
            compute_totals(&items).unwrap_err(),
            PricingError::InvalidLineItem {
                product_id: ProductId::new(2),
                defect: LineItemDefect::AmountOverflow,
            }
        );
    }

    #[test]
    fn test_largest_total_accepted() {
        // items * 1.15 stays at or below the ceiling
        let items = [item(1, 800_000_000_000, 1)];
        let t = compute_totals(&items).unwrap();
        assert_eq!(t.grand_total.to_string(), "9200000000.00");
    }

    #[test]
    fn test_quantity_above_max_rejected() {
        let err = compute_totals(&[item(1, 0, MAX_QUANTITY + 1)]).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidLineItem {
                defect: LineItemDefect::QuantityTooLarge,
                ..
            }
        ));
        assert!(compute_totals(&[item(1, 0, MAX_QUANTITY)]).is_ok());
    }

    #[test]
    fn test_max_amount_is_twelve_digit_ceiling() {
        assert_eq!(MAX_AMOUNT.to_string(), "9999999999.99");
    }

    #[test]
    fn test_totals_serialize_as_strings() {
        let json = serde_json::to_value(Totals::empty()).unwrap();
        assert_eq!(json["shipping_total"], "10.00");
        assert_eq!(json["grand_total"], "10.00");
    }
}
