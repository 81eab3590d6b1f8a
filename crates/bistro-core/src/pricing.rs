//! # Pricing Engine
//!
//! Computes the authoritative bill for an order and checks a client's bill
//! against it.
//!
//! ## Discount Branches
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Promotion                              Computation                     │
//! │  ────────────────────────────────────   ─────────────────────────────── │
//! │  order_percentage                       round(subtotal × p / 100)       │
//! │  order_fixed                            min(f, subtotal)                │
//! │  happy_hour %/fixed, all_order scope    same as order_*                 │
//! │                                                                         │
//! │  item_percentage                        Σ matched round(line × p / 100) │
//! │  item_fixed                             Σ matched min(f, line)          │
//! │  happy_hour %/fixed, scoped             same as item_*                  │
//! │                                                                         │
//! │  happy_hour uniform_price               Σ matched max(0,                │
//! │                                           (unit − u) × qty)             │
//! │                                                                         │
//! │  Every discount is capped at its base; the order discount is capped     │
//! │  at the subtotal. total = subtotal − discount, tax on top.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine holds only configuration. `price` is a pure function of its
//! arguments: the same order and promotions always yield the same outcome.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::promotion::{DiscountKind, Promotion};
use crate::types::{AppliedPromotion, Bills, LineItem, Order, TaxRate};
use crate::DEFAULT_BILL_EPSILON;

// =============================================================================
// Outcome Types
// =============================================================================

/// One priced line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub dish_id: String,
    pub line_total: i64,
    /// Line-level discount. Zero when the promotion discounts the subtotal.
    pub discount: i64,
}

/// The server-computed result of pricing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingOutcome {
    pub bills: Bills,
    pub applied_promotions: Vec<AppliedPromotion>,
    pub lines: Vec<PricedLine>,
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless pricing with a configured tax rate and reconciliation tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingEngine {
    tax_rate: TaxRate,
    epsilon: i64,
}

impl Default for PricingEngine {
    fn default() -> Self {
        PricingEngine::new(TaxRate::zero(), DEFAULT_BILL_EPSILON)
    }
}

impl PricingEngine {
    pub const fn new(tax_rate: TaxRate, epsilon: i64) -> Self {
        PricingEngine { tax_rate, epsilon }
    }

    #[inline]
    pub const fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    #[inline]
    pub const fn epsilon(&self) -> i64 {
        self.epsilon
    }

    /// Discount one promotion gives on `order`, plus the per-line split
    /// (all zero for subtotal-level discounts).
    pub fn discount_for(&self, promotion: &Promotion, order: &Order) -> (Money, Vec<Money>) {
        let subtotal = order.subtotal();
        let mut per_line = vec![Money::zero(); order.items.len()];

        if promotion.discounts_subtotal() {
            let discount = match promotion.discount {
                DiscountKind::Percentage(p) => subtotal.percentage(p),
                DiscountKind::FixedAmount(f) => Money::from_minor(f).min(subtotal),
                // discounts_subtotal() is false for uniform prices
                DiscountKind::UniformPrice(_) => Money::zero(),
            };
            return (discount.min(subtotal).non_negative(), per_line);
        }

        let mut base = Money::zero();
        let mut total = Money::zero();
        for (i, line) in order.items.iter().enumerate() {
            if !promotion.scope.matches(line) {
                continue;
            }
            let line_total = line.line_total();
            base += line_total;
            let discount = line_discount(promotion.discount, line)
                .min(line_total)
                .non_negative();
            per_line[i] = discount;
            total += discount;
        }

        (total.min(base), per_line)
    }

    /// Prices `order` with the given (already matched) promotions.
    ///
    /// Each promotion is evaluated against the undiscounted order; the
    /// combined discount never exceeds the subtotal.
    pub fn price(&self, order: &Order, promotions: &[&Promotion]) -> PricingOutcome {
        let subtotal = order.subtotal();
        let mut line_discounts = vec![Money::zero(); order.items.len()];
        let mut applied = Vec::with_capacity(promotions.len());
        let mut discount = Money::zero();

        for promotion in promotions {
            let (amount, per_line) = self.discount_for(promotion, order);
            let amount = amount.min(subtotal - discount);
            for (acc, d) in line_discounts.iter_mut().zip(per_line) {
                *acc += d;
            }
            discount += amount;
            applied.push(AppliedPromotion {
                promotion_id: promotion.id.clone(),
                name: promotion.name.clone(),
                promotion_type: promotion.promotion_type,
                discount_amount: amount.minor(),
                code: promotion.code.clone(),
            });
        }

        let total = subtotal - discount;
        let tax = total.calculate_tax(self.tax_rate);

        let lines = order
            .items
            .iter()
            .zip(line_discounts)
            .map(|(line, d)| PricedLine {
                dish_id: line.dish_id.clone(),
                line_total: line.line_total().minor(),
                discount: d.minor(),
            })
            .collect();

        PricingOutcome {
            bills: Bills {
                subtotal: subtotal.minor(),
                promotion_discount: discount.minor(),
                total: total.minor(),
                tax: tax.minor(),
                total_with_tax: (total + tax).minor(),
            },
            applied_promotions: applied,
            lines,
        }
    }

    /// Recomputes the bill and compares it with what the client submitted.
    ///
    /// Fields are checked in order `subtotal`, `promotionDiscount`, `total`,
    /// `tax`, `totalWithTax`; the first one off by more than the epsilon is
    /// reported with both values.
    pub fn validate(
        &self,
        order: &Order,
        promotions: &[&Promotion],
        submitted: &Bills,
    ) -> CoreResult<PricingOutcome> {
        let outcome = self.price(order, promotions);
        let expected = outcome.bills;

        let fields = [
            ("subtotal", expected.subtotal, submitted.subtotal),
            (
                "promotionDiscount",
                expected.promotion_discount,
                submitted.promotion_discount,
            ),
            ("total", expected.total, submitted.total),
            ("tax", expected.tax, submitted.tax),
            ("totalWithTax", expected.total_with_tax, submitted.total_with_tax),
        ];
        for (field, expected, submitted) in fields {
            self.check(field, expected, submitted)?;
        }

        Ok(outcome)
    }

    /// Checks each claim against the computed promotion: the `type` must
    /// match exactly and the `discountAmount` within the epsilon.
    pub fn reconcile_claims(
        &self,
        outcome: &PricingOutcome,
        claims: &[AppliedPromotion],
    ) -> CoreResult<()> {
        for (i, claim) in claims.iter().enumerate() {
            let computed = outcome
                .applied_promotions
                .iter()
                .find(|applied| applied.promotion_id == claim.promotion_id)
                .ok_or_else(|| CoreError::PromotionNotFound(claim.promotion_id.clone()))?;
            if claim.promotion_type != computed.promotion_type {
                return Err(ValidationError::invalid(
                    format!("appliedPromotions[{}].type", i),
                    format!("promotion is of type {}", computed.promotion_type),
                )
                .into());
            }
            self.check(
                &format!("appliedPromotions[{}].discountAmount", i),
                computed.discount_amount,
                claim.discount_amount,
            )?;
        }
        Ok(())
    }

    fn check(&self, field: &str, expected: i64, submitted: i64) -> CoreResult<()> {
        if Money::from_minor(expected).within(Money::from_minor(submitted), self.epsilon) {
            Ok(())
        } else {
            Err(CoreError::BillMismatch {
                field: field.to_string(),
                expected,
                submitted,
            })
        }
    }
}

fn line_discount(kind: DiscountKind, line: &LineItem) -> Money {
    match kind {
        DiscountKind::Percentage(p) => line.line_total().percentage(p),
        DiscountKind::FixedAmount(f) => Money::from_minor(f),
        DiscountKind::UniformPrice(u) => {
            // replaces the dish price; toppings keep their price
            let saving = line.effective_unit_price() - Money::from_minor(u);
            saving.non_negative().multiply_quantity(line.quantity)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
