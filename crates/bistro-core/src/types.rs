//! # Domain Types
//!
//! Order-side types shared by the matcher, the pricing engine, storage and
//! the HTTP layer. Field names serialize in camelCase because the React
//! frontend owns the wire shape.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ OrderSubmission │   │     Order       │   │    LineItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bills (claim)  │──►│  items          │──►│  dishId         │       │
//! │  │  appliedPromos  │   │  customer       │   │  quantity       │       │
//! │  │  order          │   │  vendor tag     │   │  variant/tops   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Bills       │   │  PlacedOrder    │   │    TaxRate      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  subtotal       │   │  _id (UUID)     │   │  bps (u32)      │       │
//! │  │  discount       │   │  bills (auth.)  │   │  800 = 8%       │       │
//! │  │  total / tax    │   │  createdAt      │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts on the wire are plain integers in minor units (đồng). Accessors
//! wrap them in [`Money`] for arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::promotion::PromotionType;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 800 bps = 8% (Vietnamese reduced VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Who the order is for. Opaque to pricing except for `phone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub guests: Option<u32>,
}

impl CustomerDetails {
    /// Key used for per-customer usage limits: the trimmed phone number.
    ///
    /// Returns `None` for walk-in customers without a phone.
    pub fn customer_key(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// The selected size of a dish, priced on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub size: String,
    pub price: i64,
}

/// A topping added to a line, charged per topping unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ToppingLine {
    pub topping_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: i64,
    pub price_per_quantity: i64,
}

impl ToppingLine {
    /// `quantity × pricePerQuantity`.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.price_per_quantity).multiply_quantity(self.quantity)
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub dish_id: String,
    #[serde(default)]
    pub name: String,
    /// Category id. Overwritten from the dish catalog before pricing.
    #[serde(default)]
    pub category: String,
    pub quantity: i64,
    pub price_per_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(default)]
    pub toppings: Vec<ToppingLine>,
    /// Price before any promotion, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price_per_quantity: Option<i64>,
}

impl LineItem {
    /// Unit price of the dish itself: the variant price when a size was
    /// picked, otherwise the base price.
    #[inline]
    pub fn effective_unit_price(&self) -> Money {
        let minor = self
            .variant
            .as_ref()
            .map(|v| v.price)
            .unwrap_or(self.price_per_quantity);
        Money::from_minor(minor)
    }

    /// Dish portion of the line, toppings excluded.
    #[inline]
    pub fn dish_total(&self) -> Money {
        self.effective_unit_price().multiply_quantity(self.quantity)
    }

    /// Sum of all toppings on the line.
    pub fn toppings_total(&self) -> Money {
        self.toppings.iter().map(ToppingLine::total).sum()
    }

    /// Full line total: dish portion plus toppings.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.dish_total() + self.toppings_total()
    }

    /// Like [`LineItem::line_total`] but `None` when any step overflows.
    pub fn checked_line_total(&self) -> Option<Money> {
        let dish = self.effective_unit_price().checked_mul(self.quantity)?;
        self.toppings.iter().try_fold(dish, |acc, topping| {
            let total = Money::from_minor(topping.price_per_quantity).checked_mul(topping.quantity)?;
            acc.checked_add(total)
        })
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The kitchen status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum OrderStatus {
    #[serde(rename = "In Progress")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "In Progress"))]
    InProgress,
    #[serde(rename = "Ready")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Ready"))]
    Ready,
    #[serde(rename = "Completed")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Completed"))]
    Completed,
    #[serde(rename = "Cancelled")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cancelled"))]
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::InProgress
    }
}

// =============================================================================
// Order
// =============================================================================

/// The cart being priced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_vendor: Option<String>,
}

impl Order {
    /// Sum of every line total.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Like [`Order::subtotal`] but `None` when any step overflows.
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.checked_add(item.checked_line_total()?))
    }

    /// True when the order was placed through a delivery platform.
    pub fn is_third_party(&self) -> bool {
        self.third_party_vendor
            .as_deref()
            .is_some_and(|vendor| !vendor.trim().is_empty())
    }

    /// Distinct dish ids in first-seen order.
    pub fn dish_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.dish_id) {
                ids.push(item.dish_id.clone());
            }
        }
        ids
    }
}

// =============================================================================
// Bills
// =============================================================================

/// The bill breakdown, either as claimed by the client or as computed by
/// the pricing engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bills {
    pub subtotal: i64,
    #[serde(default)]
    pub promotion_discount: i64,
    pub total: i64,
    #[serde(default)]
    pub tax: i64,
    pub total_with_tax: i64,
}

/// A promotion recorded against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromotion {
    pub promotion_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub discount_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Submission / Placed Order
// =============================================================================

/// Body of `POST /api/order`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    #[serde(default)]
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub order_status: OrderStatus,
    pub bills: Bills,
    #[serde(default)]
    pub applied_promotions: Vec<AppliedPromotion>,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_vendor: Option<String>,
}

impl OrderSubmission {
    /// Splits the submission into the order to price and the client's claims.
    pub fn into_parts(self) -> (Order, Bills, Vec<AppliedPromotion>) {
        let order = Order {
            items: self.items,
            customer_details: self.customer_details,
            order_status: self.order_status,
            third_party_vendor: self.third_party_vendor,
        };
        (order, self.bills, self.applied_promotions)
    }
}

/// An order as persisted after a successful commit.
///
/// `bills` and `appliedPromotions` are the server-computed values, never
/// the client's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_details: CustomerDetails,
    pub order_status: OrderStatus,
    pub bills: Bills,
    pub applied_promotions: Vec<AppliedPromotion>,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_vendor: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl PlacedOrder {
    /// Whether the order has been cancelled (and its usage released).
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some() || self.order_status == OrderStatus::Cancelled
    }
}

// =============================================================================
// Dish Catalog
// =============================================================================

/// A menu entry, as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Category id.
    pub category: String,
    /// Base price in minor units.
    pub price: i64,
    pub is_active: bool,
}

// =============================================================================
// Reporting
// =============================================================================

/// Per-promotion usage over a reporting window.
///
/// `usageCount` and `remainingUsage` come from the ledger counters;
/// `redemptions` and `totalDiscount` count orders committed inside the
/// window that have not been cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionAnalytics {
    pub promotion_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub is_active: bool,
    pub usage_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_usage: Option<u32>,
    pub redemptions: u32,
    pub total_discount: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(dish: &str, qty: i64, price: i64) -> LineItem {
        LineItem {
            dish_id: dish.to_string(),
            name: dish.to_string(),
            category: "cat-main".to_string(),
            quantity: qty,
            price_per_quantity: price,
            variant: None,
            toppings: vec![],
            original_price_per_quantity: None,
        }
    }

    #[test]
    fn test_line_total_uses_variant_and_toppings() {
        let mut item = line("pho", 2, 40_000);
        item.variant = Some(Variant {
            size: "L".to_string(),
            price: 50_000,
        });
        item.toppings.push(ToppingLine {
            topping_id: "egg".to_string(),
            name: None,
            quantity: 2,
            price_per_quantity: 5_000,
        });

        assert_eq!(item.effective_unit_price().minor(), 50_000);
        assert_eq!(item.dish_total().minor(), 100_000);
        assert_eq!(item.line_total().minor(), 110_000);
    }

    #[test]
    fn test_order_subtotal_multi_item() {
        let order = Order {
            items: vec![line("bun-cha", 1, 43_000), line("pho", 2, 38_000)],
            ..Default::default()
        };
        assert_eq!(order.subtotal().minor(), 119_000);
        assert_eq!(order.dish_ids(), vec!["bun-cha", "pho"]);
    }

    #[test]
    fn test_checked_subtotal_reports_overflow() {
        let order = Order {
            items: vec![line("pho", 2, 38_000), line("tra-da", 1, 5_000)],
            ..Default::default()
        };
        assert_eq!(order.checked_subtotal(), Some(order.subtotal()));

        let huge = Order {
            items: vec![line("pho", 2, 1 << 62)],
            ..Default::default()
        };
        assert_eq!(huge.items[0].checked_line_total(), None);
        assert_eq!(huge.checked_subtotal(), None);

        let many = Order {
            items: vec![line("pho", 1, i64::MAX), line("bun-cha", 1, 1)],
            ..Default::default()
        };
        assert_eq!(many.checked_subtotal(), None);
    }

    #[test]
    fn test_customer_key_trims_and_skips_blank() {
        let mut customer = CustomerDetails {
            name: "An".to_string(),
            phone: Some("  0901234567 ".to_string()),
            guests: Some(2),
        };
        assert_eq!(customer.customer_key(), Some("0901234567"));

        customer.phone = Some("   ".to_string());
        assert_eq!(customer.customer_key(), None);
    }

    #[test]
    fn test_third_party_detection() {
        let mut order = Order::default();
        assert!(!order.is_third_party());
        order.third_party_vendor = Some("".to_string());
        assert!(!order.is_third_party());
        order.third_party_vendor = Some("GrabFood".to_string());
        assert!(order.is_third_party());
    }

    #[test]
    fn test_submission_deserializes_from_frontend_json() {
        let json = r#"{
            "customerDetails": { "name": "Test", "phone": "0900000000", "guests": 1 },
            "orderStatus": "In Progress",
            "bills": { "subtotal": 38000, "promotionDiscount": 3800, "total": 34200, "tax": 0, "totalWithTax": 34200 },
            "appliedPromotions": [
                { "promotionId": "p1", "name": "10% off", "type": "order_percentage", "discountAmount": 3800 }
            ],
            "items": [
                { "dishId": "d1", "name": "Pho", "category": "c1", "quantity": 1, "pricePerQuantity": 38000 }
            ],
            "thirdPartyVendor": null
        }"#;

        let submission: OrderSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.bills.total, 34_200);
        assert_eq!(submission.applied_promotions.len(), 1);
        assert_eq!(
            submission.applied_promotions[0].promotion_type,
            PromotionType::OrderPercentage
        );

        let (order, bills, claims) = submission.into_parts();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.order_status, OrderStatus::InProgress);
        assert_eq!(bills.promotion_discount, 3_800);
        assert_eq!(claims[0].discount_amount, 3_800);
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"Cancelled\""
        );
    }
}
