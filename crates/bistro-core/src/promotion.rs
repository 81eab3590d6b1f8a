//! # Promotion Configuration
//!
//! Promotions are admin-managed records. The admin screens send a loose JSON
//! shape where `discount.percentage`, `discount.fixedAmount` and
//! `discount.uniformPrice` are all optional on one object. That shape lives
//! here as [`PromotionPayload`]. Before anything prices an order it is
//! converted, with validation, into a [`Promotion`] whose discount is a
//! tagged [`DiscountKind`].
//!
//! ## Wire Form → Core Form
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PromotionPayload (JSON)             Promotion (core)                   │
//! │  ─────────────────────────           ─────────────────────────          │
//! │  type: "happy_hour"          ──┐                                        │
//! │  discountType: "uniform_price" ├──►  discount: UniformPrice(25000)      │
//! │  discount: {uniformPrice}    ──┘                                        │
//! │                                                                         │
//! │  applicableItems: "categories" ─┐                                       │
//! │  categories: ["c-noodle"]      ─┴─►  scope: Categories({"c-noodle"})    │
//! │                                                                         │
//! │  code: "  Lunch10 "           ───►  code: Some("Lunch10")               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Use sites match on `DiscountKind` and `Scope`; nothing downstream checks
//! which optional field happens to be populated.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::LineItem;
use crate::validation::{validate_code, ValidationResult};
use crate::{MAX_ORDER_AMOUNT, MAX_PRICE};

// =============================================================================
// Promotion Type
// =============================================================================

/// Which discount-computation branch a promotion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    OrderPercentage,
    OrderFixed,
    ItemPercentage,
    ItemFixed,
    HappyHour,
}

impl PromotionType {
    /// Wire name, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PromotionType::OrderPercentage => "order_percentage",
            PromotionType::OrderFixed => "order_fixed",
            PromotionType::ItemPercentage => "item_percentage",
            PromotionType::ItemFixed => "item_fixed",
            PromotionType::HappyHour => "happy_hour",
        }
    }

    /// Order-level types always discount the whole subtotal.
    pub const fn is_order_level(&self) -> bool {
        matches!(
            self,
            PromotionType::OrderPercentage | PromotionType::OrderFixed
        )
    }
}

impl fmt::Display for PromotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Secondary selector used by `happy_hour` promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    UniformPrice,
}

/// The loose discount object from the admin form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform_price: Option<i64>,
}

/// What a promotion takes off, as a closed set of cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountKind {
    /// Percent off, 1–100.
    Percentage(u32),
    /// Fixed amount off, in minor units.
    FixedAmount(i64),
    /// Unit price replaced by this amount, in minor units.
    UniformPrice(i64),
}

impl DiscountKind {
    /// The wire selector for this kind.
    pub const fn discount_type(&self) -> DiscountType {
        match self {
            DiscountKind::Percentage(_) => DiscountType::Percentage,
            DiscountKind::FixedAmount(_) => DiscountType::FixedAmount,
            DiscountKind::UniformPrice(_) => DiscountType::UniformPrice,
        }
    }

    fn to_values(self) -> DiscountValues {
        match self {
            DiscountKind::Percentage(p) => DiscountValues {
                percentage: Some(p),
                ..Default::default()
            },
            DiscountKind::FixedAmount(f) => DiscountValues {
                fixed_amount: Some(f),
                ..Default::default()
            },
            DiscountKind::UniformPrice(u) => DiscountValues {
                uniform_price: Some(u),
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Scope selector on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicableItems {
    #[default]
    AllOrder,
    SpecificDishes,
    Categories,
}

/// Which lines a promotion may discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    AllOrder,
    SpecificDishes(BTreeSet<String>),
    Categories(BTreeSet<String>),
}

impl Scope {
    /// Whether `line` falls inside this scope.
    pub fn matches(&self, line: &LineItem) -> bool {
        match self {
            Scope::AllOrder => true,
            Scope::SpecificDishes(dishes) => dishes.contains(&line.dish_id),
            Scope::Categories(categories) => categories.contains(&line.category),
        }
    }

    fn applicable_items(&self) -> ApplicableItems {
        match self {
            Scope::AllOrder => ApplicableItems::AllOrder,
            Scope::SpecificDishes(_) => ApplicableItems::SpecificDishes,
            Scope::Categories(_) => ApplicableItems::Categories,
        }
    }
}

// =============================================================================
// Time Slots & Weekdays
// =============================================================================

/// A daily window in store wall-clock time, `HH:MM` 24h on the wire.
///
/// The window is half-open: `start <= t < end`. When `start > end` the
/// window wraps past midnight (22:00–02:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    #[ts(as = "String")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    #[ts(as = "String")]
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Whether `time` falls inside the slot.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .map_err(|_| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}

/// Calendar dates on the wire. Accepts `YYYY-MM-DD` or a full RFC 3339
/// timestamp (the admin date pickers send either), always writes `YYYY-MM-DD`.
mod calendar_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
            .map_err(|_| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

/// Day of the week, lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    #[serde(alias = "Monday")]
    Monday,
    #[serde(alias = "Tuesday")]
    Tuesday,
    #[serde(alias = "Wednesday")]
    Wednesday,
    #[serde(alias = "Thursday")]
    Thursday,
    #[serde(alias = "Friday")]
    Friday,
    #[serde(alias = "Saturday")]
    Saturday,
    #[serde(alias = "Sunday")]
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// Eligibility conditions. Every unset condition is satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_amount: Option<i64>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub days_of_week: Vec<DayOfWeek>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_customer_limit: Option<u32>,
    /// Ineligible for orders tagged with a delivery platform.
    #[serde(default)]
    pub exclude_third_party: bool,
}

impl Conditions {
    fn validate(&self, promotion_type: PromotionType) -> ValidationResult<()> {
        for (field, amount) in [
            ("conditions.minOrderAmount", self.min_order_amount),
            ("conditions.maxOrderAmount", self.max_order_amount),
        ] {
            if amount.is_some_and(|a| !(0..=MAX_ORDER_AMOUNT).contains(&a)) {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0,
                    max: MAX_ORDER_AMOUNT,
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_order_amount, self.max_order_amount) {
            if min > max {
                return Err(ValidationError::invalid(
                    "conditions.maxOrderAmount",
                    "must not be less than minOrderAmount",
                ));
            }
        }

        for (i, slot) in self.time_slots.iter().enumerate() {
            if slot.start == slot.end {
                return Err(ValidationError::invalid(
                    format!("conditions.timeSlots[{}]", i),
                    "start and end must differ",
                ));
            }
        }
        if promotion_type == PromotionType::HappyHour && self.time_slots.is_empty() {
            return Err(ValidationError::Empty {
                field: "conditions.timeSlots".to_string(),
            });
        }

        if self.usage_limit == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "conditions.usageLimit".to_string(),
            });
        }
        if self.per_customer_limit == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "conditions.perCustomerLimit".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Promotion (core form)
// =============================================================================

/// A validated promotion, ready for matching and pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    pub discount: DiscountKind,
    pub scope: Scope,
    pub conditions: Conditions,
    pub is_active: bool,
    /// First valid day, inclusive.
    pub start_date: NaiveDate,
    /// Last valid day, inclusive.
    pub end_date: NaiveDate,
    pub priority: i32,
    /// Coupon code, stored trimmed.
    pub code: Option<String>,
    /// Ledger counter. Only the usage ledger changes it.
    pub usage_count: u32,
}

impl Promotion {
    /// `usageLimit - usageCount`, when a limit is set.
    pub fn remaining_usage(&self) -> Option<u32> {
        self.conditions
            .usage_limit
            .map(|limit| limit.saturating_sub(self.usage_count))
    }

    /// True when the discount is computed once over the subtotal rather
    /// than per matched line.
    pub fn discounts_subtotal(&self) -> bool {
        match (self.promotion_type, self.discount) {
            (_, DiscountKind::UniformPrice(_)) => false,
            (PromotionType::OrderPercentage | PromotionType::OrderFixed, _) => true,
            (PromotionType::HappyHour, _) => self.scope == Scope::AllOrder,
            _ => false,
        }
    }
}

// =============================================================================
// Promotion Payload (wire form)
// =============================================================================

/// The promotion as the admin UI sends and receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPayload {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub discount: DiscountValues,
    #[serde(default)]
    pub applicable_items: ApplicableItems,
    #[serde(default)]
    pub specific_dishes: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "calendar_date")]
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date")]
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Read-only. Ignored on input.
    #[serde(default)]
    pub usage_count: u32,
    /// Read-only. Ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_usage: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl PromotionPayload {
    /// Validates the payload and converts it into a core [`Promotion`].
    ///
    /// `usageCount` from the payload is ignored; the returned promotion
    /// starts at zero and storage fills in the ledger value.
    ///
    /// ## Rules
    /// - `name` is required
    /// - the discount kind follows `type` (and `discountType` for
    ///   `happy_hour`); the matching `discount` field must be present
    /// - percentage 1–100, amounts within `0..=MAX_PRICE`
    /// - `uniform_price` only for `happy_hour`
    /// - order-level types apply to `all_order` only
    /// - `specific_dishes` / `categories` scopes need a non-empty set
    /// - `startDate <= endDate`
    /// - conditions: see [`Conditions`]
    pub fn into_promotion(self, id: impl Into<String>) -> ValidationResult<Promotion> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            });
        }

        let discount = self.discount_kind()?;
        let scope = self.scope()?;

        if self.start_date > self.end_date {
            return Err(ValidationError::invalid(
                "endDate",
                "must not be before startDate",
            ));
        }

        self.conditions.validate(self.promotion_type)?;

        let code = match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(validate_code(code)?),
            _ => None,
        };

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Promotion {
            id: id.into(),
            name,
            description,
            promotion_type: self.promotion_type,
            discount,
            scope,
            conditions: self.conditions,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
            priority: self.priority,
            code,
            usage_count: 0,
        })
    }

    fn discount_kind(&self) -> ValidationResult<DiscountKind> {
        let implied = match self.promotion_type {
            PromotionType::OrderPercentage | PromotionType::ItemPercentage => {
                DiscountType::Percentage
            }
            PromotionType::OrderFixed | PromotionType::ItemFixed => DiscountType::FixedAmount,
            PromotionType::HappyHour => self.discount_type.ok_or_else(|| {
                ValidationError::Required {
                    field: "discountType".to_string(),
                }
            })?,
        };

        if let Some(declared) = self.discount_type {
            if declared != implied {
                return Err(ValidationError::invalid(
                    "discountType",
                    format!("does not match promotion type {}", self.promotion_type),
                ));
            }
        }

        match implied {
            DiscountType::Percentage => {
                let pct = self.discount.percentage.ok_or_else(|| ValidationError::Required {
                    field: "discount.percentage".to_string(),
                })?;
                if !(1..=100).contains(&pct) {
                    return Err(ValidationError::OutOfRange {
                        field: "discount.percentage".to_string(),
                        min: 1,
                        max: 100,
                    });
                }
                Ok(DiscountKind::Percentage(pct))
            }
            DiscountType::FixedAmount => {
                let amount = required_amount(self.discount.fixed_amount, "discount.fixedAmount")?;
                Ok(DiscountKind::FixedAmount(amount))
            }
            DiscountType::UniformPrice => {
                let amount =
                    required_amount(self.discount.uniform_price, "discount.uniformPrice")?;
                Ok(DiscountKind::UniformPrice(amount))
            }
        }
    }

    fn scope(&self) -> ValidationResult<Scope> {
        if self.promotion_type.is_order_level() && self.applicable_items != ApplicableItems::AllOrder
        {
            return Err(ValidationError::invalid(
                "applicableItems",
                "order-level promotions apply to the whole order",
            ));
        }

        let collect = |ids: &[String], field: &str| -> ValidationResult<BTreeSet<String>> {
            let set: BTreeSet<String> = ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            if set.is_empty() {
                return Err(ValidationError::Empty {
                    field: field.to_string(),
                });
            }
            Ok(set)
        };

        match self.applicable_items {
            ApplicableItems::AllOrder => Ok(Scope::AllOrder),
            ApplicableItems::SpecificDishes => Ok(Scope::SpecificDishes(collect(
                &self.specific_dishes,
                "specificDishes",
            )?)),
            ApplicableItems::Categories => {
                Ok(Scope::Categories(collect(&self.categories, "categories")?))
            }
        }
    }
}

fn required_amount(value: Option<i64>, field: &str) -> ValidationResult<i64> {
    let amount = value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;
    if !(0..=MAX_PRICE).contains(&amount) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE,
        });
    }
    Ok(amount)
}

impl From<&Promotion> for PromotionPayload {
    fn from(promotion: &Promotion) -> Self {
        let (specific_dishes, categories) = match &promotion.scope {
            Scope::AllOrder => (vec![], vec![]),
            Scope::SpecificDishes(dishes) => (dishes.iter().cloned().collect(), vec![]),
            Scope::Categories(categories) => (vec![], categories.iter().cloned().collect()),
        };

        PromotionPayload {
            id: Some(promotion.id.clone()),
            name: promotion.name.clone(),
            description: promotion.description.clone(),
            promotion_type: promotion.promotion_type,
            discount_type: Some(promotion.discount.discount_type()),
            discount: promotion.discount.to_values(),
            applicable_items: promotion.scope.applicable_items(),
            specific_dishes,
            categories,
            conditions: promotion.conditions.clone(),
            is_active: promotion.is_active,
            start_date: promotion.start_date,
            end_date: promotion.end_date,
            priority: promotion.priority,
            code: promotion.code.clone(),
            usage_count: promotion.usage_count,
            remaining_usage: promotion.remaining_usage(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
