//! # Promotion Matcher
//!
//! Decides which promotions an order is eligible for, and which one applies.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog (all promotions, active or not)                                │
//! │      │                                                                  │
//! │      ▼  check_eligibility() for each                                    │
//! │  ┌──────────────────────────┐     ┌──────────────────────────────────┐  │
//! │  │ eligible                 │     │ rejected                         │  │
//! │  │  promotion + base amount │     │  promotion + IneligibleReason    │  │
//! │  └────────────┬─────────────┘     └──────────────────────────────────┘  │
//! │               │ stable sort, priority descending                        │
//! │               ▼                                                         │
//! │  select_applicable(): first one only (promotions do not stack)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matching is pure: no counters change here. Evaluation time comes from the
//! server clock through [`OrderContext::now`], never from the client.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime};
use thiserror::Error;

use crate::money::Money;
use crate::promotion::{DayOfWeek, Promotion, Scope};
use crate::types::Order;

/// This customer's usage so far, keyed by promotion id.
pub type CustomerUsage = HashMap<String, u32>;

// =============================================================================
// Context
// =============================================================================

/// Everything besides the order itself that eligibility depends on.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    /// Store wall-clock time of evaluation.
    pub now: NaiveDateTime,
    /// Coupon code supplied with the order, if any.
    pub supplied_code: Option<&'a str>,
    /// Key for per-customer limits (see `CustomerDetails::customer_key`).
    pub customer_key: Option<&'a str>,
    /// Per-promotion usage of `customer_key`.
    pub customer_usage: Option<&'a CustomerUsage>,
}

impl<'a> OrderContext<'a> {
    pub fn new(now: NaiveDateTime) -> Self {
        OrderContext {
            now,
            supplied_code: None,
            customer_key: None,
            customer_usage: None,
        }
    }

    pub fn with_code(mut self, code: Option<&'a str>) -> Self {
        self.supplied_code = code;
        self
    }

    pub fn with_customer(mut self, key: Option<&'a str>, usage: &'a CustomerUsage) -> Self {
        self.customer_key = key;
        self.customer_usage = Some(usage);
        self
    }

    fn customer_uses(&self, promotion_id: &str) -> u32 {
        self.customer_usage
            .and_then(|usage| usage.get(promotion_id).copied())
            .unwrap_or(0)
    }
}

// =============================================================================
// Ineligibility
// =============================================================================

/// Why a promotion was not eligible. Used for diagnostics and for the
/// message of a rejected claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IneligibleReason {
    #[error("promotion is not active")]
    Inactive,
    #[error("promotion has not started yet")]
    NotStarted,
    #[error("promotion has expired")]
    Expired,
    #[error("not valid on this day of the week")]
    ExcludedWeekday,
    #[error("outside its time slots")]
    OutsideTimeSlots,
    #[error("usage limit reached")]
    UsageLimitReached,
    #[error("customer usage limit reached")]
    CustomerLimitReached,
    #[error("a customer phone number is required")]
    CustomerUnknown,
    #[error("a coupon code is required")]
    CodeRequired,
    #[error("coupon code does not match")]
    CodeMismatch,
    #[error("not available for third-party orders")]
    ThirdPartyExcluded,
    #[error("order subtotal is below the minimum")]
    BelowMinimum,
    #[error("order subtotal is above the maximum")]
    AboveMaximum,
    #[error("no items in the order qualify")]
    NoItemsInScope,
}

/// Trim + case-insensitive coupon comparison.
pub fn code_matches(expected: &str, supplied: &str) -> bool {
    expected.trim().to_lowercase() == supplied.trim().to_lowercase()
}

/// Checks the conditions that do not depend on the order contents:
/// active flag, date window, weekday, time slots, usage counters, code.
pub fn check_static(promotion: &Promotion, ctx: &OrderContext<'_>) -> Result<(), IneligibleReason> {
    if !promotion.is_active {
        return Err(IneligibleReason::Inactive);
    }

    let today = ctx.now.date();
    if today < promotion.start_date {
        return Err(IneligibleReason::NotStarted);
    }
    if today > promotion.end_date {
        return Err(IneligibleReason::Expired);
    }

    let conditions = &promotion.conditions;
    if !conditions.days_of_week.is_empty()
        && !conditions
            .days_of_week
            .contains(&DayOfWeek::from(ctx.now.weekday()))
    {
        return Err(IneligibleReason::ExcludedWeekday);
    }

    let time = ctx.now.time();
    if !conditions.time_slots.is_empty()
        && !conditions.time_slots.iter().any(|slot| slot.contains(time))
    {
        return Err(IneligibleReason::OutsideTimeSlots);
    }

    if let Some(limit) = conditions.usage_limit {
        if promotion.usage_count >= limit {
            return Err(IneligibleReason::UsageLimitReached);
        }
    }

    if let Some(limit) = conditions.per_customer_limit {
        if ctx.customer_key.is_none() {
            return Err(IneligibleReason::CustomerUnknown);
        }
        if ctx.customer_uses(&promotion.id) >= limit {
            return Err(IneligibleReason::CustomerLimitReached);
        }
    }

    if let Some(code) = &promotion.code {
        match ctx.supplied_code {
            None => return Err(IneligibleReason::CodeRequired),
            Some(supplied) if !code_matches(code, supplied) => {
                return Err(IneligibleReason::CodeMismatch)
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Full eligibility check against an order.
///
/// Returns the discountable base: the subtotal for whole-order scopes, the
/// sum of matched lines otherwise.
pub fn check_eligibility(
    promotion: &Promotion,
    order: &Order,
    ctx: &OrderContext<'_>,
) -> Result<Money, IneligibleReason> {
    check_static(promotion, ctx)?;

    if promotion.conditions.exclude_third_party && order.is_third_party() {
        return Err(IneligibleReason::ThirdPartyExcluded);
    }

    let subtotal = order.subtotal();
    if let Some(min) = promotion.conditions.min_order_amount {
        if subtotal < Money::from_minor(min) {
            return Err(IneligibleReason::BelowMinimum);
        }
    }
    if let Some(max) = promotion.conditions.max_order_amount {
        if subtotal > Money::from_minor(max) {
            return Err(IneligibleReason::AboveMaximum);
        }
    }

    match &promotion.scope {
        Scope::AllOrder => Ok(subtotal),
        scope => {
            let mut matched = order.items.iter().filter(|line| scope.matches(line)).peekable();
            if matched.peek().is_none() {
                return Err(IneligibleReason::NoItemsInScope);
            }
            Ok(matched.map(|line| line.line_total()).sum())
        }
    }
}

// =============================================================================
// Matching
// =============================================================================

/// A promotion that passed every check.
#[derive(Debug, Clone, Copy)]
pub struct EligiblePromotion<'a> {
    pub promotion: &'a Promotion,
    pub discountable_base: Money,
}

/// A promotion that did not, and why.
#[derive(Debug, Clone, Copy)]
pub struct Rejection<'a> {
    pub promotion: &'a Promotion,
    pub reason: IneligibleReason,
}

/// Result of matching one order against a catalog.
#[derive(Debug, Clone, Default)]
pub struct MatchReport<'a> {
    /// Priority descending; ties keep catalog order.
    pub eligible: Vec<EligiblePromotion<'a>>,
    /// Catalog order.
    pub rejected: Vec<Rejection<'a>>,
}

impl<'a> MatchReport<'a> {
    /// The applicable promotions under the single-promotion policy: the
    /// highest-priority eligible one, or none.
    pub fn select_applicable(&self) -> Vec<&'a Promotion> {
        self.eligible
            .first()
            .map(|e| vec![e.promotion])
            .unwrap_or_default()
    }

    /// Why `promotion_id` was rejected, if it was.
    pub fn reason_for(&self, promotion_id: &str) -> Option<IneligibleReason> {
        self.rejected
            .iter()
            .find(|r| r.promotion.id == promotion_id)
            .map(|r| r.reason)
    }
}

/// Evaluates every promotion in `catalog` against `order`.
///
/// ## Example
/// ```rust
/// use bistro_core::matcher::{match_promotions, OrderContext};
/// use bistro_core::Order;
///
/// let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
///     .unwrap()
///     .and_hms_opt(12, 0, 0)
///     .unwrap();
/// let report = match_promotions(&Order::default(), &[], &OrderContext::new(now));
/// assert!(report.select_applicable().is_empty());
/// ```
pub fn match_promotions<'a>(
    order: &Order,
    catalog: &'a [Promotion],
    ctx: &OrderContext<'_>,
) -> MatchReport<'a> {
    let mut report = MatchReport::default();

    for promotion in catalog {
        match check_eligibility(promotion, order, ctx) {
            Ok(base) => report.eligible.push(EligiblePromotion {
                promotion,
                discountable_base: base,
            }),
            Err(reason) => report.rejected.push(Rejection { promotion, reason }),
        }
    }

    // sort_by_key is stable
    report
        .eligible
        .sort_by_key(|e| Reverse(e.promotion.priority));
    report
}

// =============================================================================
// Unit Tests
// =============================================================================
