//! Promotion admin, coupon validation and analytics.
//!
//! `usageCount` is read-only here. Payload values for it are ignored and
//! only the usage ledger changes the stored counter.

use bistro_core::matcher::{check_eligibility, check_static};
use bistro_core::validation::{validate_code, validate_order, validate_phone};
use bistro_core::{
    CoreError, IneligibleReason, Order, OrderContext, PricingOutcome, Promotion,
    PromotionAnalytics, PromotionPayload, ValidationError,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::orders::{customer_usage, resolve_lines};
use crate::AppState;

/// Default analytics window when no dates are given, in days.
const DEFAULT_REPORT_DAYS: i64 = 30;

// =============================================================================
// Admin CRUD
// =============================================================================

pub async fn list(state: &AppState) -> ApiResult<Vec<PromotionPayload>> {
    let promotions = state.db.promotions().list_all().await?;
    Ok(promotions.iter().map(PromotionPayload::from).collect())
}

pub async fn get(state: &AppState, id: &str) -> ApiResult<PromotionPayload> {
    let promotion = state
        .db
        .promotions()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Promotion", id))?;
    Ok(PromotionPayload::from(&promotion))
}

/// Creates a promotion under a fresh id. Any `_id` in the payload is ignored.
pub async fn create(state: &AppState, payload: PromotionPayload) -> ApiResult<PromotionPayload> {
    let promotion = payload.into_promotion(Uuid::new_v4().to_string())?;
    let created = state.db.promotions().create(&promotion).await?;
    info!(promotion_id = %created.id, name = %created.name, "Promotion created");
    Ok(PromotionPayload::from(&created))
}

/// Replaces the configuration of promotion `id`.
pub async fn update(
    state: &AppState,
    id: &str,
    payload: PromotionPayload,
) -> ApiResult<PromotionPayload> {
    if let Some(body_id) = payload.id.as_deref() {
        if body_id != id {
            return Err(ValidationError::invalid("_id", "does not match the URL").into());
        }
    }

    let promotion = payload.into_promotion(id)?;
    let updated = state.db.promotions().update(&promotion).await?;
    Ok(PromotionPayload::from(&updated))
}

pub async fn delete(state: &AppState, id: &str) -> ApiResult<()> {
    state.db.promotions().delete(id).await?;
    Ok(())
}

// =============================================================================
// Coupon Validation
// =============================================================================

/// Body of `POST /api/promotion/validate-coupon`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    pub code: String,
    /// Customer phone, for per-customer limits when no order is sent.
    #[serde(default)]
    pub phone: Option<String>,
    /// Cart to preview the discount on.
    #[serde(default)]
    pub order: Option<Order>,
}

/// A valid coupon's promotion, with the discount it gives on the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponCheck {
    pub promotion: PromotionPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PricingOutcome>,
}

/// Looks up a coupon and checks it with the regular matching rules at
/// server time.
///
/// Without an order only the order-independent conditions are checked.
pub async fn validate_coupon(state: &AppState, request: CouponRequest) -> ApiResult<CouponCheck> {
    let code = validate_code(&request.code)?;
    let promotion = state
        .db
        .promotions()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| CoreError::CouponNotFound(code.clone()))?;

    let now = state.store_now();

    let preview = match request.order {
        Some(mut order) => {
            validate_order(&order)?;
            resolve_lines(state, &mut order).await?;

            let customer_key = order
                .customer_details
                .customer_key()
                .or_else(|| trimmed(request.phone.as_deref()))
                .map(str::to_string);
            let usage = customer_usage(state, customer_key.as_deref()).await?;
            let ctx = OrderContext::new(now)
                .with_code(Some(code.as_str()))
                .with_customer(customer_key.as_deref(), &usage);

            check_eligibility(&promotion, &order, &ctx)
                .map_err(|reason| not_applicable(&promotion, reason))?;
            Some(state.engine.price(&order, &[&promotion]))
        }
        None => {
            if let Some(phone) = request.phone.as_deref() {
                validate_phone(phone)?;
            }
            let customer_key = trimmed(request.phone.as_deref());
            let usage = customer_usage(state, customer_key).await?;
            let ctx = OrderContext::new(now)
                .with_code(Some(code.as_str()))
                .with_customer(customer_key, &usage);

            check_static(&promotion, &ctx).map_err(|reason| not_applicable(&promotion, reason))?;
            None
        }
    };

    Ok(CouponCheck {
        promotion: PromotionPayload::from(&promotion),
        preview,
    })
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn not_applicable(promotion: &Promotion, reason: IneligibleReason) -> ApiError {
    debug!(promotion_id = %promotion.id, reason = %reason, "Coupon rejected");
    CoreError::PromotionNotApplicable {
        promotion_id: promotion.id.clone(),
        reason,
    }
    .into()
}

// =============================================================================
// Analytics
// =============================================================================

/// Query of `GET /api/promotion/analytics`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Usage per promotion between two store calendar dates, inclusive.
///
/// Missing bounds default to the last 30 days up to today.
pub async fn analytics(
    state: &AppState,
    query: AnalyticsQuery,
) -> ApiResult<Vec<PromotionAnalytics>> {
    let today = state.store_now().date();

    let end = match query.end_date.as_deref() {
        Some(raw) => parse_report_date(state, "endDate", raw)?,
        None => today,
    };
    let start = match query.start_date.as_deref() {
        Some(raw) => parse_report_date(state, "startDate", raw)?,
        None => end - Duration::days(DEFAULT_REPORT_DAYS - 1),
    };

    if start > end {
        return Err(ValidationError::invalid("startDate", "must not be after endDate").into());
    }

    Ok(state.db.promotions().analytics(start, end).await?)
}

/// Accepts `YYYY-MM-DD`, or an RFC 3339 instant converted to the store's
/// calendar date.
fn parse_report_date(state: &AppState, field: &str, raw: &str) -> ApiResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| state.config.store_time(instant.with_timezone(&Utc)).date())
        .map_err(|_| ValidationError::invalid(field, "expected YYYY-MM-DD").into())
}
