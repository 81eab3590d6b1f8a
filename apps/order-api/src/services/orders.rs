//! Order submission, pricing preview, lookup and cancellation.
//!
//! Every amount the server persists is the one it computed itself. The
//! client's `bills` and `appliedPromotions` are only compared against it.

use bistro_core::matcher::match_promotions;
use bistro_core::validation::{apply_catalog, ensure_single_promotion, validate_order};
use bistro_core::{
    CoreError, CustomerUsage, Order, OrderContext, OrderSubmission, PlacedOrder, PricingOutcome,
    Promotion,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Validates, re-prices and commits a submitted order.
///
/// ## Steps
/// 1. Shape checks, at most one claimed promotion
/// 2. Lines resolved against the menu (categories from the catalog)
/// 3. Claimed promotions loaded and matched at server time
/// 4. Bills recomputed and compared field by field
/// 5. Ledger reservation and order row written in one transaction
pub async fn submit(state: &AppState, submission: OrderSubmission) -> ApiResult<PlacedOrder> {
    let (mut order, bills, claims) = submission.into_parts();

    validate_order(&order)?;
    ensure_single_promotion(&claims)?;
    resolve_lines(state, &mut order).await?;

    let mut claimed: Vec<Promotion> = Vec::with_capacity(claims.len());
    for claim in &claims {
        let promotion = state
            .db
            .promotions()
            .get_by_id(&claim.promotion_id)
            .await?
            .ok_or_else(|| CoreError::PromotionNotFound(claim.promotion_id.clone()))?;
        claimed.push(promotion);
    }

    let customer_key = order.customer_details.customer_key().map(str::to_string);
    let usage = customer_usage(state, customer_key.as_deref()).await?;
    let supplied_code = claims.iter().find_map(|claim| claim.code.as_deref());
    let now = state.store_now();

    let ctx = OrderContext::new(now)
        .with_code(supplied_code)
        .with_customer(customer_key.as_deref(), &usage);
    let report = match_promotions(&order, &claimed, &ctx);

    if let Some(rejection) = report.rejected.first() {
        debug!(
            promotion_id = %rejection.promotion.id,
            reason = %rejection.reason,
            "Claimed promotion rejected"
        );
        return Err(CoreError::PromotionNotApplicable {
            promotion_id: rejection.promotion.id.clone(),
            reason: rejection.reason,
        }
        .into());
    }

    let applicable: Vec<&Promotion> = report.eligible.iter().map(|e| e.promotion).collect();
    let outcome = state
        .engine
        .validate(&order, &applicable, &bills)
        .and_then(|outcome| {
            state.engine.reconcile_claims(&outcome, &claims)?;
            Ok(outcome)
        })
        .map_err(|e| {
            warn!(error = %e, subtotal = bills.subtotal, "Order rejected");
            ApiError::from(e)
        })?;

    let placed = PlacedOrder {
        id: Uuid::new_v4().to_string(),
        customer_details: order.customer_details,
        order_status: order.order_status,
        bills: outcome.bills,
        applied_promotions: outcome.applied_promotions,
        items: order.items,
        third_party_vendor: order.third_party_vendor,
        created_at: state.now(),
        cancelled_at: None,
    };

    state
        .db
        .orders()
        .commit(&placed, customer_key.as_deref(), now.date())
        .await
        .map_err(|e| {
            warn!(order_id = %placed.id, error = %e, "Order commit failed");
            ApiError::from(e)
        })?;

    info!(
        order_id = %placed.id,
        subtotal = placed.bills.subtotal,
        discount = placed.bills.promotion_discount,
        total = placed.bills.total_with_tax,
        "Order placed"
    );
    Ok(placed)
}

/// Prices an order with the best eligible promotion from the catalog.
///
/// Nothing is reserved; this is the path clients re-fetch after a 409.
/// A coupon code makes coupon-gated promotions eligible.
pub async fn preview(
    state: &AppState,
    mut order: Order,
    coupon_code: Option<&str>,
) -> ApiResult<PricingOutcome> {
    validate_order(&order)?;
    resolve_lines(state, &mut order).await?;

    let catalog = state.db.promotions().list_all().await?;
    let customer_key = order.customer_details.customer_key().map(str::to_string);
    let usage = customer_usage(state, customer_key.as_deref()).await?;

    let ctx = OrderContext::new(state.store_now())
        .with_code(coupon_code)
        .with_customer(customer_key.as_deref(), &usage);
    let report = match_promotions(&order, &catalog, &ctx);

    for rejection in &report.rejected {
        debug!(
            promotion_id = %rejection.promotion.id,
            reason = %rejection.reason,
            "Promotion not eligible"
        );
    }

    let outcome = state.engine.price(&order, &report.select_applicable());
    debug!(
        subtotal = outcome.bills.subtotal,
        discount = outcome.bills.promotion_discount,
        eligible = report.eligible.len(),
        "Order priced"
    );
    Ok(outcome)
}

/// Gets a committed order.
pub async fn get(state: &AppState, id: &str) -> ApiResult<PlacedOrder> {
    state
        .db
        .orders()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))
}

/// Cancels an order and releases the promotion uses it held.
pub async fn cancel(state: &AppState, id: &str) -> ApiResult<PlacedOrder> {
    let order = state.db.orders().cancel(id, state.now()).await?;
    info!(order_id = %id, "Order cancelled");
    Ok(order)
}

/// Replaces client-sent categories with the menu's and rejects unknown or
/// inactive dishes.
pub(crate) async fn resolve_lines(state: &AppState, order: &mut Order) -> ApiResult<()> {
    let dishes = state.db.dishes().get_many(&order.dish_ids()).await?;
    apply_catalog(order, &dishes)?;
    Ok(())
}

pub(crate) async fn customer_usage(
    state: &AppState,
    customer_key: Option<&str>,
) -> ApiResult<CustomerUsage> {
    match customer_key {
        Some(key) => Ok(state.db.ledger().customer_usage(key).await?),
        None => Ok(CustomerUsage::new()),
    }
}
