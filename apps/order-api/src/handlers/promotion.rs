//! `/api/promotion` handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bistro_core::{PromotionAnalytics, PromotionPayload};
use serde::Serialize;

use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiQuery, ApiResponse};
use crate::services::promotions::{self, AnalyticsQuery, CouponCheck, CouponRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Deleted {
    #[serde(rename = "_id")]
    pub id: String,
}

/// `GET /api/promotion`
pub async fn list_promotions(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<PromotionPayload>>>> {
    Ok(Json(ApiResponse::ok(promotions::list(&state).await?)))
}

/// `POST /api/promotion`
pub async fn create_promotion(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PromotionPayload>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PromotionPayload>>)> {
    let created = promotions::create(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// `GET /api/promotion/:id`
pub async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PromotionPayload>>> {
    Ok(Json(ApiResponse::ok(promotions::get(&state, &id).await?)))
}

/// `PUT /api/promotion/:id`
pub async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<PromotionPayload>,
) -> ApiResult<Json<ApiResponse<PromotionPayload>>> {
    let updated = promotions::update(&state, &id, payload).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// `DELETE /api/promotion/:id`
pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    promotions::delete(&state, &id).await?;
    Ok(Json(ApiResponse::ok(Deleted { id })))
}

/// `POST /api/promotion/validate-coupon`
pub async fn validate_coupon(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CouponRequest>,
) -> ApiResult<Json<ApiResponse<CouponCheck>>> {
    let check = promotions::validate_coupon(&state, request).await?;
    Ok(Json(ApiResponse::ok(check)))
}

/// `GET /api/promotion/analytics?startDate&endDate`
pub async fn analytics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<PromotionAnalytics>>>> {
    let report = promotions::analytics(&state, query).await?;
    Ok(Json(ApiResponse::ok(report)))
}
