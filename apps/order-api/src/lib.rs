//! # Bistro Order API
//!
//! HTTP JSON API for order submission and promotion management.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        POST /api/order                                  │
//! │                                                                         │
//! │  handlers::order ──► services::orders::submit                          │
//! │                         │                                               │
//! │                         ├── validate_order / one promotion at most     │
//! │                         ├── dishes().get_many → apply_catalog          │
//! │                         ├── promotions().get_by_id (claimed ones)      │
//! │                         ├── match_promotions (server clock)            │
//! │                         ├── engine.validate (bills) + reconcile_claims │
//! │                         └── orders().commit  (reserve + persist, 1 tx) │
//! │                                                                         │
//! │  201 { success: true, data: PlacedOrder }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration
//! - [`clock`] - Evaluation time source
//! - [`error`] - HTTP error mapping
//! - [`handlers`] - axum handlers and routes
//! - [`services`] - Orchestration over bistro-core and bistro-db

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bistro_core::PricingEngine;
use bistro_db::Database;
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::ApiConfig;
use crate::handlers::{health, order, promotion};

pub use crate::error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: PricingEngine,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// State running on the system clock.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState::with_clock(db, config, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, config: ApiConfig, clock: Arc<dyn Clock>) -> Self {
        AppState {
            db,
            engine: config.engine(),
            clock,
            config: Arc::new(config),
        }
    }

    /// Current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current store wall-clock time, used for every eligibility check.
    pub fn store_now(&self) -> NaiveDateTime {
        self.config.store_time(self.clock.now())
    }
}

/// Builds the router with every API route.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/order", post(order::submit_order))
        .route("/api/order/price", post(order::price_order))
        .route("/api/order/:id", get(order::get_order))
        .route("/api/order/:id/cancel", post(order::cancel_order))
        .route(
            "/api/promotion",
            get(promotion::list_promotions).post(promotion::create_promotion),
        )
        .route(
            "/api/promotion/validate-coupon",
            post(promotion::validate_coupon),
        )
        .route("/api/promotion/analytics", get(promotion::analytics))
        .route(
            "/api/promotion/:id",
            get(promotion::get_promotion)
                .put(promotion::update_promotion)
                .delete(promotion::delete_promotion),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
