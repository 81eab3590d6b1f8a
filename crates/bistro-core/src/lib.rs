//! # bistro-core: Pure Pricing Logic for Bistro POS
//!
//! This crate is the **heart** of the order service. It decides which
//! promotion an order gets and what the order costs, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bistro POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │    Menu ──► Cart ──► Promotion picker ──► Bill ──► Submit      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    Order API (axum)                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  types    │  │ promotion │  │  matcher  │  │  pricing  │  │   │
//! │  │   │  Order    │  │ Promotion │  │ eligible? │  │ discount  │  │   │
//! │  │   │  Bills    │  │ Discount  │  │ priority  │  │ reconcile │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bistro-db (Database Layer)                   │   │
//! │  │        promotion catalog, usage ledger, order persistence       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Order, line items, bills, placed orders
//! - [`promotion`] - Promotion configuration and its JSON wire form
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`matcher`] - Promotion eligibility and selection
//! - [`pricing`] - Discount computation and bill reconciliation
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::money::Money;
//!
//! let subtotal = Money::from_minor(38_000);
//! let discount = subtotal.percentage(10);
//! assert_eq!(discount.minor(), 3_800);
//! assert_eq!((subtotal - discount).minor(), 34_200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod matcher;
pub mod money;
pub mod pricing;
pub mod promotion;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use matcher::{CustomerUsage, EligiblePromotion, IneligibleReason, MatchReport, OrderContext};
pub use money::Money;
pub use pricing::{PricingEngine, PricingOutcome};
pub use promotion::{
    ApplicableItems, Conditions, DayOfWeek, DiscountKind, DiscountType, Promotion,
    PromotionPayload, PromotionType, Scope, TimeSlot,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line item.
///
/// Catches fat-fingered entries (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest accepted unit price or promotion amount, in minor units.
pub const MAX_PRICE: i64 = 100_000_000_000;

/// Largest accepted order subtotal, in minor units.
///
/// Keeps every derived amount (discount, tax, total with tax) far inside
/// `i64`.
pub const MAX_ORDER_AMOUNT: i64 = 1_000_000_000_000_000;

/// Default tolerance, in minor units, when reconciling client bills.
///
/// VND has no subunit, so one đồng is the smallest meaningful difference.
pub const DEFAULT_BILL_EPSILON: i64 = 1;
