//! Service layer.
//!
//! Handlers stay thin: they extract and respond. The orchestration over
//! bistro-core and bistro-db lives here.
//!
//! - [`orders`] - Submit, preview, lookup, cancel
//! - [`promotions`] - Admin CRUD, coupon validation, analytics

pub mod orders;
pub mod promotions;
