//! # Repository Module
//!
//! Database repository implementations for Bistro POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Order service                                                         │
//! │       │                                                                 │
//! │       │  db.dishes().get_many(&ids)                                    │
//! │       │  db.promotions().list_all()                                    │
//! │       │  db.ledger().customer_usage(phone)                             │
//! │       │  db.orders().commit(&order, ...)                               │
//! │       ▼                                                                 │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐   │
//! │  │ DishRepo     │ │ PromotionRepo│ │ UsageLedger  │ │ OrderRepo    │   │
//! │  │ read-only at │ │ admin CRUD,  │ │ reserve /    │ │ commit and   │   │
//! │  │ order time   │ │ analytics    │ │ release      │ │ cancel txns  │   │
//! │  └──────────────┘ └──────────────┘ └──────▲───────┘ └──────┬───────┘   │
//! │                                           └────────────────┘           │
//! │                               commit/cancel call the ledger            │
//! │                               inside their own transaction             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`dish::DishRepository`] - Menu catalog lookup
//! - [`promotion::PromotionRepository`] - Promotion catalog and analytics
//! - [`ledger::UsageLedger`] - Atomic usage counters
//! - [`order::OrderRepository`] - Order persistence

pub mod dish;
pub mod ledger;
pub mod order;
pub mod promotion;
