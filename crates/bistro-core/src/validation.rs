//! # Validation Module
//!
//! Input validation for orders and promotions.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (React forms)                                       │
//! │  └── Immediate user feedback, never trusted                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Order API (Rust)                                             │
//! │  ├── Type validation (deserialization)                                 │
//! │  ├── THIS MODULE: shape and range rules                                │
//! │  └── apply_catalog(): dishes must exist, category from the menu        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE coupon codes                                               │
//! │  └── Conditional updates on usage counters                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are JSON paths (`items[2].quantity`) so the client
//! can point at the offending input.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AppliedPromotion, Dish, Order};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_AMOUNT, MAX_ORDER_LINES, MAX_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted coupon code.
pub const MAX_CODE_LEN: usize = 32;

/// Longest accepted customer phone number.
pub const MAX_PHONE_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
/// - ASCII letters, numbers, hyphens, underscores (so SQLite's `lower()`
///   and Rust agree on case folding)
///
/// ## Returns
/// The trimmed code, case preserved.
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_code;
///
/// assert_eq!(validate_code("  LUNCH-10 ").unwrap(), "LUNCH-10");
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code.to_string())
}

/// Validates a customer phone number. Empty is allowed (walk-in).
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if phone.trim().chars().count() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "customerDetails.phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cashier types quantity: 1000 (meant 10)                                │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity("items[0].quantity", 1000) ← THIS FUNCTION           │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → "items[0].quantity must be positive"             │
/// │       ├── qty > 999? → "items[0].quantity must be between 1 and 999"    │
/// │       └── OK → pricing                                                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in minor units.
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_price;
///
/// assert!(validate_price("price", 38_000).is_ok());
/// assert!(validate_price("price", 0).is_ok());     // free item
/// assert!(validate_price("price", -100).is_err());
/// assert!(validate_price("price", i64::MAX).is_err());
/// ```
pub fn validate_price(field: &str, minor: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE).contains(&minor) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates the shape of an order before any lookup or pricing.
///
/// ## Rules
/// - 1 to 100 lines
/// - every line: `dishId` present, quantity 1–999, prices within `0..=MAX_PRICE`
/// - every topping: `toppingId` present, quantity 1–999, price within `0..=MAX_PRICE`
/// - subtotal at most `MAX_ORDER_AMOUNT`
/// - customer phone at most 20 characters
pub fn validate_order(order: &Order) -> ValidationResult<()> {
    if order.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if order.items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for (i, item) in order.items.iter().enumerate() {
        if item.dish_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: format!("items[{}].dishId", i),
            });
        }
        validate_quantity(&format!("items[{}].quantity", i), item.quantity)?;
        validate_price(
            &format!("items[{}].pricePerQuantity", i),
            item.price_per_quantity,
        )?;
        if let Some(variant) = &item.variant {
            validate_price(&format!("items[{}].variant.price", i), variant.price)?;
        }

        for (j, topping) in item.toppings.iter().enumerate() {
            if topping.topping_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: format!("items[{}].toppings[{}].toppingId", i, j),
                });
            }
            validate_quantity(
                &format!("items[{}].toppings[{}].quantity", i, j),
                topping.quantity,
            )?;
            validate_price(
                &format!("items[{}].toppings[{}].pricePerQuantity", i, j),
                topping.price_per_quantity,
            )?;
        }
    }

    match order.checked_subtotal() {
        Some(subtotal) if subtotal.minor() <= MAX_ORDER_AMOUNT => {}
        _ => {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 0,
                max: MAX_ORDER_AMOUNT,
            })
        }
    }

    if let Some(phone) = &order.customer_details.phone {
        validate_phone(phone)?;
    }

    Ok(())
}

/// Promotions do not stack: at most one may be claimed per order.
pub fn ensure_single_promotion(claims: &[AppliedPromotion]) -> CoreResult<()> {
    if claims.len() > 1 {
        return Err(CoreError::StackingNotAllowed {
            requested: claims.len(),
        });
    }
    Ok(())
}

/// Resolves every line against the dish catalog.
///
/// Each dish must exist and be active. The line's category is replaced by
/// the catalog's, so category-scoped promotions cannot be gamed by the
/// client. A line without a variant must carry the menu price. A blank line
/// name is filled from the menu.
///
/// ## Errors
/// - `DishNotFound` / `DishUnavailable` for unknown or inactive dishes
/// - `Validation` on `items[i].pricePerQuantity` when the base price
///   differs from the menu
pub fn apply_catalog(order: &mut Order, catalog: &HashMap<String, Dish>) -> CoreResult<()> {
    for (i, item) in order.items.iter_mut().enumerate() {
        let dish = catalog
            .get(&item.dish_id)
            .ok_or_else(|| CoreError::DishNotFound(item.dish_id.clone()))?;
        if !dish.is_active {
            return Err(CoreError::DishUnavailable(item.dish_id.clone()));
        }
        if item.variant.is_none() && item.price_per_quantity != dish.price {
            return Err(ValidationError::invalid(
                format!("items[{}].pricePerQuantity", i),
                format!("must match the menu price {}", dish.price),
            )
            .into());
        }
        item.category = dish.category.clone();
        if item.name.trim().is_empty() {
            item.name = dish.name.clone();
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
