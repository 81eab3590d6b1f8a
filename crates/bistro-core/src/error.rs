//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - Pricing and promotion failures                 │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bistro-db errors (separate crate)                                     │
//! │  └── DbError          - Database and ledger failures                   │
//! │                                                                         │
//! │  Order API errors (in app)                                             │
//! │  └── ApiError         - What the HTTP client sees                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → HTTP response          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::matcher::IneligibleReason;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is reported to the caller; pricing is either provably
/// correct or the order is rejected.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line item references a dish that is not on the menu.
    #[error("Dish not found: {0}")]
    DishNotFound(String),

    /// A line item references a dish that has been taken off the menu.
    #[error("Dish is not available: {0}")]
    DishUnavailable(String),

    /// A referenced promotion id does not exist.
    #[error("Promotion not found: {0}")]
    PromotionNotFound(String),

    /// No promotion carries the supplied coupon code.
    #[error("No promotion matches coupon code '{0}'")]
    CouponNotFound(String),

    /// A claimed promotion exists but the order does not qualify for it.
    ///
    /// ## User Workflow
    /// ```text
    /// Cashier picks "Happy Hour 2-5pm" at 17:05
    ///      │
    ///      ▼
    /// PromotionNotApplicable { reason: OutsideTimeSlots }
    ///      │
    ///      ▼
    /// UI shows: "Promotion Happy Hour is not applicable: outside its time slots"
    /// ```
    #[error("Promotion {promotion_id} is not applicable: {reason}")]
    PromotionNotApplicable {
        promotion_id: String,
        reason: IneligibleReason,
    },

    /// More than one promotion was claimed for a single order.
    #[error("Only one promotion may be applied per order ({requested} requested)")]
    StackingNotAllowed { requested: usize },

    /// The client-submitted bill disagrees with the server computation.
    #[error("Bill mismatch on {field}: expected {expected}, submitted {submitted}")]
    BillMismatch {
        field: String,
        expected: i64,
        submitted: i64,
    },

    /// A stored promotion definition no longer converts into a valid promotion.
    #[error("Promotion {id} is misconfigured: {reason}")]
    InvalidPromotion { id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before pricing runs. The `field` names the
/// offending JSON path, e.g. `items[2].quantity`.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection must contain at least one element.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format or inconsistent combination of fields.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate coupon code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Creates an InvalidFormat error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the field this error is about.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::Empty { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_mismatch_message_names_field_and_values() {
        let err = CoreError::BillMismatch {
            field: "total".to_string(),
            expected: 34_200,
            submitted: 30_000,
        };
        assert_eq!(
            err.to_string(),
            "Bill mismatch on total: expected 34200, submitted 30000"
        );
    }

    #[test]
    fn test_not_applicable_message_includes_reason() {
        let err = CoreError::PromotionNotApplicable {
            promotion_id: "promo-1".to_string(),
            reason: IneligibleReason::Inactive,
        };
        assert_eq!(
            err.to_string(),
            "Promotion promo-1 is not applicable: promotion is not active"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items[0].dishId".to_string(),
        };
        assert_eq!(err.to_string(), "items[0].dishId is required");
        assert_eq!(err.field(), "items[0].dishId");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
