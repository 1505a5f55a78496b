//! Engine error types.
//!
//! Every failure is a local precondition violation raised synchronously at the
//! point it is detected. A call either succeeds fully or fails with exactly
//! one of these kinds; nothing is retried.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Insufficient usage data: {0}")]
    InsufficientData(String),

    #[error("Invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Analysis window {start} to {end} spans {days} days; at most {max_days} are allowed")]
    WindowTooLong {
        start: NaiveDate,
        end: NaiveDate,
        days: i64,
        max_days: u32,
    },

    #[error("Invalid service level {0}: must be strictly between 0 and 1")]
    InvalidServiceLevel(f64),

    #[error("Invalid lead time {0}: must be at least 1 day")]
    InvalidLeadTime(i64),

    #[error("Records span multiple items ({0}); an item_id filter is required")]
    ItemMismatch(String),

    #[error("Invalid quantity {quantity} for item '{item_id}' on {date}")]
    InvalidQuantity {
        item_id: String,
        date: NaiveDate,
        quantity: f64,
    },

    #[error("Invalid current stock {0}: must be a non-negative number")]
    InvalidStock(f64),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
