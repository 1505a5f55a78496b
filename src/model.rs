//! Data models for PARLogic.
//!
//! The four engine value types flow strictly left to right:
//!
//! `UsageRecord` → [`UsageProfile`] → [`PARLevels`] → [`StockRecommendation`]
//!
//! Each is built by one engine call and never mutated afterwards. The HTTP
//! request and response shapes that wrap them live at the bottom of this module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized consumption fact for one item on one day.
///
/// Produced by the ingestion collaborator; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Item identifier (e.g. "SUP001").
    pub item_id: String,

    /// Calendar date of the consumption.
    pub date: NaiveDate,

    /// Quantity consumed. Must be finite and non-negative.
    pub quantity: f64,
}

impl UsageRecord {
    pub fn new(item_id: impl Into<String>, date: NaiveDate, quantity: f64) -> Self {
        Self {
            item_id: item_id.into(),
            date,
            quantity,
        }
    }
}

/// Direction of usage over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Inclusive calendar window an analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Number of calendar days in the window, both ends included.
    pub fn days(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Statistical demand profile of one item over a window.
///
/// Invariants: `peak_usage >= average_daily_usage >= 0` and
/// `std_dev_daily_usage >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageProfile {
    pub item_id: String,

    /// Mean quantity per calendar day; days without records count as zero.
    pub average_daily_usage: f64,

    /// Largest single-day total in the window.
    pub peak_usage: f64,

    /// Bessel-corrected sample standard deviation of the daily series.
    pub std_dev_daily_usage: f64,

    pub trend: Trend,

    /// Peak-period mean over overall mean. `None` when the window covers
    /// fewer than two seasonal groups.
    pub seasonality_factor: Option<f64>,

    /// Self-assessed reliability of the profile, in `[0, 1]`.
    pub confidence_level: f64,

    pub date_range: DateRange,
}

/// Inventory-control parameters for one item.
///
/// Invariants: `min_par <= reorder_point <= max_par` and
/// `safety_stock <= reorder_point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PARLevels {
    pub item_id: String,
    pub min_par: f64,
    pub max_par: f64,
    pub reorder_point: f64,
    pub safety_stock: f64,
    pub service_level: f64,
    pub lead_time_days: u32,
}

/// How soon a stock recommendation needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Coarse action carried by the deprecated recommendation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Stock is at or below the reorder point; place an order.
    Reorder,
    /// Stock is between the reorder point and maximum PAR; watch it.
    Monitor,
    /// Stock is at or above maximum PAR.
    NoAction,
}

/// Where current stock sits relative to the PAR band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    /// Strictly below `min_par`.
    BelowMin,
    /// Within `[min_par, max_par]`.
    Optimal,
    /// Strictly above `max_par`.
    AboveMax,
}

/// Reorder recommendation for one item given its current stock.
///
/// Serializes to the canonical (version 2) response shape:
///
/// ```json
/// {
///     "item_id": "SUP001",
///     "current_stock": 60.0,
///     "recommended_order": 90.0,
///     "urgency": "medium",
///     "status": "OPTIMAL",
///     "next_review_date": "2024-03-08",
///     "details": "Place order for 90 units ..."
/// }
/// ```
///
/// `recommended_action` is only emitted through [`LegacyStockRecommendation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRecommendation {
    pub item_id: String,
    pub current_stock: f64,
    pub recommended_order: f64,
    #[serde(skip_serializing)]
    pub recommended_action: RecommendedAction,
    pub urgency: Urgency,
    pub status: StockStatus,
    pub next_review_date: NaiveDate,
    pub details: String,
}

/// Deprecated (version 1) recommendation shape, kept for older consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyStockRecommendation {
    pub item_id: String,
    pub current_stock: f64,
    pub recommended_action: RecommendedAction,
    pub urgency: Urgency,
    pub status: StockStatus,
    pub details: String,
}

impl From<&StockRecommendation> for LegacyStockRecommendation {
    fn from(rec: &StockRecommendation) -> Self {
        Self {
            item_id: rec.item_id.clone(),
            current_stock: rec.current_stock,
            recommended_action: rec.recommended_action,
            urgency: rec.urgency,
            status: rec.status,
            details: rec.details.clone(),
        }
    }
}

// ============================================================================
// Monthly usage report
// ============================================================================

/// Usage of one item in one calendar month of a window.
///
/// Months cut by the window edges only count the days inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub year: i32,
    pub month: u32,
    pub total_usage: f64,
    pub average_daily_usage: f64,
    pub min_daily_usage: f64,
    pub max_daily_usage: f64,
    pub std_dev_daily_usage: f64,
}

/// Spread of monthly totals across a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRange {
    pub min_monthly: f64,
    pub max_monthly: f64,
    pub average_monthly: f64,
    pub std_dev: f64,
}

/// Month-of-year seasonality of one item.
///
/// `seasonality_strength` is `(peak - trough) / (peak + trough)` over the
/// mean daily usage of each calendar month, pooled across years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPattern {
    pub seasonal_pattern: bool,
    pub peak_month: u32,
    pub trough_month: u32,
    pub seasonality_strength: f64,
}

/// Month-level breakdown of an item's usage over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub item_id: String,
    pub date_range: DateRange,
    pub months: Vec<MonthlyUsage>,
    pub usage_range: UsageRange,
    /// `None` when the window covers a single calendar month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<SeasonalPattern>,
}

// ============================================================================
// HTTP request/response shapes
// ============================================================================

/// Response for GET / and GET /health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Request body for POST /upload/.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub records: Vec<UsageRecord>,
}

/// Response for POST /upload/.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub rows: usize,
    pub items: usize,
}

/// Response for GET /analyze/usage/.
///
/// A projection of [`UsageProfile`]; `seasonality_factor` is omitted
/// entirely when it is not defined for the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageAnalysisResponse {
    pub item_id: String,
    pub average_daily_usage: f64,
    pub peak_usage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonality_factor: Option<f64>,
    pub trend: Trend,
    pub confidence_level: f64,
}

impl From<&UsageProfile> for UsageAnalysisResponse {
    fn from(profile: &UsageProfile) -> Self {
        Self {
            item_id: profile.item_id.clone(),
            average_daily_usage: profile.average_daily_usage,
            peak_usage: profile.peak_usage,
            seasonality_factor: profile.seasonality_factor,
            trend: profile.trend,
            confidence_level: profile.confidence_level,
        }
    }
}

/// Response for GET /recommendations/.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<StockRecommendation>,
    pub timestamp: DateTime<Utc>,
}

/// Response for the deprecated GET /recommendations/legacy/.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyRecommendationResponse {
    pub recommendations: Vec<LegacyStockRecommendation>,
    pub timestamp: DateTime<Utc>,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Query parameters for GET /analyze/usage/ and GET /analyze/monthly/.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub item_id: Option<String>,
}

/// Query parameters for GET /calculate/par/.
///
/// Without explicit dates the whole recorded history of the item is used.
/// Without `lead_time_days` the item's stored lead time applies, then the
/// configured default.
#[derive(Debug, Deserialize)]
pub struct ParQuery {
    pub item_id: String,
    pub service_level: Option<f64>,
    pub lead_time_days: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for GET /recommendations/.
///
/// Without `item_id` every known item is evaluated against the same
/// `current_stock`. Lead time falls back per item as for [`ParQuery`].
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub item_id: Option<String>,
    #[serde(default)]
    pub current_stock: f64,
    pub service_level: Option<f64>,
    pub lead_time_days: Option<i64>,
}

/// Request body for PUT /lead-times/{item_id}.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadTimeRequest {
    pub lead_time_days: i64,
}

/// Per-item lead time, as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadTimeResponse {
    pub item_id: String,
    pub lead_time_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_days_inclusive() {
        let range = DateRange {
            start: date(2024, 1, 1),
            end: date(2024, 1, 31),
        };
        assert_eq!(range.days(), 31);
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Trend::Increasing).unwrap(),
            serde_json::json!("increasing")
        );
    }

    #[test]
    fn test_analysis_response_omits_missing_seasonality() {
        let profile = UsageProfile {
            item_id: "SUP001".to_string(),
            average_daily_usage: 10.0,
            peak_usage: 12.0,
            std_dev_daily_usage: 1.0,
            trend: Trend::Stable,
            seasonality_factor: None,
            confidence_level: 0.9,
            date_range: DateRange {
                start: date(2024, 1, 1),
                end: date(2024, 1, 3),
            },
        };

        let value = serde_json::to_value(UsageAnalysisResponse::from(&profile)).unwrap();
        let fields = value.as_object().unwrap();

        assert!(!fields.contains_key("seasonality_factor"));
        assert!(!fields.contains_key("std_dev_daily_usage"));
        assert_eq!(value["trend"], "stable");
    }

    #[test]
    fn test_recommendation_shapes() {
        let rec = StockRecommendation {
            item_id: "SUP001".to_string(),
            current_stock: 60.0,
            recommended_order: 90.0,
            recommended_action: RecommendedAction::Reorder,
            urgency: Urgency::Medium,
            status: StockStatus::Optimal,
            next_review_date: date(2024, 3, 8),
            details: "reorder".to_string(),
        };

        let canonical = serde_json::to_value(&rec).unwrap();
        assert_eq!(canonical["recommended_order"], 90.0);
        assert_eq!(canonical["next_review_date"], "2024-03-08");
        assert_eq!(canonical["status"], "OPTIMAL");
        assert!(canonical.get("recommended_action").is_none());

        let legacy = serde_json::to_value(LegacyStockRecommendation::from(&rec)).unwrap();
        assert_eq!(legacy["recommended_action"], "reorder");
        assert_eq!(legacy["urgency"], "medium");
        assert!(legacy.get("recommended_order").is_none());
        assert_eq!(legacy["status"], "OPTIMAL");
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::High > Urgency::Medium);
        assert!(Urgency::Medium > Urgency::Low);
    }
}
