//! Parallel per-item planning.
//!
//! Every item runs analyze → calculate (→ recommend) independently on the
//! rayon pool. There is no shared mutable state between items, so results
//! are simply collected and sorted by `item_id` for stable output.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::analysis::{analyze, record_span};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{PARLevels, StockRecommendation, UsageRecord};
use crate::par::calculate;
use crate::recommendation::recommend;

/// Recorded usage of one item plus its on-hand stock.
#[derive(Debug, Clone)]
pub struct ItemHistory {
    pub item_id: String,
    pub records: Vec<UsageRecord>,
    pub current_stock: f64,
    /// Item-specific lead time, if one was set.
    pub lead_time_days: Option<u32>,
}

/// Service level, lead time and optional window shared by a batch.
#[derive(Debug, Clone, Copy)]
pub struct PlanningParams {
    pub service_level: f64,
    /// Applies to every item when set; otherwise each item's own lead time.
    pub lead_time_days: Option<i64>,
    /// Analysis window; each item's own record span when `None`.
    pub window: Option<(NaiveDate, NaiveDate)>,
}

/// Outcome for one item of a batch.
#[derive(Debug, Clone)]
pub struct ItemOutcome<T> {
    pub item_id: String,
    pub result: EngineResult<T>,
}

/// Analyze one item and compute its PAR levels.
pub fn plan_item(
    history: &ItemHistory,
    params: &PlanningParams,
    config: &EngineConfig,
) -> EngineResult<PARLevels> {
    let (start, end) = params
        .window
        .or_else(|| record_span(&history.records))
        .ok_or_else(|| {
            EngineError::InsufficientData(format!("no usage records for item '{}'", history.item_id))
        })?;

    let profile = analyze(&history.records, start, end, Some(history.item_id.as_str()), config)?;
    let lead_time = resolve_lead_time(params.lead_time_days, history.lead_time_days, config);
    calculate(&profile, params.service_level, lead_time, config)
}

/// Lead time to plan with: the explicit value, then the item's own, then
/// `default_lead_time_days`.
pub fn resolve_lead_time(explicit: Option<i64>, item: Option<u32>, config: &EngineConfig) -> i64 {
    explicit
        .or(item.map(i64::from))
        .unwrap_or_else(|| i64::from(config.default_lead_time_days))
}

/// PAR levels for every item, computed in parallel.
pub fn calculate_all(
    items: &[ItemHistory],
    params: &PlanningParams,
    config: &EngineConfig,
) -> Vec<ItemOutcome<PARLevels>> {
    fan_out(items, |history| plan_item(history, params, config))
}

/// Recommendations for every item, computed in parallel.
pub fn recommend_all(
    items: &[ItemHistory],
    params: &PlanningParams,
    today: NaiveDate,
    config: &EngineConfig,
) -> Vec<ItemOutcome<StockRecommendation>> {
    fan_out(items, |history| {
        let levels = plan_item(history, params, config)?;
        recommend(&levels, history.current_stock, today, config)
    })
}

fn fan_out<T, F>(items: &[ItemHistory], run: F) -> Vec<ItemOutcome<T>>
where
    T: Send,
    F: Fn(&ItemHistory) -> EngineResult<T> + Sync,
{
    let mut outcomes: Vec<ItemOutcome<T>> = items
        .par_iter()
        .map(|history| ItemOutcome {
            item_id: history.item_id.clone(),
            result: run(history),
        })
        .collect();

    outcomes.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    outcomes
}
