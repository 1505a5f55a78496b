//! Usage Pattern Analyzer.
//!
//! Reduces a set of usage records over a date range to a [`UsageProfile`]:
//! mean and peak daily usage, variability, trend, seasonality and a
//! confidence level. [`monthly_report`] breaks the same window down by
//! calendar month.
//!
//! Records are never aggregated across items. A record set that spans
//! several items must come with an `item_id` filter.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{
    DateRange, MonthlyReport, MonthlyUsage, SeasonalPattern, Trend, UsageProfile, UsageRange,
    UsageRecord,
};
use crate::stats::{self, DailyUsage, Grouping};

/// Build the usage profile of one item over `[start_date, end_date]`.
///
/// # Arguments
///
/// * `records` - Normalized usage records, in any order
/// * `start_date` / `end_date` - Inclusive analysis window
/// * `item_id` - Restrict the analysis to this item
/// * `config` - Engine constants (trend threshold, grouping, confidence)
///
/// # Errors
///
/// - `InvalidDateRange` if `end_date < start_date`
/// - `WindowTooLong` if the window exceeds `max_window_days`
/// - `InvalidQuantity` if a record in the window has a negative or
///   non-finite quantity
/// - `InsufficientData` if no record falls in the window
/// - `ItemMismatch` if the window holds several items and `item_id` is unset
pub fn analyze(
    records: &[UsageRecord],
    start_date: NaiveDate,
    end_date: NaiveDate,
    item_id: Option<&str>,
    config: &EngineConfig,
) -> EngineResult<UsageProfile> {
    let range = checked_window(start_date, end_date, config)?;
    let (item_id, window) = select_window(records, range, item_id)?;

    let series = stats::daily_series(window.iter().copied(), range);
    let quantities: Vec<f64> = series.iter().map(|d| d.quantity).collect();

    let average_daily_usage = stats::mean(&quantities);
    let std_dev_daily_usage = stats::sample_std_dev(&quantities);
    let peak_usage = quantities.iter().copied().fold(0.0, f64::max);

    let trend = classify_trend(
        stats::linear_slope(&quantities),
        average_daily_usage,
        config.trend_epsilon,
    );

    Ok(UsageProfile {
        item_id,
        average_daily_usage,
        peak_usage,
        std_dev_daily_usage,
        trend,
        seasonality_factor: seasonality_factor(&series, average_daily_usage, config),
        confidence_level: confidence_level(
            average_daily_usage,
            std_dev_daily_usage,
            quantities.len(),
            config.full_confidence_days,
        ),
        date_range: range,
    })
}

/// Month-level breakdown of one item over `[start_date, end_date]`.
///
/// Takes the same window, filter and validation path as [`analyze`], so it
/// fails in the same cases.
pub fn monthly_report(
    records: &[UsageRecord],
    start_date: NaiveDate,
    end_date: NaiveDate,
    item_id: Option<&str>,
    config: &EngineConfig,
) -> EngineResult<MonthlyReport> {
    let range = checked_window(start_date, end_date, config)?;
    let (item_id, window) = select_window(records, range, item_id)?;

    let series = stats::daily_series(window.iter().copied(), range);
    let months = monthly_usage(&series);
    let usage_range = usage_range(&months).ok_or_else(|| {
        EngineError::InsufficientData(format!("no monthly usage for item '{item_id}'"))
    })?;

    Ok(MonthlyReport {
        item_id,
        date_range: range,
        months,
        usage_range,
        seasonality: seasonal_pattern(&series, config.seasonal_strength_threshold),
    })
}

/// Check ordering and length of an analysis window.
pub fn checked_window(
    start: NaiveDate,
    end: NaiveDate,
    config: &EngineConfig,
) -> EngineResult<DateRange> {
    if end < start {
        return Err(EngineError::InvalidDateRange { start, end });
    }

    let days = (end - start).num_days() + 1;
    if days > i64::from(config.max_window_days) {
        return Err(EngineError::WindowTooLong {
            start,
            end,
            days,
            max_days: config.max_window_days,
        });
    }

    Ok(DateRange { start, end })
}

/// Per-month totals and daily spread of a daily series.
pub fn monthly_usage(series: &[DailyUsage]) -> Vec<MonthlyUsage> {
    stats::month_buckets(series)
        .into_iter()
        .map(|((year, month), days)| {
            let total_usage: f64 = days.iter().sum();
            MonthlyUsage {
                year,
                month,
                total_usage,
                average_daily_usage: total_usage / days.len() as f64,
                min_daily_usage: days.iter().copied().fold(f64::INFINITY, f64::min),
                max_daily_usage: days.iter().copied().fold(0.0, f64::max),
                std_dev_daily_usage: stats::sample_std_dev(&days),
            }
        })
        .collect()
}

/// Lowest, highest and mean monthly total; `None` without months.
pub fn usage_range(months: &[MonthlyUsage]) -> Option<UsageRange> {
    if months.is_empty() {
        return None;
    }
    let totals: Vec<f64> = months.iter().map(|m| m.total_usage).collect();

    Some(UsageRange {
        min_monthly: totals.iter().copied().fold(f64::INFINITY, f64::min),
        max_monthly: totals.iter().copied().fold(0.0, f64::max),
        average_monthly: stats::mean(&totals),
        std_dev: stats::sample_std_dev(&totals),
    })
}

/// Peak and trough calendar month of a daily series.
///
/// Months of different years are pooled. `None` when the series covers
/// fewer than two distinct months. Ties go to the earlier month.
pub fn seasonal_pattern(series: &[DailyUsage], threshold: f64) -> Option<SeasonalPattern> {
    let means = stats::month_of_year_means(series);
    if means.len() < 2 {
        return None;
    }

    let (mut peak_month, mut peak) = means[0];
    let (mut trough_month, mut trough) = means[0];
    for &(month, value) in &means[1..] {
        if value > peak {
            (peak_month, peak) = (month, value);
        }
        if value < trough {
            (trough_month, trough) = (month, value);
        }
    }

    let seasonality_strength = if peak + trough > 0.0 {
        (peak - trough) / (peak + trough)
    } else {
        0.0
    };

    Some(SeasonalPattern {
        seasonal_pattern: seasonality_strength > threshold,
        peak_month,
        trough_month,
        seasonality_strength,
    })
}

/// Reject records whose quantity is negative, NaN or infinite.
pub fn validate_record(record: &UsageRecord) -> EngineResult<()> {
    if record.quantity.is_finite() && record.quantity >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidQuantity {
            item_id: record.item_id.clone(),
            date: record.date,
            quantity: record.quantity,
        })
    }
}

/// Earliest and latest record dates, or `None` for an empty set.
pub fn record_span(records: &[UsageRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let start = records.iter().map(|r| r.date).min()?;
    let end = records.iter().map(|r| r.date).max()?;
    Some((start, end))
}

/// Records of the window, validated, plus the item they belong to.
fn select_window<'a>(
    records: &'a [UsageRecord],
    range: DateRange,
    item_id: Option<&str>,
) -> EngineResult<(String, Vec<&'a UsageRecord>)> {
    let window: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| range.contains(r.date))
        .filter(|r| item_id.is_none_or(|id| r.item_id == id))
        .collect();

    for record in &window {
        validate_record(record)?;
    }

    let item_id = resolve_item_id(&window, item_id, range)?;
    Ok((item_id, window))
}

fn resolve_item_id(
    window: &[&UsageRecord],
    filter: Option<&str>,
    range: DateRange,
) -> EngineResult<String> {
    if window.is_empty() {
        let scope = filter.map_or_else(String::new, |id| format!(" for item '{id}'"));
        return Err(EngineError::InsufficientData(format!(
            "no usage records{scope} between {} and {}",
            range.start, range.end
        )));
    }

    if let Some(id) = filter {
        return Ok(id.to_string());
    }

    let items: BTreeSet<&str> = window.iter().map(|r| r.item_id.as_str()).collect();
    if items.len() > 1 {
        let listed: Vec<&str> = items.into_iter().collect();
        return Err(EngineError::ItemMismatch(listed.join(", ")));
    }

    Ok(window[0].item_id.clone())
}

/// Classify a per-day regression slope relative to the mean.
///
/// The dead band is `epsilon * average`, so an all-zero series is stable.
pub fn classify_trend(slope: f64, average: f64, epsilon: f64) -> Trend {
    let threshold = epsilon * average;
    if slope > threshold {
        Trend::Increasing
    } else if slope < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Highest group mean over the overall mean.
///
/// Windows shorter than `monthly_grouping_min_days` are grouped by ISO week,
/// longer ones by calendar month. `None` when the window covers a single
/// group. A window with zero usage has no seasonality (factor 1.0).
fn seasonality_factor(
    series: &[DailyUsage],
    average: f64,
    config: &EngineConfig,
) -> Option<f64> {
    let grouping = if series.len() >= config.monthly_grouping_min_days as usize {
        Grouping::Month
    } else {
        Grouping::Week
    };

    let means = stats::group_means(series, grouping);
    if means.len() < 2 {
        return None;
    }
    if average <= 0.0 {
        return Some(1.0);
    }

    let peak_group = means.into_iter().fold(0.0, f64::max);
    Some(peak_group / average)
}

/// Confidence in a profile built from `n` days.
///
/// `(1 - CV / sqrt(n)) * min(1, n / full_confidence_days)`, clamped to
/// `[0, 1]`. Falls as the coefficient of variation grows and rises with the
/// sample size.
fn confidence_level(average: f64, std_dev: f64, n: usize, full_confidence_days: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;

    let cv = if average > 0.0 { std_dev / average } else { 0.0 };
    let dispersion = (1.0 - cv / n.sqrt()).clamp(0.0, 1.0);

    let sample_size = if full_confidence_days == 0 {
        1.0
    } else {
        (n / f64::from(full_confidence_days)).min(1.0)
    };

    (dispersion * sample_size).clamp(0.0, 1.0)
}
