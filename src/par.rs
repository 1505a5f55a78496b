//! PAR Level Calculator.
//!
//! Turns a [`UsageProfile`] into inventory-control parameters using the
//! stochastic safety-stock model (demand variability during lead time):
//!
//! ```text
//! z             = Φ⁻¹(service_level)
//! safety_stock  = z · σ_daily · √L
//! reorder_point = d · L + safety_stock
//! min_par       = reorder_point
//! max_par       = reorder_point + d · R
//! ```
//!
//! where `d` is the average daily usage (scaled up by the seasonality factor
//! when it exceeds 1), `L` the lead time and `R` the review period. Every
//! quantity is rounded up to `quantity_unit` in that order, so later values
//! build on already-rounded earlier ones.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{PARLevels, UsageProfile};
use crate::stats::{inverse_normal_cdf, round_up_to_unit};

/// Compute PAR levels for a profile at the given service level and lead time.
///
/// # Errors
///
/// - `InvalidServiceLevel` unless `0 < service_level < 1`; values at or past
///   the bounds are rejected, never clamped
/// - `InvalidLeadTime` if `lead_time_days < 1`
///
/// A profile with zero mean and zero variance is valid and yields zeros.
pub fn calculate(
    profile: &UsageProfile,
    service_level: f64,
    lead_time_days: i64,
    config: &EngineConfig,
) -> EngineResult<PARLevels> {
    let z = inverse_normal_cdf(service_level)
        .ok_or(EngineError::InvalidServiceLevel(service_level))?;

    let lead_time = u32::try_from(lead_time_days)
        .ok()
        .filter(|days| *days >= 1)
        .ok_or(EngineError::InvalidLeadTime(lead_time_days))?;

    let unit = config.quantity_unit;
    let lead = f64::from(lead_time);
    let review = f64::from(config.review_period_days);
    let demand = seasonal_demand(profile);

    // Below 50% the quantile is negative; safety stock never goes below zero.
    let safety_stock = round_up_to_unit(z * profile.std_dev_daily_usage * lead.sqrt(), unit);
    let reorder_point = round_up_to_unit(demand * lead + safety_stock, unit);
    let max_par = round_up_to_unit(reorder_point + demand * review, unit);

    Ok(PARLevels {
        item_id: profile.item_id.clone(),
        min_par: reorder_point,
        max_par,
        reorder_point,
        safety_stock,
        service_level,
        lead_time_days: lead_time,
    })
}

/// Average daily usage scaled by the seasonality factor when it exceeds 1.
///
/// Only the demand rate is adjusted; variability stays as measured.
fn seasonal_demand(profile: &UsageProfile) -> f64 {
    match profile.seasonality_factor {
        Some(factor) if factor > 1.0 => profile.average_daily_usage * factor,
        _ => profile.average_daily_usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateRange, Trend};
    use chrono::NaiveDate;

    fn profile(average: f64, std_dev: f64, seasonality: Option<f64>) -> UsageProfile {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        UsageProfile {
            item_id: "SUP001".to_string(),
            average_daily_usage: average,
            peak_usage: average * 2.0,
            std_dev_daily_usage: std_dev,
            trend: Trend::Stable,
            seasonality_factor: seasonality,
            confidence_level: 0.9,
            date_range: DateRange {
                start,
                end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            },
        }
    }

    #[test]
    fn test_reference_case() {
        // sigma chosen so that z(0.95) * sigma * sqrt(3) is just under 25.
        let levels = calculate(&profile(25.5, 8.77, None), 0.95, 3, &EngineConfig::default())
            .unwrap();

        assert_eq!(levels.safety_stock, 25.0);
        // 25.5 * 3 + 25 = 101.5 -> 102
        assert_eq!(levels.reorder_point, 102.0);
        assert_eq!(levels.min_par, 102.0);
        // 102 + 25.5 * 7 = 280.5 -> 281
        assert_eq!(levels.max_par, 281.0);
        assert_eq!(levels.service_level, 0.95);
        assert_eq!(levels.lead_time_days, 3);
    }

    #[test]
    fn test_zero_usage_yields_zeros() {
        let levels = calculate(&profile(0.0, 0.0, None), 0.99, 7, &EngineConfig::default())
            .unwrap();

        assert_eq!(levels.safety_stock, 0.0);
        assert_eq!(levels.reorder_point, 0.0);
        assert_eq!(levels.min_par, 0.0);
        assert_eq!(levels.max_par, 0.0);
    }

    #[test]
    fn test_service_level_bounds_rejected() {
        let p = profile(10.0, 2.0, None);
        let config = EngineConfig::default();

        for level in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = calculate(&p, level, 3, &config).unwrap_err();
            assert!(matches!(err, EngineError::InvalidServiceLevel(_)));
        }
    }

    #[test]
    fn test_lead_time_bounds_rejected() {
        let p = profile(10.0, 2.0, None);
        let config = EngineConfig::default();

        for lead in [0, -3, i64::from(u32::MAX) + 1] {
            let err = calculate(&p, 0.95, lead, &config).unwrap_err();
            assert_eq!(err, EngineError::InvalidLeadTime(lead));
        }
    }

    #[test]
    fn test_low_service_level_clamps_safety_stock() {
        let levels = calculate(&profile(10.0, 4.0, None), 0.2, 5, &EngineConfig::default())
            .unwrap();

        assert_eq!(levels.safety_stock, 0.0);
        assert_eq!(levels.reorder_point, 50.0);
    }

    #[test]
    fn test_seasonality_scales_demand_not_safety_stock() {
        let config = EngineConfig::default();
        let flat = calculate(&profile(10.0, 3.0, None), 0.95, 4, &config).unwrap();
        let seasonal = calculate(&profile(10.0, 3.0, Some(1.5)), 0.95, 4, &config).unwrap();

        assert_eq!(flat.safety_stock, seasonal.safety_stock);
        // 15 * 4 + ss vs 10 * 4 + ss
        assert_eq!(seasonal.reorder_point - flat.reorder_point, 20.0);
        assert!(seasonal.max_par > flat.max_par);
    }

    #[test]
    fn test_seasonality_below_one_ignored() {
        let config = EngineConfig::default();
        let flat = calculate(&profile(10.0, 3.0, None), 0.95, 4, &config).unwrap();
        let damped = calculate(&profile(10.0, 3.0, Some(0.8)), 0.95, 4, &config).unwrap();

        assert_eq!(flat, damped);
    }

    #[test]
    fn test_review_period_is_configurable() {
        let weekly = EngineConfig::default();
        let fortnightly = EngineConfig {
            review_period_days: 14,
            ..EngineConfig::default()
        };
        let p = profile(10.0, 0.0, None);

        let a = calculate(&p, 0.95, 2, &weekly).unwrap();
        let b = calculate(&p, 0.95, 2, &fortnightly).unwrap();

        assert_eq!(a.max_par, 20.0 + 70.0);
        assert_eq!(b.max_par, 20.0 + 140.0);
    }

    #[test]
    fn test_fractional_unit_rounding() {
        let config = EngineConfig {
            quantity_unit: 0.5,
            ..EngineConfig::default()
        };
        let levels = calculate(&profile(1.3, 0.0, None), 0.95, 1, &config).unwrap();

        assert_eq!(levels.reorder_point, 1.5);
        // 1.5 + 1.3 * 7 = 10.6 -> 11.0
        assert_eq!(levels.max_par, 11.0);
    }
}
