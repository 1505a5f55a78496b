//! Recommendation Engine.
//!
//! Classifies current stock against [`PARLevels`] and produces a
//! [`StockRecommendation`]. Bands are checked in order, first match wins:
//!
//! | Current stock                    | Urgency  | Order                    |
//! |----------------------------------|----------|--------------------------|
//! | `<= safety_stock`                | high     | `max_par - current`      |
//! | `<= reorder_point`               | medium   | `max_par - current`      |
//! | `< max_par`                      | low      | none (monitor)           |
//! | `>= max_par`                     | low      | none (adequate)          |
//!
//! High-urgency items are reviewed again the next day; everything else on the
//! regular review cycle. Independently of urgency, each recommendation carries
//! a [`StockStatus`] against the `[min_par, max_par]` band.

use chrono::{Days, NaiveDate};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{PARLevels, RecommendedAction, StockRecommendation, StockStatus, Urgency};
use crate::stats::round_up_to_unit;

/// Recommend an action for `current_stock` against `levels`.
///
/// `today` anchors `next_review_date`; the caller supplies it so the result
/// depends on inputs only.
///
/// # Errors
///
/// `InvalidStock` if `current_stock` is negative or not finite.
pub fn recommend(
    levels: &PARLevels,
    current_stock: f64,
    today: NaiveDate,
    config: &EngineConfig,
) -> EngineResult<StockRecommendation> {
    if !(current_stock.is_finite() && current_stock >= 0.0) {
        return Err(EngineError::InvalidStock(current_stock));
    }

    let (urgency, action) = classify(levels, current_stock);

    let recommended_order = match action {
        RecommendedAction::Reorder => {
            round_up_to_unit(levels.max_par - current_stock, config.quantity_unit)
        }
        RecommendedAction::Monitor | RecommendedAction::NoAction => 0.0,
    };

    let review_in = match urgency {
        Urgency::High => 1,
        Urgency::Medium | Urgency::Low => u64::from(config.review_period_days),
    };
    let next_review_date = today
        .checked_add_days(Days::new(review_in))
        .unwrap_or(NaiveDate::MAX);

    Ok(StockRecommendation {
        item_id: levels.item_id.clone(),
        current_stock,
        recommended_order,
        recommended_action: action,
        urgency,
        status: stock_status(levels, current_stock),
        next_review_date,
        details: describe(levels, current_stock, urgency, recommended_order),
    })
}

/// Urgency band and coarse action for a stock level.
pub fn classify(levels: &PARLevels, current_stock: f64) -> (Urgency, RecommendedAction) {
    if current_stock <= levels.safety_stock {
        (Urgency::High, RecommendedAction::Reorder)
    } else if current_stock <= levels.reorder_point {
        (Urgency::Medium, RecommendedAction::Reorder)
    } else if current_stock < levels.max_par {
        (Urgency::Low, RecommendedAction::Monitor)
    } else {
        (Urgency::Low, RecommendedAction::NoAction)
    }
}

/// Position of the stock level relative to `[min_par, max_par]`.
pub fn stock_status(levels: &PARLevels, current_stock: f64) -> StockStatus {
    if current_stock < levels.min_par {
        StockStatus::BelowMin
    } else if current_stock > levels.max_par {
        StockStatus::AboveMax
    } else {
        StockStatus::Optimal
    }
}

fn describe(levels: &PARLevels, stock: f64, urgency: Urgency, order: f64) -> String {
    match urgency {
        Urgency::High => format!(
            "URGENT: Current stock ({stock}) is at or below safety stock ({}). \
             Place order for {order} units to reach maximum PAR ({}).",
            levels.safety_stock, levels.max_par
        ),
        Urgency::Medium => format!(
            "Current stock ({stock}) is at or below reorder point ({}). \
             Place order for {order} units to reach maximum PAR ({}).",
            levels.reorder_point, levels.max_par
        ),
        Urgency::Low if stock < levels.max_par => format!(
            "Current stock ({stock}) is above reorder point ({}) and below maximum PAR ({}). \
             No order needed; monitor usage.",
            levels.reorder_point, levels.max_par
        ),
        Urgency::Low if stock > levels.max_par => format!(
            "Stock is adequate: current stock ({stock}) is above maximum PAR ({}). \
             Consider reducing order quantities.",
            levels.max_par
        ),
        Urgency::Low => format!(
            "Stock is adequate: current stock ({stock}) is at maximum PAR ({}). \
             No action needed.",
            levels.max_par
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> PARLevels {
        PARLevels {
            item_id: "SUP001".to_string(),
            min_par: 75.0,
            max_par: 150.0,
            reorder_point: 75.0,
            safety_stock: 25.0,
            service_level: 0.95,
            lead_time_days: 3,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn run(stock: f64) -> StockRecommendation {
        recommend(&levels(), stock, today(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_medium_urgency_reference_scenario() {
        let rec = run(60.0);

        assert_eq!(rec.urgency, Urgency::Medium);
        assert_eq!(rec.recommended_order, 90.0);
        assert_eq!(rec.recommended_action, RecommendedAction::Reorder);
        assert_eq!(rec.next_review_date, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert!(rec.details.contains("reorder point"));
    }

    #[test]
    fn test_high_urgency_reviews_tomorrow() {
        let rec = run(25.0);

        assert_eq!(rec.urgency, Urgency::High);
        assert_eq!(rec.recommended_order, 125.0);
        assert_eq!(rec.next_review_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert!(rec.details.starts_with("URGENT"));
    }

    #[test]
    fn test_boundaries_fall_into_lower_band() {
        assert_eq!(run(75.0).urgency, Urgency::Medium);
        assert_eq!(run(75.5).urgency, Urgency::Low);
        assert_eq!(run(0.0).urgency, Urgency::High);
    }

    #[test]
    fn test_monitor_band() {
        let rec = run(100.0);

        assert_eq!(rec.urgency, Urgency::Low);
        assert_eq!(rec.recommended_order, 0.0);
        assert_eq!(rec.recommended_action, RecommendedAction::Monitor);
        assert!(rec.details.contains("monitor"));
    }

    #[test]
    fn test_adequate_stock() {
        for stock in [150.0, 400.0] {
            let rec = run(stock);
            assert_eq!(rec.urgency, Urgency::Low);
            assert_eq!(rec.recommended_order, 0.0);
            assert_eq!(rec.recommended_action, RecommendedAction::NoAction);
            assert!(rec.details.contains("adequate"));
        }
        assert!(run(400.0).details.contains("reducing"));
    }

    #[test]
    fn test_fractional_stock_orders_whole_units() {
        let rec = run(60.4);
        // 150 - 60.4 = 89.6 -> 90
        assert_eq!(rec.recommended_order, 90.0);
    }

    #[test]
    fn test_stock_status_band() {
        assert_eq!(run(60.0).status, StockStatus::BelowMin);
        assert_eq!(run(75.0).status, StockStatus::Optimal);
        assert_eq!(run(150.0).status, StockStatus::Optimal);
        assert_eq!(run(150.5).status, StockStatus::AboveMax);
    }

    #[test]
    fn test_stock_status_differs_from_urgency() {
        let levels = PARLevels {
            min_par: 50.0,
            ..levels()
        };

        // Above min_par yet still at the reorder point.
        let rec = recommend(&levels, 60.0, today(), &EngineConfig::default()).unwrap();
        assert_eq!(rec.urgency, Urgency::Medium);
        assert_eq!(rec.status, StockStatus::Optimal);
    }

    #[test]
    fn test_invalid_stock_rejected() {
        for stock in [-1.0, f64::NAN, f64::INFINITY] {
            let err = recommend(&levels(), stock, today(), &EngineConfig::default()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidStock(_)));
        }
    }

    #[test]
    fn test_review_period_follows_config() {
        let config = EngineConfig {
            review_period_days: 14,
            ..EngineConfig::default()
        };
        let rec = recommend(&levels(), 100.0, today(), &config).unwrap();
        assert_eq!(rec.next_review_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }
}
