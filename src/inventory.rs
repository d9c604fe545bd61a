// src/inventory.rs
//! Derived inventory metrics: shelf levels, valuation, expiry and floor usage.

use chrono::NaiveDate;
use serde::Serialize;

use crate::geometry::FLOOR_AREA;
use crate::models::Rack;

pub const DEFAULT_NEAR_EXPIRY_DAYS: i64 = 7;

/// Visual height of an empty rack and the increment per shelf level.
const BASE_STACK_HEIGHT: f64 = 1.0;
const LEVEL_HEIGHT: f64 = 0.8;

// ==================== LEVELS / VALUE ====================

/// Shelf levels needed for `stock` units at `bags_per_level` per level.
pub fn levels_used(stock: u32, bags_per_level: u32) -> u32 {
    stock.div_ceil(bags_per_level.max(1))
}

pub fn total_value(stock: u32, rate: f64) -> f64 {
    f64::from(stock) * rate
}

pub fn stack_height(levels: u32) -> f64 {
    BASE_STACK_HEIGHT + f64::from(levels) * LEVEL_HEIGHT
}

// ==================== EXPIRY ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "daysLeft", rename_all = "snake_case")]
pub enum ExpiryStatus {
    NoExpiry,
    Expired(i64),
    NearExpiry(i64),
    Valid(i64),
}

impl ExpiryStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, ExpiryStatus::Expired(_))
    }

    pub fn is_near_expiry(&self) -> bool {
        matches!(self, ExpiryStatus::NearExpiry(_))
    }
}

/// Whole days from `today` to `expiry`; negative once the date has passed.
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

pub fn expiry_status(expiry: Option<NaiveDate>, today: NaiveDate) -> ExpiryStatus {
    expiry_status_with(expiry, today, DEFAULT_NEAR_EXPIRY_DAYS)
}

pub fn expiry_status_with(expiry: Option<NaiveDate>, today: NaiveDate, near_days: i64) -> ExpiryStatus {
    let Some(expiry) = expiry else {
        return ExpiryStatus::NoExpiry;
    };
    let days = days_to_expiry(expiry, today);
    if days < 0 {
        ExpiryStatus::Expired(days)
    } else if days <= near_days {
        ExpiryStatus::NearExpiry(days)
    } else {
        ExpiryStatus::Valid(days)
    }
}

// ==================== SUMMARIES ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RackSummary {
    #[serde(flatten)]
    pub rack: Rack,
    pub levels_used: u32,
    pub total_value: f64,
    pub footprint_area: f64,
    pub stack_height: f64,
    pub expiry: ExpiryStatus,
}

pub fn rack_summary(rack: &Rack, today: NaiveDate, near_days: i64) -> RackSummary {
    let levels = levels_used(rack.stock, rack.bags_per_level);
    RackSummary {
        rack: rack.clone(),
        levels_used: levels,
        total_value: total_value(rack.stock, rack.rate),
        footprint_area: rack.footprint_area(),
        stack_height: stack_height(levels),
        expiry: expiry_status_with(rack.expiry_date, today, near_days),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStats {
    pub total_racks: usize,
    pub total_stock: u64,
    pub total_levels: u64,
    pub total_footprint_area: f64,
    pub usage_percent: f64,
    pub total_value: f64,
    pub expired_racks: usize,
    pub near_expiry_racks: usize,
}

/// Floor-usage percentage, rounded to one decimal.
pub fn usage_percent_of(total_footprint_area: f64, floor_area: f64) -> f64 {
    if floor_area <= 0.0 {
        return 0.0;
    }
    round_one_decimal(100.0 * total_footprint_area / floor_area)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn warehouse_stats(racks: &[Rack], today: NaiveDate) -> WarehouseStats {
    warehouse_stats_with(racks, today, FLOOR_AREA, DEFAULT_NEAR_EXPIRY_DAYS)
}

pub fn warehouse_stats_with(
    racks: &[Rack],
    today: NaiveDate,
    floor_area: f64,
    near_days: i64,
) -> WarehouseStats {
    let mut stats = racks.iter().fold(WarehouseStats::default(), |mut acc, rack| {
        acc.total_racks += 1;
        acc.total_stock += u64::from(rack.stock);
        acc.total_levels += u64::from(levels_used(rack.stock, rack.bags_per_level));
        acc.total_footprint_area += rack.footprint_area();
        acc.total_value += total_value(rack.stock, rack.rate);
        let expiry = expiry_status_with(rack.expiry_date, today, near_days);
        if expiry.is_expired() {
            acc.expired_racks += 1;
        } else if expiry.is_near_expiry() {
            acc.near_expiry_racks += 1;
        }
        acc
    });
    stats.usage_percent = usage_percent_of(stats.total_footprint_area, floor_area);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn rack(width: f64, depth: f64, stock: u32) -> Rack {
        let mut r = Rack::new(
            format!("r-{}x{}", width, depth),
            "Rack".to_string(),
            Position::on_floor(0.0, 0.0),
            today(),
        );
        r.width = width;
        r.depth = depth;
        r.stock = stock;
        r
    }

    #[test]
    fn test_levels_used_rounds_up() {
        assert_eq!(levels_used(12, 5), 3);
        assert_eq!(levels_used(10, 5), 2);
        assert_eq!(levels_used(0, 5), 0);
        assert_eq!(levels_used(1, 1), 1);
        for stock in 0..50u32 {
            for bags in 1..8u32 {
                let expected = (f64::from(stock) / f64::from(bags)).ceil() as u32;
                assert_eq!(levels_used(stock, bags), expected);
            }
        }
    }

    #[test]
    fn test_total_value() {
        assert_eq!(total_value(4, 2.5), 10.0);
        assert_eq!(total_value(0, 99.0), 0.0);
    }

    #[test]
    fn test_expiry_classification() {
        let t = today();
        assert_eq!(expiry_status(None, t), ExpiryStatus::NoExpiry);
        assert_eq!(expiry_status(Some(t + Duration::days(3)), t), ExpiryStatus::NearExpiry(3));
        assert_eq!(expiry_status(Some(t - Duration::days(1)), t), ExpiryStatus::Expired(-1));
        assert_eq!(expiry_status(Some(t), t), ExpiryStatus::NearExpiry(0));
        assert_eq!(expiry_status(Some(t + Duration::days(7)), t), ExpiryStatus::NearExpiry(7));
        assert_eq!(expiry_status(Some(t + Duration::days(8)), t), ExpiryStatus::Valid(8));
    }

    #[test]
    fn test_usage_percent_for_two_racks() {
        let racks = vec![rack(2.0, 2.0, 0), rack(3.0, 1.0, 0)];
        let stats = warehouse_stats(&racks, today());
        assert_eq!(stats.total_footprint_area, 7.0);
        assert_eq!(stats.usage_percent, 0.2);
    }

    #[test]
    fn test_stats_reduction() {
        let mut a = rack(1.5, 1.0, 12);
        a.rate = 2.0;
        a.expiry_date = Some(today() - Duration::days(2));
        let mut b = rack(1.0, 1.0, 3);
        b.bags_per_level = 2;
        b.expiry_date = Some(today() + Duration::days(5));

        let stats = warehouse_stats(&[a, b], today());
        assert_eq!(stats.total_racks, 2);
        assert_eq!(stats.total_stock, 15);
        assert_eq!(stats.total_levels, 3 + 2);
        assert_eq!(stats.total_value, 24.0);
        assert_eq!(stats.expired_racks, 1);
        assert_eq!(stats.near_expiry_racks, 1);
    }

    #[test]
    fn test_empty_set_yields_zeros() {
        assert_eq!(warehouse_stats(&[], today()), WarehouseStats::default());
    }

    #[test]
    fn test_rack_summary_height() {
        let summary = rack_summary(&rack(1.5, 1.0, 12), today(), DEFAULT_NEAR_EXPIRY_DAYS);
        assert_eq!(summary.levels_used, 3);
        assert!((summary.stack_height - 3.4).abs() < 1e-9);
        assert_eq!(summary.expiry, ExpiryStatus::NoExpiry);
    }
}
