//! Fuel metrics engine.
//!
//! Pure functions over in-memory record slices: single-record and aggregate
//! fuel consumption, cost-per-distance and mileage-span statistics. Nothing
//! here touches storage and nothing here fails. Degenerate input (no
//! records, odometer rollback, zero span) degrades to `0` or `None` rather
//! than erroring; these values feed display code that renders a "no data"
//! placeholder.

use log::{debug, warn};

use crate::domain::models::{round_to, FuelRecord, MaintenanceRecord};

/// How many records the "recent consumption" headline averages over.
pub const RECENT_CONSUMPTION_WINDOW: usize = 3;

/// Compute one record's fuel consumption (L/100km, 2 decimals) against the
/// full record set.
///
/// The volume numerator depends on the *previous* record's fill state:
/// - previous fill was to a full tank → this fill-up's volume measures
///   exactly what the interval consumed;
/// - previous fill happened with the low-fuel light on → that fill's volume
///   approximates the interval consumed before it;
/// - neither known → this fill-up's volume, as a best-effort default.
///
/// Returns 0 for the chronologically first record (no baseline) and for
/// non-positive mileage intervals (odometer rollback is a data-quality
/// issue, not an error).
pub fn calculate_single_fuel_consumption(record: &FuelRecord, all_records: &[FuelRecord]) -> f64 {
    let mut vehicle_records: Vec<&FuelRecord> = all_records
        .iter()
        .filter(|r| r.vehicle_id == record.vehicle_id)
        .collect();
    vehicle_records.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

    if vehicle_records.len() <= 1 {
        return 0.0;
    }

    let position = vehicle_records.iter().position(|r| {
        if !record.id.is_empty() {
            r.id == record.id
        } else {
            r.time == record.time && r.total_mileage == record.total_mileage
        }
    });
    let Some(index) = position else {
        return 0.0;
    };
    if index == 0 {
        return 0.0;
    }

    let prev = vehicle_records[index - 1];
    let mileage_diff = record.total_mileage - prev.total_mileage;
    if mileage_diff <= 0.0 {
        warn!(
            "Mileage anomaly for record {}: current={} prev={} diff={}",
            record.id, record.total_mileage, prev.total_mileage, mileage_diff
        );
        return 0.0;
    }

    let consumption = if prev.is_full {
        debug!(
            "Consumption via full-tank rule: volume={} over {}km",
            record.fuel_volume, mileage_diff
        );
        record.fuel_volume / (mileage_diff / 100.0)
    } else if prev.is_light_on {
        debug!(
            "Consumption via low-fuel-light rule: volume={} over {}km",
            prev.fuel_volume, mileage_diff
        );
        prev.fuel_volume / (mileage_diff / 100.0)
    } else {
        // Neither fill state known: same formula as the full-tank rule.
        // Not precise, but there is data.
        record.fuel_volume / (mileage_diff / 100.0)
    };

    round_to(consumption, 2)
}

/// Distance-weighted average consumption (1 decimal), `None` when no record
/// carries a positive consumption value.
///
/// Each record's contribution is weighted by the mileage interval it covers,
/// relative to the whole span, not as a flat per-record mean. Records with
/// zero consumption drop out of the numerator but still anchor the total
/// span. A non-positive span falls back to the unweighted mean.
pub fn average_fuel_consumption(records: &[FuelRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }

    let mut sorted: Vec<&FuelRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

    let valid: Vec<&&FuelRecord> = sorted.iter().filter(|r| r.fuel_consumption > 0.0).collect();
    match valid.len() {
        0 => return None,
        1 => return Some(round_to(valid[0].fuel_consumption, 1)),
        _ => {}
    }

    let first = sorted.first()?;
    let last = sorted.last()?;
    let total_mileage = last.total_mileage - first.total_mileage;

    if total_mileage <= 0.0 {
        let mean =
            valid.iter().map(|r| r.fuel_consumption).sum::<f64>() / valid.len() as f64;
        return Some(round_to(mean, 1));
    }

    let mut weighted_sum = 0.0;
    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.fuel_consumption > 0.0 {
            let mileage_diff = cur.total_mileage - prev.total_mileage;
            if mileage_diff > 0.0 {
                weighted_sum += cur.fuel_consumption * (mileage_diff / total_mileage);
            }
        }
    }

    Some(round_to(weighted_sum, 1))
}

/// Arithmetic mean (1 decimal) of the `n` most recent records' consumption.
pub fn recent_fuel_consumption(records: &[FuelRecord], n: usize) -> Option<f64> {
    if records.is_empty() || n == 0 {
        return None;
    }
    let mut sorted: Vec<&FuelRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));
    let recent: Vec<&&FuelRecord> = sorted.iter().take(n).collect();
    let mean = recent.iter().map(|r| r.fuel_consumption).sum::<f64>() / recent.len() as f64;
    Some(round_to(mean, 1))
}

/// Average fuel cost per 100km (whole yuan), `None` without distance data.
///
/// Accumulates cost and absolute mileage deltas over adjacent pairs in the
/// given order; callers pass records newest-first or oldest-first alike.
pub fn average_cost_per_100km(records: &[FuelRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let mut total_cost = 0.0;
    let mut total_distance = 0.0;
    for pair in records.windows(2) {
        total_cost += pair[0].actual_amount;
        total_distance += (pair[0].total_mileage - pair[1].total_mileage).abs();
    }
    if total_distance == 0.0 {
        return None;
    }
    Some(round_to(total_cost / total_distance * 100.0, 0))
}

/// Mileage span covered by the record set: last odometer reading minus first,
/// after chronological sort. Zero without at least two readings apart.
pub fn total_mileage(records: &[FuelRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<&FuelRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    sorted.last().map(|r| r.total_mileage).unwrap_or(0.0)
        - sorted.first().map(|r| r.total_mileage).unwrap_or(0.0)
}

/// The `n` most recent records, newest first.
pub fn recent_records(records: &[FuelRecord], n: usize) -> Vec<FuelRecord> {
    let mut sorted: Vec<&FuelRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));
    sorted.into_iter().take(n).cloned().collect()
}

/// Sum an arbitrary numeric field across records.
pub fn sum_by<T>(records: &[T], field: impl Fn(&T) -> f64) -> f64 {
    records.iter().map(field).sum()
}

/// Odometer reading at the most recent maintenance event.
pub fn last_maintenance_mileage(records: &[MaintenanceRecord]) -> Option<f64> {
    records
        .iter()
        .max_by(|a, b| a.date.cmp(&b.date))
        .map(|r| r.mileage)
}

/// Combined maintenance + fuel spend, whole yuan.
pub fn total_cost(maintenance: &[MaintenanceRecord], fuel: &[FuelRecord]) -> f64 {
    let cost = sum_by(maintenance, |r| r.cost) + sum_by(fuel, |r| r.actual_amount);
    round_to(cost, 0)
}

/// Recompute the derived consumption field for every record against the full
/// set. Returns how many records changed. Called whenever a vehicle's record
/// set changes order or membership (imports, edits, the one-time recompute
/// migration).
pub fn recalculate_all(records: &mut [FuelRecord]) -> usize {
    // Consumption only reads neighbors' odometer/volume fields, so a
    // pre-update snapshot is a valid baseline for every record.
    let snapshot: Vec<FuelRecord> = records.to_vec();
    let mut updated = 0;
    for record in records.iter_mut() {
        let new_value = calculate_single_fuel_consumption(record, &snapshot);
        if record.fuel_consumption != new_value {
            debug!(
                "Record {} consumption {} -> {}",
                record.id, record.fuel_consumption, new_value
            );
            record.fuel_consumption = new_value;
            updated += 1;
        }
    }
    updated
}
