//! Tabular output for fetched history records: console table and CSV file.
//!
//! Purely a formatting collaborator; it consumes [`FetchedDay`] values and
//! never touches the transport.

use anyhow::{Context, Result};
use tokio::fs;

use crate::vedirect::FetchedDay;

/// CSV column order, one row per fetched day.
pub const CSV_HEADER: &str = "Day,EstimatedDate,TotalYield(kWh),MaxPower(W),MaxPvVoltage(V),\
MaxBatteryVoltage(V),MinBatteryVoltage(V),DaySequence,TimeBulk(min),TimeAbsorption(min),\
TimeFloat(min),MaxBatteryCurrent(A),Error0,Error1,Error2,Error3,YieldYesterday(kWh)";

/// Render one fetched day as a CSV row matching [`CSV_HEADER`].
pub fn csv_row(day: &FetchedDay) -> String {
    let r = &day.record;
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        day.day,
        day.date.format("%Y-%m-%d"),
        r.yield_total_kwh,
        r.max_power_w,
        r.max_pv_voltage,
        r.max_battery_voltage,
        r.min_battery_voltage,
        r.day_sequence,
        r.time_bulk_min,
        r.time_absorption_min,
        r.time_float_min,
        r.max_battery_current_a,
        r.error_0,
        r.error_1,
        r.error_2,
        r.error_3,
        r.consumed_kwh,
    )
}

/// Render the whole run as CSV text, header included.
pub fn to_csv(days: &[FetchedDay]) -> String {
    let mut out = String::with_capacity(64 * (days.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for day in days {
        out.push_str(&csv_row(day));
        out.push('\n');
    }
    out
}

/// Write the CSV report to `path`.
pub async fn write_csv(path: &str, days: &[FetchedDay]) -> Result<()> {
    fs::write(path, to_csv(days))
        .await
        .with_context(|| format!("failed to write CSV report to {}", path))?;
    Ok(())
}

/// Console-friendly summary, one line per day.
pub fn render_table(days: &[FetchedDay]) -> String {
    let mut out = String::new();
    out.push_str(
        "Day  Date        Yield(kWh)  MaxPower(W)  MaxPV(V)  BattMax(V)  BattMin(V)  Seq\n",
    );
    for day in days {
        out.push_str(&format!(
            "{:<4} {:<11} {:<11.2} {:<12} {:<9.2} {:<11.2} {:<11.2} {}\n",
            day.day,
            day.date.format("%Y-%m-%d"),
            day.record.yield_total_kwh,
            day.record.max_power_w,
            day.record.max_pv_voltage,
            day.record.max_battery_voltage,
            day.record.min_battery_voltage,
            day.record.day_sequence,
        ));
    }
    out
}
