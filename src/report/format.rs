//! Formatted text summaries.
//!
//! We keep formatting code in one place so:
//! - the estimation code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)
//!
//! Numbers are printed from the rounded tables with the same precision as
//! the CSV export; only thousands separators are added.

use chrono::{DateTime, Local};

use crate::plot::render_bar_chart;
use crate::report::{
    fmt_fixed, DemandTable, RevenueTable, TransitTable, UniqueTable, COUNT_DECIMALS, MONEY_DECIMALS, PCT_DECIMALS,
    SHARE_DECIMALS, SHIP_DECIMALS, USAGE_DECIMALS,
};

const CHART_WIDTH: usize = 40;

/// Stage 1 summary.
pub fn format_unique_summary(table: &UniqueTable, generated: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("Unique Ship Estimates\n");
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!(
        "Anchor: {} ({} transits, {} observed unique ships)\n",
        table.anchor_year,
        table
            .anchor_transits
            .map(|t| group_thousands(&t.to_string()))
            .unwrap_or_else(|| "?".to_string()),
        group_thousands(&fmt_fixed(table.observed_unique, 0)),
    ));
    out.push_str(&format!("Unique ships per transit: {:.6}\n", table.ratio));
    out.push_str(&format!(
        "Band: ±{}% on the repeat factor\n\n",
        fmt_fixed(table.band * 100.0, PCT_DECIMALS)
    ));

    let headers = ["Year", table.transit_column.as_str(), "Unique", "Unique low", "Unique high"];
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.year.to_string(),
                group_thousands(&r.transits.to_string()),
                group_thousands(&r.mid.to_string()),
                group_thousands(&r.low.to_string()),
                group_thousands(&r.high.to_string()),
            ]
        })
        .collect();
    out.push_str(&render_table(&headers, &rows));
    out
}

/// Stage 2 summary.
pub fn format_demand_summary(table: &DemandTable, generated: DateTime<Local>) -> String {
    let ships = |v: f64| group_thousands(&fmt_fixed(v, SHIP_DECIMALS));

    let mut out = String::new();
    out.push_str("Estimated LEO Demand (Unique Vessels)\n");
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Scenario: {} (target year {})\n", table.label, table.target_year));
    out.push_str(&format!(
        "Unique ships input (mid/low/high): {} / {} / {}\n",
        ships(table.input_totals.mid),
        ships(table.input_totals.low),
        ships(table.input_totals.high),
    ));
    out.push_str(&format!("Unique ships allocated: {}\n", ships(table.total.unique)));
    out.push_str(&format!(
        "LEO-unique ships (low–high): {} – {}\n\n",
        ships(table.total.addressable.low),
        ships(table.total.addressable.high),
    ));

    let headers = [
        "Type", "Share", "Unique", "Unique low", "Unique high", "Adoption", "LEO low", "LEO high", "Source",
    ];
    let mut rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.vessel_type.to_string(),
                fmt_fixed(r.share, SHARE_DECIMALS),
                ships(r.unique),
                ships(r.unique_band.low),
                ships(r.unique_band.high),
                format!(
                    "{}%–{}%",
                    fmt_fixed(r.adoption.low * 100.0, PCT_DECIMALS),
                    fmt_fixed(r.adoption.high * 100.0, PCT_DECIMALS)
                ),
                ships(r.addressable.low),
                ships(r.addressable.high),
                r.source.label().to_string(),
            ]
        })
        .collect();
    rows.push(vec![
        "TOTAL".to_string(),
        fmt_fixed(table.total.share, SHARE_DECIMALS),
        ships(table.total.unique),
        ships(table.total.unique_band.low),
        ships(table.total.unique_band.high),
        String::new(),
        ships(table.total.addressable.low),
        ships(table.total.addressable.high),
        String::new(),
    ]);
    out.push_str(&render_table(&headers, &rows));
    out
}

/// Stage 3 summary.
pub fn format_revenue_summary(table: &RevenueTable, generated: DateTime<Local>) -> String {
    let money = |v: f64| format!("${}", group_thousands(&fmt_fixed(v, MONEY_DECIMALS)));
    let ships = |v: f64| group_thousands(&fmt_fixed(v, SHIP_DECIMALS));

    let mut out = String::new();
    out.push_str("Revenue Estimate (Capacity-driven)\n");
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str("Source: LEO-unique ships from the demand estimate\n\n");

    let headers = [
        "Type", "Ships (L–H)", "Plan", "Cap (TB)", "Usage/ship (TB)", "Subs/ship", "Fee/mo", "Avail", "MRR Low",
        "MRR High",
    ];
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.vessel_type.to_string(),
                format!("{}–{}", ships(r.ships.low), ships(r.ships.high)),
                r.plan.clone(),
                r.cap.label(),
                fmt_fixed(r.usage_tb, USAGE_DECIMALS),
                group_thousands(&r.subscriptions.to_string()),
                money(r.fee),
                fmt_fixed(r.availability, USAGE_DECIMALS),
                money(r.mrr.low),
                money(r.mrr.high),
            ]
        })
        .collect();
    out.push_str(&render_table(&headers, &rows));
    out.push('\n');
    out.push_str(&format!(
        "TOTAL ships: {} – {}\n",
        ships(table.total_ships.low),
        ships(table.total_ships.high)
    ));
    out.push_str(&format!("TOTAL MRR: {} – {}\n", money(table.total.low), money(table.total.high)));
    out
}

/// LEO-equipped transit summary with a bar chart of per-type midpoints.
pub fn format_transit_summary(table: &TransitTable, generated: DateTime<Local>) -> String {
    let count = |v: f64| group_thousands(&fmt_fixed(v, SHIP_DECIMALS));

    let mut out = String::new();
    out.push_str("LEO Adoption Projection (Single Year)\n");
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Year: {}\n", table.year));
    out.push_str(&format!("Total transits: {}\n", group_thousands(&fmt_fixed(table.total_transits, COUNT_DECIMALS))));
    let pct = match table.share_pct {
        Some(p) => format!(
            " ({}% – {}%)",
            fmt_fixed(p.low, PCT_DECIMALS),
            fmt_fixed(p.high, PCT_DECIMALS)
        ),
        None => String::new(),
    };
    out.push_str(&format!(
        "Estimated LEO-equipped transits: {} – {}{pct}\n\n",
        count(table.total.low),
        count(table.total.high)
    ));

    let headers = ["Type", "Transits", "Adoption", "LEO low", "LEO high"];
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.vessel_type.to_string(),
                group_thousands(&fmt_fixed(r.count, COUNT_DECIMALS)),
                format!(
                    "{}%–{}%",
                    fmt_fixed(r.adoption.low * 100.0, PCT_DECIMALS),
                    fmt_fixed(r.adoption.high * 100.0, PCT_DECIMALS)
                ),
                count(r.equipped.low),
                count(r.equipped.high),
            ]
        })
        .collect();
    out.push_str(&render_table(&headers, &rows));
    out.push('\n');

    let bars: Vec<(String, f64)> = table
        .rows
        .iter()
        .map(|r| (r.vessel_type.to_string(), r.equipped.midpoint()))
        .collect();
    out.push_str(&render_bar_chart(
        &format!("LEO-equipped transits by vessel type (midpoint), {}", table.year),
        &bars,
        CHART_WIDTH,
    ));
    out
}

/// Column-aligned table: right-justified cells, ` | ` separators, `-+-` rule.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let fmt_row = |cells: Vec<&str>| -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{}{c}", " ".repeat(w - c.chars().count())))
            .collect();
        format!("  {}\n", parts.join(" | "))
    };

    let mut out = fmt_row(headers.to_vec());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", rule.join("-+-")));
    for row in rows {
        out.push_str(&fmt_row(row.iter().map(String::as_str).collect()));
    }
    out
}

/// Insert `,` separators into the integer part of a formatted number.
pub fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::{Band, PlanCap, RevenueRow, VesselType};

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn group_thousands_basic() {
        assert_eq!(group_thousands("341500.00"), "341,500.00");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("-1234567.5"), "-1,234,567.5");
        assert_eq!(group_thousands("0.25"), "0.25");
    }

    #[test]
    fn render_table_aligns_columns() {
        let rows = vec![
            vec!["Container".to_string(), "1".to_string()],
            vec!["Reefer".to_string(), "12345".to_string()],
        ];
        let table = render_table(&["Type", "N"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "       Type |     N");
        assert_eq!(lines[1], "  ----------+------");
        assert_eq!(lines[2], "  Container |     1");
        assert_eq!(lines[3], "     Reefer | 12345");
    }

    #[test]
    fn revenue_summary_shows_table_totals() {
        let table = RevenueTable {
            rows: vec![RevenueRow {
                vessel_type: VesselType::Container,
                ships: Band::new(136.6, 273.2),
                plan: "IMO_UNL".to_string(),
                cap: PlanCap::Unlimited,
                usage_tb: 1.5,
                subscriptions: 1,
                fee: 2500.0,
                availability: 1.0,
                mrr: Band::new(341_500.0, 683_000.0),
            }],
            total_ships: Band::new(136.6, 273.2),
            total: Band::new(341_500.0, 683_000.0),
        };
        let text = format_revenue_summary(&table, fixed_time());
        assert!(text.contains("TOTAL MRR: $341,500.00 – $683,000.00"));
        assert!(text.contains("unlimited"));
        assert!(text.contains("136.60–273.20"));
        assert!(text.contains("Generated: 2025-01-01 12:00:00"));
    }
}
