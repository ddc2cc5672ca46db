use crate::config::DisplayConfig;
use crate::pipeline::{Dashboard, DashboardState};
use crate::types::{
    CanonicalTable, CategoryCount, CostRow, CountRow, InterventionRow, MetricRow, ShareRow,
};
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::fmt::Write;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub const AWAITING_MESSAGE: &str =
    "Please supply a CSV or Excel file to display the dashboard.";
pub const FAILURE_PREFIX: &str = "Error while loading or processing the file";
/// Shown for the entry that counts blank category cells.
pub const BLANK_LABEL: &str = "(blank)";

/// Print the current state: a hint, the failure, or the whole dashboard.
pub fn render(state: &DashboardState, display: &DisplayConfig) {
    match state {
        DashboardState::AwaitingInput => println!("{}\n", AWAITING_MESSAGE),
        DashboardState::Failed(msg) => eprintln!("{}: {}\n", FAILURE_PREFIX, msg),
        DashboardState::Ready(dashboard) => print!("{}", dashboard_text(dashboard, display)),
    }
}

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn dashboard_text(d: &Dashboard, display: &DisplayConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File loaded successfully: {}\n", d.file_name);

    section(&mut out, "Data preview");
    out.push_str(&rows_table(&d.table, d.preview(display.preview_rows)));

    section(&mut out, "Key indicators");
    let m = &d.metrics;
    let metrics = vec![
        MetricRow {
            indicator: "Total interventions".to_string(),
            value: format_int(m.total_interventions),
        },
        MetricRow {
            indicator: "Average duration".to_string(),
            value: format!(
                "{} ({})",
                format_number(m.avg_duration, display.decimals),
                display.duration_unit
            ),
        },
        MetricRow {
            indicator: "Total cost".to_string(),
            value: format!(
                "{} {}",
                format_number(m.total_cost, display.decimals),
                display.currency
            ),
        },
    ];
    out.push_str(&markdown(metrics));

    let a = &d.aggregates;
    section(&mut out, "Interventions by type");
    out.push_str(&markdown(count_rows(
        a.by_type.iter().map(|c| (category_label(c), c.count)),
        display.bar_width,
    )));

    section(&mut out, "Interventions per day");
    out.push_str(&markdown(count_rows(
        a.daily_counts
            .iter()
            .map(|c| (c.date.format("%Y-%m-%d").to_string(), c.count)),
        display.bar_width,
    )));

    section(&mut out, "Interventions by crew");
    out.push_str(&markdown(share_rows(&a.by_crew)));

    section(&mut out, "Total cost per day");
    let max_cost = a.daily_costs.iter().map(|c| c.cost).fold(0.0, f64::max);
    let cost_rows: Vec<CostRow> = a
        .daily_costs
        .iter()
        .map(|c| CostRow {
            date: c.date.format("%Y-%m-%d").to_string(),
            cost: format!("{} {}", format_number(c.cost, 2), display.currency),
            bar: bar(c.cost, max_cost, display.bar_width),
        })
        .collect();
    out.push_str(&markdown(cost_rows));

    if display.show_details {
        section(&mut out, "Detailed data");
        out.push_str(&rows_table(&d.table, &d.table.rows));
    }
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}\n", title);
}

fn markdown<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return "(no rows)\n\n".to_string();
    }
    format!("{}\n\n", Table::new(rows).with(Style::markdown()))
}

/// Source rows as a table with the columns the file actually had.
fn rows_table(table: &CanonicalTable, rows: &[InterventionRow]) -> String {
    if rows.is_empty() {
        return "(no rows)\n\n".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(
        table
            .columns
            .iter()
            .map(|f| f.name().to_string())
            .chain(table.extra_columns.iter().cloned()),
    );
    for r in rows {
        builder.push_record(
            table
                .columns
                .iter()
                .map(|f| r.cell(*f))
                .chain(r.extra.iter().cloned()),
        );
    }
    format!("{}\n\n", builder.build().with(Style::markdown()))
}

fn count_rows<I>(entries: I, width: usize) -> Vec<CountRow>
where
    I: Iterator<Item = (String, usize)> + Clone,
{
    let max = entries.clone().map(|(_, n)| n).max().unwrap_or(0);
    entries
        .map(|(key, n)| CountRow {
            key,
            count: format_int(n),
            bar: bar(n as f64, max as f64, width),
        })
        .collect()
}

fn share_rows(counts: &[CategoryCount]) -> Vec<ShareRow> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    counts
        .iter()
        .map(|c| ShareRow {
            crew: category_label(c),
            count: format_int(c.count),
            share: format!("{}%", format_number(percent(c.count, total), 1)),
        })
        .collect()
}

fn category_label(c: &CategoryCount) -> String {
    c.label.clone().unwrap_or_else(|| BLANK_LABEL.to_string())
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Horizontal bar scaled so that `max` spans `width` cells.
fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadOptions;
    use crate::pipeline::run;

    const CSV: &str = "\
date,intervention type,crew,duration,cost,Weather
2024-01-01,réparation,A,2,100,rain
2024-01-01,nettoyage,B,1,50,
2024-01-03,réparation,A,4,1250.5,sun
";

    fn dashboard() -> Dashboard {
        run(CSV.as_bytes(), "log.csv", &LoadOptions::default()).unwrap()
    }

    #[test]
    fn bars_scale_to_width() {
        assert_eq!(bar(10.0, 10.0, 4), "████");
        assert_eq!(bar(5.0, 10.0, 4), "██");
        assert_eq!(bar(0.1, 10.0, 4), "█");
        assert_eq!(bar(0.0, 10.0, 4), "");
        assert_eq!(bar(3.0, 0.0, 4), "");
    }

    #[test]
    fn shares_are_percentages() {
        let counts = vec![
            CategoryCount { label: Some("A".into()), count: 2 },
            CategoryCount { label: None, count: 1 },
        ];
        let rows = share_rows(&counts);
        assert_eq!(rows[0].share, "66.7%");
        assert_eq!(rows[1].share, "33.3%");
        assert_eq!(rows[1].crew, BLANK_LABEL);
        assert_eq!(percent(1, 0), 0.0);
    }

    #[test]
    fn text_contains_every_section() {
        let text = dashboard_text(&dashboard(), &DisplayConfig::default());
        for title in [
            "Data preview",
            "Key indicators",
            "Interventions by type",
            "Interventions per day",
            "Interventions by crew",
            "Total cost per day",
            "Detailed data",
        ] {
            assert!(text.contains(title), "missing section {title}");
        }
        assert!(text.contains("2.33 (time units)"));
        assert!(text.contains("1,400.50 €"));
        assert!(text.contains("Weather"));
        assert!(text.contains("2024-01-03"));
    }

    #[test]
    fn details_can_be_hidden() {
        let display = DisplayConfig {
            show_details: false,
            ..DisplayConfig::default()
        };
        let text = dashboard_text(&dashboard(), &display);
        assert!(!text.contains("Detailed data"));
    }

    #[test]
    fn empty_table_renders() {
        let d = run(b"date,intervention type,crew,cost\n", "log.csv", &LoadOptions::default())
            .unwrap();
        let text = dashboard_text(&d, &DisplayConfig::default());
        assert!(text.contains("(no rows)"));
        assert!(text.contains("0.00 €"));
    }

    #[test]
    fn json_has_metrics() {
        let json = to_json(&dashboard()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metrics"]["total_cost"], 1400.5);
        assert_eq!(value["file_name"], "log.csv");
    }
}
