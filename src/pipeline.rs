//! One upload → one dashboard.
//!
//! `run` threads `bytes -> CanonicalTable -> {metrics, aggregates}` and
//! `DashboardState::from_upload` is the single place where a failure of any
//! stage is turned into a displayable message.

use crate::aggregator::aggregate;
use crate::error::PipelineError;
use crate::loader::{load_with, LoadOptions};
use crate::types::{Aggregates, CanonicalTable, InterventionRow, SummaryMetrics};
use crate::validator::ensure_fields;
use serde::Serialize;
use tracing::{error, info};

/// Everything the presenter needs for one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub file_name: String,
    pub metrics: SummaryMetrics,
    pub aggregates: Aggregates,
    pub table: CanonicalTable,
}

impl Dashboard {
    /// The first `n` rows, for the at-a-glance preview.
    pub fn preview(&self, n: usize) -> &[InterventionRow] {
        self.table.head(n)
    }
}

#[derive(Debug, Clone, Default)]
pub enum DashboardState {
    /// No file supplied yet. Not an error.
    #[default]
    AwaitingInput,
    Ready(Box<Dashboard>),
    Failed(String),
}

impl DashboardState {
    /// Run the full pass for one upload, replacing any earlier state.
    pub fn from_upload(bytes: &[u8], file_name: &str, opts: &LoadOptions) -> Self {
        match run(bytes, file_name, opts) {
            Ok(dashboard) => DashboardState::Ready(Box::new(dashboard)),
            Err(e) => {
                error!(file_name, error = %e, "pipeline failed");
                DashboardState::Failed(e.to_string())
            }
        }
    }
}

pub fn run(bytes: &[u8], file_name: &str, opts: &LoadOptions) -> Result<Dashboard, PipelineError> {
    let table = load_with(bytes, file_name, opts)?;
    let metrics = ensure_fields(&table).metrics;
    let aggregates = aggregate(&table)?;
    info!(
        interventions = metrics.total_interventions,
        days = aggregates.daily_counts.len(),
        types = aggregates.by_type.len(),
        crews = aggregates.by_crew.len(),
        "dashboard ready"
    );
    Ok(Dashboard {
        file_name: file_name.to_string(),
        metrics,
        aggregates,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregationError, LoadError};
    use chrono::NaiveDate;

    const CSV: &str = "\
date,intervention type,location,crew,duration,cost,observations
2024-01-02,nettoyage,PK 3,B,1,50,
2024-01-01,réparation,PK 1,A,2,100,
2024-01-02,réparation,PK 9,A,3,25.5,
";

    #[test]
    fn successful_pass() {
        let dashboard = run(CSV.as_bytes(), "log.csv", &LoadOptions::default()).unwrap();
        assert_eq!(dashboard.file_name, "log.csv");
        assert_eq!(dashboard.metrics.total_interventions, 3);
        assert_eq!(dashboard.metrics.avg_duration, 2.0);
        assert_eq!(dashboard.metrics.total_cost, 175.5);
        assert_eq!(dashboard.aggregates.by_crew[0].label.as_deref(), Some("A"));
        assert_eq!(
            dashboard.aggregates.daily_counts[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(dashboard.preview(2).len(), 2);
        assert_eq!(dashboard.preview(10).len(), 3);
    }

    #[test]
    fn load_errors_abort_the_pass() {
        let csv = "date,intervention type,crew\nnot-a-date,x,A\n";
        assert!(matches!(
            run(csv.as_bytes(), "log.csv", &LoadOptions::default()),
            Err(PipelineError::Load(LoadError::InvalidDate { .. }))
        ));
    }

    #[test]
    fn missing_crew_column_aborts_the_pass() {
        let csv = "date,intervention type\n2024-01-01,x\n";
        assert!(matches!(
            run(csv.as_bytes(), "log.csv", &LoadOptions::default()),
            Err(PipelineError::Aggregation(AggregationError::MissingColumn("crew")))
        ));
    }

    #[test]
    fn state_transitions() {
        assert!(matches!(DashboardState::default(), DashboardState::AwaitingInput));

        let ok = DashboardState::from_upload(CSV.as_bytes(), "log.csv", &LoadOptions::default());
        assert!(matches!(ok, DashboardState::Ready(ref d) if d.metrics.total_interventions == 3));

        let failed = DashboardState::from_upload(b"date\nsoon\n", "log.csv", &LoadOptions::default());
        match failed {
            DashboardState::Failed(msg) => assert_eq!(msg, "row 2: cannot parse 'soon' as a date"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn dashboard_serializes_to_json() {
        let dashboard = run(CSV.as_bytes(), "log.csv", &LoadOptions::default()).unwrap();
        let value = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(value["metrics"]["total_interventions"], 3);
        assert_eq!(value["aggregates"]["daily_costs"][0]["date"], "2024-01-01");
        assert_eq!(value["aggregates"]["daily_costs"][1]["cost"], 75.5);
        assert_eq!(value["table"]["columns"][1], "intervention_type");
    }
}
