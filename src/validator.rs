use crate::types::{CanonicalTable, Field, SummaryMetrics};
use crate::util::average;

/// A loaded table together with its headline metrics.
#[derive(Debug, Clone)]
pub struct ValidatedContext<'a> {
    pub table: &'a CanonicalTable,
    pub metrics: SummaryMetrics,
}

/// Compute the headline metrics, defaulting to zero when the optional
/// numeric columns are absent.
///
/// The mean duration skips rows without a duration, so blank cells do not
/// drag it toward zero.
pub fn ensure_fields(table: &CanonicalTable) -> ValidatedContext<'_> {
    let avg_duration = if table.has_column(Field::Duration) {
        average(
            &table
                .rows
                .iter()
                .filter_map(|r| r.duration)
                .collect::<Vec<_>>(),
        )
    } else {
        0.0
    };
    let total_cost = if table.has_column(Field::Cost) {
        table.rows.iter().filter_map(|r| r.cost).sum()
    } else {
        0.0
    };

    ValidatedContext {
        table,
        metrics: SummaryMetrics {
            total_interventions: table.len(),
            avg_duration,
            total_cost,
        },
    }
}
