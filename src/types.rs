use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

/// Logical columns of an intervention log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    InterventionType,
    Location,
    Crew,
    Duration,
    Cost,
    Observations,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Date,
        Field::InterventionType,
        Field::Location,
        Field::Crew,
        Field::Duration,
        Field::Cost,
        Field::Observations,
    ];

    /// Canonical column name, used in error messages and table headers.
    pub fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::InterventionType => "intervention type",
            Field::Location => "location",
            Field::Crew => "crew",
            Field::Duration => "duration",
            Field::Cost => "cost",
            Field::Observations => "observations",
        }
    }
}

/// One maintenance event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionRow {
    pub date: NaiveDate,
    pub intervention_type: Option<String>,
    pub location: Option<String>,
    pub crew: Option<String>,
    pub duration: Option<f64>,
    pub cost: Option<f64>,
    pub observations: Option<String>,
    /// Cells of unrecognised source columns, aligned with
    /// `CanonicalTable::extra_columns`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl InterventionRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            intervention_type: None,
            location: None,
            crew: None,
            duration: None,
            cost: None,
            observations: None,
            extra: Vec::new(),
        }
    }

    /// Text rendering of one logical cell, empty when absent.
    pub fn cell(&self, field: Field) -> String {
        match field {
            Field::Date => self.date.format("%Y-%m-%d").to_string(),
            Field::InterventionType => self.intervention_type.clone().unwrap_or_default(),
            Field::Location => self.location.clone().unwrap_or_default(),
            Field::Crew => self.crew.clone().unwrap_or_default(),
            Field::Duration => self.duration.map(|v| v.to_string()).unwrap_or_default(),
            Field::Cost => self.cost.map(|v| v.to_string()).unwrap_or_default(),
            Field::Observations => self.observations.clone().unwrap_or_default(),
        }
    }
}

/// The parsed dataset of one uploaded file.
///
/// `columns` lists the logical columns found in the source, in source order.
/// Rows keep the source order and are not sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalTable {
    pub columns: Vec<Field>,
    pub extra_columns: Vec<String>,
    pub rows: Vec<InterventionRow>,
}

impl CanonicalTable {
    pub fn new(columns: Vec<Field>, rows: Vec<InterventionRow>) -> Self {
        Self {
            columns,
            extra_columns: Vec::new(),
            rows,
        }
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows, or the whole table when it is shorter.
    pub fn head(&self, n: usize) -> &[InterventionRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// `label` is `None` for the rows whose category cell was blank; they keep
/// their own entry so a real category can never absorb them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub cost: f64,
}

/// The four views feeding the dashboard charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub by_type: Vec<CategoryCount>,
    pub daily_counts: Vec<DailyCount>,
    pub by_crew: Vec<CategoryCount>,
    pub daily_costs: Vec<DailyCost>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_interventions: usize,
    pub avg_duration: f64,
    pub total_cost: f64,
}

// Display rows for the terminal presenter. Values arrive already formatted.

#[derive(Debug, Clone, Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct CountRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Interventions")]
    pub count: String,
    #[tabled(rename = "")]
    pub bar: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct ShareRow {
    #[tabled(rename = "Crew")]
    pub crew: String,
    #[tabled(rename = "Interventions")]
    pub count: String,
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct CostRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Total cost")]
    pub cost: String,
    #[tabled(rename = "")]
    pub bar: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn head_is_clamped_to_table_length() {
        let table = CanonicalTable::new(
            vec![Field::Date],
            vec![InterventionRow::new(day(1)), InterventionRow::new(day(2))],
        );
        assert_eq!(table.head(5).len(), 2);
        assert_eq!(table.head(1)[0].date, day(1));
        assert!(CanonicalTable::default().head(5).is_empty());
    }

    #[test]
    fn cell_renders_absent_values_as_empty() {
        let mut row = InterventionRow::new(day(3));
        row.cost = Some(12.5);
        assert_eq!(row.cell(Field::Date), "2024-01-03");
        assert_eq!(row.cell(Field::Cost), "12.5");
        assert_eq!(row.cell(Field::Crew), "");
    }
}
