use crate::error::AggregationError;
use crate::types::{
    Aggregates, CanonicalTable, CategoryCount, DailyCost, DailyCount, Field, InterventionRow,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Count rows per label, keyed in first-seen order. Blank cells are counted
/// under `None` so every count view is a partition of the whole table.
fn count_by<F>(rows: &[InterventionRow], label: F) -> Vec<CategoryCount>
where
    F: Fn(&InterventionRow) -> Option<&str>,
{
    let mut index: HashMap<Option<&str>, usize> = HashMap::new();
    let mut out: Vec<CategoryCount> = Vec::new();
    for r in rows {
        let key = label(r);
        match index.get(&key) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(key, out.len());
                out.push(CategoryCount {
                    label: key.map(str::to_string),
                    count: 1,
                });
            }
        }
    }
    out
}

fn require(table: &CanonicalTable, field: Field) -> Result<(), AggregationError> {
    if table.has_column(field) {
        Ok(())
    } else {
        Err(AggregationError::MissingColumn(field.name()))
    }
}

/// Interventions per type, in first-seen order.
pub fn type_histogram(table: &CanonicalTable) -> Result<Vec<CategoryCount>, AggregationError> {
    require(table, Field::InterventionType)?;
    Ok(count_by(&table.rows, |r| r.intervention_type.as_deref()))
}

/// Interventions per day, ascending by date.
pub fn daily_counts(table: &CanonicalTable) -> Vec<DailyCount> {
    let mut map: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for r in &table.rows {
        *map.entry(r.date).or_default() += 1;
    }
    map.into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Interventions per crew, largest first; ties keep first-seen order.
pub fn crew_distribution(table: &CanonicalTable) -> Result<Vec<CategoryCount>, AggregationError> {
    require(table, Field::Crew)?;
    let mut counts = count_by(&table.rows, |r| r.crew.as_deref());
    // sort_by is stable, so equal counts stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}

/// Summed cost per day, ascending by date. Empty when there is no cost
/// column; blank cost cells add nothing to their day.
pub fn daily_costs(table: &CanonicalTable) -> Vec<DailyCost> {
    if !table.has_column(Field::Cost) {
        return Vec::new();
    }
    let mut map: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in &table.rows {
        *map.entry(r.date).or_default() += r.cost.unwrap_or(0.0);
    }
    map.into_iter()
        .map(|(date, cost)| DailyCost { date, cost })
        .collect()
}

/// All four views of the dashboard.
pub fn aggregate(table: &CanonicalTable) -> Result<Aggregates, AggregationError> {
    Ok(Aggregates {
        by_type: type_histogram(table)?,
        daily_counts: daily_counts(table),
        by_crew: crew_distribution(table)?,
        daily_costs: daily_costs(table),
    })
}
