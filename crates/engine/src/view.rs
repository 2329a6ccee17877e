//! Filter engine - derives one result table per request.
//!
//! Every request is evaluated independently against an immutable table; the
//! "table to render" is the returned value, not state kept anywhere else.
//!
//! Degradation rules:
//! - A missing precondition column returns the input unchanged with
//!   `ViewStatus::Unavailable`
//! - Number search with an empty query and cross-reference without a
//!   second table return the input unchanged with `ViewStatus::AwaitingInput`
//! - Only cross-reference can fail, when a table has none of the columns
//!   the chosen criterion needs

use std::collections::{HashMap, HashSet};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::crossref::{cross_reference, MatchCriterion};
use crate::error::SabanaError;
use crate::profile::{OvernightWindow, Profile};
use crate::table::{Field, Table, Value, UNKNOWN_LINE};

/// Column holding the per-group count in the tower ranking.
pub const COUNT_COLUMN: &str = "repeticiones";

/// Strict format for `hora` cells in the overnight view.
const TIME_FORMAT: &str = "%H:%M:%S";

// =============================================================================
// Requests and outcomes
// =============================================================================

/// Which line column a number search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    LineaA,
    #[default]
    LineaB,
    Either,
}

impl SearchTarget {
    fn fields(self) -> &'static [Field] {
        match self {
            SearchTarget::LineaA => &[Field::LineaA],
            SearchTarget::LineaB => &[Field::LineaB],
            SearchTarget::Either => &[Field::LineaA, Field::LineaB],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ViewRequest<'a> {
    Overview,
    Overnight,
    TowerRanking,
    FrequentContacts,
    NumberSearch { query: &'a str, target: SearchTarget },
    CrossReference { other: Option<&'a Table>, criterion: MatchCriterion },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewStatus {
    Applied,
    /// A precondition column is absent; the table is returned unfiltered.
    Unavailable { missing: Vec<Field> },
    /// The caller must supply more input; the table is returned unfiltered.
    AwaitingInput { hint: String },
    /// Cross-reference finished; `shared` identities were found in both tables.
    Matched { shared: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutcome {
    pub title: String,
    pub table: Table,
    pub status: ViewStatus,
}

impl ViewOutcome {
    fn applied(title: String, table: Table) -> Self {
        Self { title, table, status: ViewStatus::Applied }
    }

    fn unavailable(title: String, table: &Table, missing: Vec<Field>) -> Self {
        log::warn!("{title}: missing column(s) {missing:?}; showing the full table");
        Self {
            title,
            table: table.clone(),
            status: ViewStatus::Unavailable { missing },
        }
    }

    fn awaiting(title: String, table: &Table, hint: &str) -> Self {
        Self {
            title,
            table: table.clone(),
            status: ViewStatus::AwaitingInput { hint: hint.into() },
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

pub fn apply(
    table: &Table,
    request: &ViewRequest<'_>,
    profile: &Profile,
) -> Result<ViewOutcome, SabanaError> {
    let outcome = match *request {
        ViewRequest::Overview => ViewOutcome::applied("Vista General".into(), table.clone()),

        ViewRequest::Overnight => {
            let w = profile.overnight;
            let title = format!(
                "Pernocta ({}-{})",
                w.start.format("%H:%M"),
                w.end.format("%H:%M")
            );
            match overnight(table, &w) {
                Some(t) => ViewOutcome::applied(title, t),
                None => ViewOutcome::unavailable(title, table, vec![Field::Hora]),
            }
        }

        ViewRequest::TowerRanking => {
            let title = "Top Antenas".to_string();
            match tower_ranking(table, profile.ranking.towers) {
                Some(t) => ViewOutcome::applied(title, t),
                None => ViewOutcome::unavailable(title, table, missing(table, &[Field::Latitud, Field::Longitud])),
            }
        }

        ViewRequest::FrequentContacts => {
            let title = "Top Números Frecuentes".to_string();
            match frequent_contacts(table, profile.ranking.contacts) {
                Some(t) => ViewOutcome::applied(title, t),
                None => ViewOutcome::unavailable(title, table, vec![Field::LineaB]),
            }
        }

        ViewRequest::NumberSearch { query, target } => {
            let title = "Búsqueda Específica".to_string();
            if query.is_empty() {
                ViewOutcome::awaiting(title, table, "enter a number to search for")
            } else {
                match search(table, query, target) {
                    Some(t) => ViewOutcome::applied(format!("{title}: {query}"), t),
                    None => ViewOutcome::unavailable(title, table, missing(table, target.fields())),
                }
            }
        }

        ViewRequest::CrossReference { other, criterion } => {
            let title = match criterion {
                MatchCriterion::Identifier => "Cruce por Número",
                MatchCriterion::Location => "Cruce por Ubicación",
            }
            .to_string();
            match other {
                None => ViewOutcome::awaiting(title, table, "load a second file to cross-reference"),
                Some(other) => {
                    let m = cross_reference(table, other, criterion, profile.location.decimals)?;
                    ViewOutcome {
                        title,
                        table: m.table,
                        status: ViewStatus::Matched { shared: m.shared },
                    }
                }
            }
        }
    };

    log::info!("{}: {} of {} rows", outcome.title, outcome.table.len(), table.len());
    Ok(outcome)
}

fn missing(table: &Table, fields: &[Field]) -> Vec<Field> {
    fields.iter().copied().filter(|f| !table.has_field(*f)).collect()
}

// =============================================================================
// Individual views
// =============================================================================

/// Parse a `hora` cell against the strict `HH:MM:SS` format. Surrounding
/// whitespace makes the cell unparseable.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}

/// Rows whose time of day falls inside the window. Unparseable times are
/// dropped. `None` when the table has no `hora` column.
pub fn overnight(table: &Table, window: &OvernightWindow) -> Option<Table> {
    let col = table.field_index(Field::Hora)?;
    Some(table.filter(|row| {
        row[col]
            .as_text()
            .and_then(parse_time)
            .is_some_and(|t| window.contains(t))
    }))
}

/// Count rows per exact (latitud, longitud) pair, most used first.
///
/// Rows missing either coordinate are not grouped. Ties keep first-appearance
/// order. `None` when either coordinate column is absent.
pub fn tower_ranking(table: &Table, top: usize) -> Option<Table> {
    if !table.has_field(Field::Latitud) || !table.has_field(Field::Longitud) {
        return None;
    }

    let mut slots: HashMap<(u64, u64), usize> = HashMap::new();
    let mut groups: Vec<(f64, f64, usize)> = Vec::new();
    for (lat, lon) in table.records().filter_map(|r| r.coordinates()) {
        let slot = *slots.entry((lat.to_bits(), lon.to_bits())).or_insert_with(|| {
            groups.push((lat, lon, 0));
            groups.len() - 1
        });
        groups[slot].2 += 1;
    }

    groups.sort_by(|a, b| b.2.cmp(&a.2));
    groups.truncate(top);

    let columns = vec![
        Field::Latitud.name().to_string(),
        Field::Longitud.name().to_string(),
        COUNT_COLUMN.to_string(),
    ];
    let rows = groups
        .into_iter()
        .map(|(lat, lon, count)| vec![Value::number(lat), Value::number(lon), Value::from(count)])
        .collect();
    Some(Table::from_rows(columns, rows))
}

/// `linea_b` values by call count, most frequent first, sentinel excluded.
/// Ties keep first-appearance order.
pub fn rank_contacts(table: &Table, top: usize) -> Vec<(String, usize)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<(&str, usize)> = Vec::new();
    for number in table.records().filter_map(|r| r.linea_b) {
        if number == UNKNOWN_LINE {
            continue;
        }
        let slot = *slots.entry(number).or_insert_with(|| {
            ranking.push((number, 0));
            ranking.len() - 1
        });
        ranking[slot].1 += 1;
    }

    ranking.sort_by(|a, b| b.1.cmp(&a.1));
    ranking.truncate(top);
    ranking.into_iter().map(|(n, c)| (n.to_string(), c)).collect()
}

/// Every row whose `linea_b` is one of the `top` most frequent numbers.
pub fn frequent_contacts(table: &Table, top: usize) -> Option<Table> {
    let col = table.field_index(Field::LineaB)?;
    let keep: HashSet<String> = rank_contacts(table, top).into_iter().map(|(n, _)| n).collect();
    Some(table.filter(|row| row[col].as_text().is_some_and(|n| keep.contains(n))))
}

/// Case-sensitive substring search over the target line column(s).
/// `None` when none of the target columns exists.
pub fn search(table: &Table, query: &str, target: SearchTarget) -> Option<Table> {
    let cols: Vec<usize> = target
        .fields()
        .iter()
        .filter_map(|f| table.field_index(*f))
        .collect();
    if cols.is_empty() {
        return None;
    }
    Some(table.filter(|row| {
        cols.iter()
            .any(|&c| row[c].as_text().is_some_and(|s| s.contains(query)))
    }))
}
