//! Record normalizer: maps heterogeneous headers onto the canonical schema
//! and coerces the canonical columns to their expected types.
//!
//! Header matching is trim + lowercase. For each canonical field the alias
//! list is scanned in priority order and the first matching column wins;
//! any further column matching the same field is left untouched and
//! reported as shadowed.

use serde::Serialize;

use crate::profile::Profile;
use crate::table::{format_number, Field, Table, Value, UNKNOWN_LINE};

/// Built-in aliases, highest priority first.
pub const DEFAULT_ALIASES: [(Field, &[&str]); 6] = [
    (Field::LineaA, &["linea_a", "linea a", "origen", "numero_a", "telefono_a"]),
    (Field::LineaB, &["linea_b", "linea b", "destino", "numero_b", "telefono_b"]),
    (Field::Latitud, &["latitud", "lat", "latitude"]),
    (Field::Longitud, &["longitud", "lon", "long", "longitude"]),
    (Field::Hora, &["hora", "time"]),
    (Field::Fecha, &["fecha", "date"]),
];

/// Cell texts treated as "no number" in line columns.
const MISSING_MARKERS: [&str; 4] = ["nan", "none", "null", "nat"];

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub field: Field,
    /// Header as it appeared in the source.
    pub column: String,
}

/// What normalization did to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub mapped: Vec<MappedColumn>,
    /// Columns that matched an alias of a field already claimed by an
    /// earlier column. They pass through under their original header.
    pub shadowed: Vec<MappedColumn>,
    /// Columns matching no alias, passed through unchanged.
    pub unmapped: Vec<String>,
    /// Canonical fields with no source column.
    pub missing: Vec<Field>,
    /// Coordinate cells that held something unparseable and became empty.
    pub coordinates_coerced: usize,
    /// Line cells replaced by the unknown-line sentinel.
    pub lines_unknown: usize,
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

/// Rename alias columns to their canonical names and coerce canonical
/// columns. Absent canonical columns are not an error.
pub fn normalize(mut table: Table, profile: &Profile) -> (Table, NormalizationReport) {
    let keys: Vec<String> = table.columns().iter().map(|c| header_key(c)).collect();
    let mut claimed: Vec<Option<Field>> = vec![None; keys.len()];
    let mut report = NormalizationReport::default();

    for (field, defaults) in DEFAULT_ALIASES {
        let aliases = defaults
            .iter()
            .map(|a| a.to_string())
            .chain(profile.extra_aliases(field).iter().map(|a| header_key(a)));

        let mut hit = None;
        for alias in aliases {
            hit = keys
                .iter()
                .enumerate()
                .position(|(i, k)| claimed[i].is_none() && *k == alias);
            if hit.is_some() {
                break;
            }
        }

        match hit {
            Some(col) => {
                claimed[col] = Some(field);
                report.mapped.push(MappedColumn {
                    field,
                    column: table.columns()[col].clone(),
                });
            }
            None => report.missing.push(field),
        }
    }

    for (col, key) in keys.iter().enumerate() {
        if claimed[col].is_some() {
            continue;
        }
        let original = table.columns()[col].clone();
        match alias_owner(key, profile) {
            Some(field) => {
                log::warn!(
                    "column '{original}' also matches '{field}' but '{field}' is already mapped; left unchanged"
                );
                report.shadowed.push(MappedColumn { field, column: original });
            }
            None => {
                log::debug!("column '{original}' has no canonical mapping; passed through");
                report.unmapped.push(original);
            }
        }
    }

    for (col, field) in claimed.iter().enumerate() {
        let Some(field) = *field else { continue };
        table.rename_column(col, field.name());
        match field {
            Field::LineaA | Field::LineaB => table.map_column(col, |v| {
                coerce_line(v).unwrap_or_else(|| {
                    report.lines_unknown += 1;
                    Value::text(UNKNOWN_LINE)
                })
            }),
            Field::Latitud | Field::Longitud => table.map_column(col, |v| match parse_coordinate(v) {
                Some(n) => Value::number(n),
                None => {
                    if !v.is_empty() {
                        report.coordinates_coerced += 1;
                    }
                    Value::Empty
                }
            }),
            Field::Hora | Field::Fecha => table.map_column(col, coerce_text),
        }
    }

    log::info!(
        "normalized {} rows: {} mapped, {} shadowed, {} passthrough, {} missing",
        table.len(),
        report.mapped.len(),
        report.shadowed.len(),
        report.unmapped.len(),
        report.missing.len(),
    );

    (table, report)
}

fn header_key(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Which canonical field lists `key` among its aliases, if any.
fn alias_owner(key: &str, profile: &Profile) -> Option<Field> {
    DEFAULT_ALIASES.iter().find_map(|(field, defaults)| {
        let hit = defaults.iter().any(|a| *a == key)
            || profile.extra_aliases(*field).iter().any(|a| header_key(a) == key);
        hit.then_some(*field)
    })
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Clean a phone-number cell. `None` means absent or unparseable.
pub fn coerce_line(v: &Value) -> Option<Value> {
    let s = match v {
        Value::Empty => return None,
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.trim().to_string(),
    };
    if s.is_empty() || MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return None;
    }
    Some(Value::Text(strip_float_suffix(&s).to_string()))
}

/// Drop a trailing ".0" left by a spreadsheet that stored the number as a float.
fn strip_float_suffix(s: &str) -> &str {
    match s.strip_suffix(".0") {
        Some(head) => {
            let digits = head.strip_prefix('+').unwrap_or(head);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                head
            } else {
                s
            }
        }
        None => s,
    }
}

/// Parse a coordinate cell. Accepts a decimal comma when no '.' is present.
pub fn parse_coordinate(v: &Value) -> Option<f64> {
    match v {
        Value::Empty => None,
        Value::Number(n) => n.is_finite().then_some(*n),
        Value::Text(s) => {
            let s = s.trim();
            let parsed = if !s.contains('.') && s.matches(',').count() == 1 {
                s.replacen(',', ".", 1).parse::<f64>()
            } else {
                s.parse::<f64>()
            };
            parsed.ok().filter(|n| n.is_finite())
        }
    }
}

fn coerce_text(v: &Value) -> Value {
    match v {
        Value::Number(n) => Value::Text(format_number(*n)),
        other => other.clone(),
    }
}
