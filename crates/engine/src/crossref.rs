use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SabanaError;
use crate::table::{Field, FieldIndex, Record, Table, UNKNOWN_LINE};

// ---------------------------------------------------------------------------
// Criterion + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    /// Shared phone numbers across `linea_a` / `linea_b`.
    #[default]
    Identifier,
    /// Shared rounded (latitude, longitude) pairs.
    Location,
}

impl std::fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Location => write!(f, "location"),
        }
    }
}

/// Rows of the primary table whose identity also appears in the secondary one.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossMatch {
    pub table: Table,
    /// Size of the identity intersection.
    pub shared: usize,
}

/// Coordinates scaled by `10^decimals` and rounded half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub lat: i64,
    pub lon: i64,
}

impl LocationKey {
    /// `None` for the (0, 0) placeholder some carriers write for unknown towers.
    pub fn new(lat: f64, lon: f64, decimals: u32) -> Option<Self> {
        if lat == 0.0 && lon == 0.0 {
            return None;
        }
        let scale = 10f64.powi(decimals as i32);
        Some(Self {
            lat: (lat * scale).round() as i64,
            lon: (lon * scale).round() as i64,
        })
    }

    fn of(record: &Record<'_>, decimals: u32) -> Option<Self> {
        let (lat, lon) = record.coordinates()?;
        Self::new(lat, lon, decimals)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Filter `primary` to the rows whose identity also occurs in `secondary`.
///
/// The result is always a subset of `primary`, in its original order; the
/// secondary table only contributes to membership testing.
pub fn cross_reference(
    primary: &Table,
    secondary: &Table,
    criterion: MatchCriterion,
    decimals: u32,
) -> Result<CrossMatch, SabanaError> {
    let result = match criterion {
        MatchCriterion::Identifier => {
            let mut shared: HashSet<String> = line_identities(primary, "primary")?
                .intersection(&line_identities(secondary, "secondary")?)
                .cloned()
                .collect();
            shared.remove(UNKNOWN_LINE);

            let idx = FieldIndex::resolve(primary);
            let table = primary.filter(|row| {
                let rec = idx.record(row);
                [rec.linea_a, rec.linea_b]
                    .into_iter()
                    .flatten()
                    .any(|n| shared.contains(n))
            });
            CrossMatch { table, shared: shared.len() }
        }
        MatchCriterion::Location => {
            let shared: HashSet<LocationKey> = location_identities(primary, "primary", decimals)?
                .intersection(&location_identities(secondary, "secondary", decimals)?)
                .copied()
                .collect();

            let idx = FieldIndex::resolve(primary);
            let table = primary.filter(|row| {
                LocationKey::of(&idx.record(row), decimals).is_some_and(|k| shared.contains(&k))
            });
            CrossMatch { table, shared: shared.len() }
        }
    };

    log::info!(
        "cross-reference by {criterion}: {} shared, {} of {} rows kept",
        result.shared,
        result.table.len(),
        primary.len(),
    );
    Ok(result)
}

/// Every number appearing in `linea_a` or `linea_b`, sentinel included.
pub fn line_identities(table: &Table, role: &str) -> Result<HashSet<String>, SabanaError> {
    if !table.has_field(Field::LineaA) && !table.has_field(Field::LineaB) {
        return Err(SabanaError::MissingColumn {
            table: role.into(),
            column: format!("{} or {}", Field::LineaA, Field::LineaB),
        });
    }
    Ok(table
        .records()
        .flat_map(|r| [r.linea_a, r.linea_b])
        .flatten()
        .map(str::to_string)
        .collect())
}

/// Rounded coordinate pairs, skipping rows with a missing or (0, 0) position.
pub fn location_identities(
    table: &Table,
    role: &str,
    decimals: u32,
) -> Result<HashSet<LocationKey>, SabanaError> {
    for field in [Field::Latitud, Field::Longitud] {
        if !table.has_field(field) {
            return Err(SabanaError::MissingColumn {
                table: role.into(),
                column: field.name().into(),
            });
        }
    }
    Ok(table
        .records()
        .filter_map(|r| LocationKey::of(&r, decimals))
        .collect())
}
