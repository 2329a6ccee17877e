use serde::{Deserialize, Serialize};

use crate::table::{format_number, Field, Table};
use crate::view::COUNT_COLUMN;

/// One marker for the map collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    /// Label/value lines shown in the marker popup, in display order.
    pub popup: Vec<(String, String)>,
}

/// Which rows a map is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapScope {
    /// The result set of the active view.
    #[default]
    CurrentView,
    /// Every row of the primary table.
    Full,
}

impl MapScope {
    /// Map heading for a view titled `view_title`.
    pub fn title(self, view_title: &str) -> String {
        match self {
            MapScope::CurrentView => format!("Mapa: {view_title}"),
            MapScope::Full => "Mapa: Registros Totales".to_string(),
        }
    }
}

/// Markers for every row that has both coordinates, in row order.
///
/// Popups carry the position, then the ranking count when the table is a
/// tower ranking, otherwise the called number and the call date/time.
pub fn map_points(table: &Table) -> Vec<MapPoint> {
    let count_col = table.column_index(COUNT_COLUMN);
    let mut skipped = 0usize;

    let points: Vec<MapPoint> = table
        .rows()
        .iter()
        .zip(table.records())
        .filter_map(|(row, rec)| {
            let Some((lat, lon)) = rec.coordinates() else {
                skipped += 1;
                return None;
            };
            let mut popup = vec![
                ("Lat".to_string(), format_number(lat)),
                ("Lon".to_string(), format_number(lon)),
            ];
            match count_col {
                Some(c) => popup.push(("Frecuencia".into(), row[c].display())),
                None => {
                    if let Some(n) = rec.linea_b {
                        popup.push(("Número".into(), n.to_string()));
                    }
                    if let Some(f) = rec.fecha {
                        popup.push(("Fecha".into(), f.to_string()));
                    }
                    if let Some(h) = rec.hora {
                        popup.push(("Hora".into(), h.to_string()));
                    }
                }
            }
            Some(MapPoint { lat, lon, popup })
        })
        .collect();

    if skipped > 0 {
        log::debug!("{skipped} row(s) without coordinates left off the map");
    }
    points
}

/// True when the table could produce map points at all.
pub fn has_coordinates(table: &Table) -> bool {
    table.has_field(Field::Latitud) && table.has_field(Field::Longitud)
}
