//! Table model - an ordered set of rows sharing one header.
//!
//! Key invariants:
//! - Every row holds exactly `columns.len()` cells
//! - Row order is insertion order; row-filtering operations preserve it
//! - `Value::Empty` is the only missing-value marker (no NaN is ever stored)

use serde::{Deserialize, Serialize};

/// Sentinel written into line columns when the number is absent or unparseable.
pub const UNKNOWN_LINE: &str = "DESCONOCIDO";

// =============================================================================
// Canonical schema
// =============================================================================

/// The canonical columns every normalized table is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    LineaA,
    LineaB,
    Latitud,
    Longitud,
    Hora,
    Fecha,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::LineaA,
        Field::LineaB,
        Field::Latitud,
        Field::Longitud,
        Field::Hora,
        Field::Fecha,
    ];

    /// Column name used in normalized tables.
    pub fn name(self) -> &'static str {
        match self {
            Field::LineaA => "linea_a",
            Field::LineaB => "linea_b",
            Field::Latitud => "latitud",
            Field::Longitud => "longitud",
            Field::Hora => "hora",
            Field::Fecha => "fecha",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Cell values
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Value {
    /// Build a number cell; non-finite input becomes `Empty`.
    pub fn number(n: f64) -> Value {
        if n.is_finite() {
            // -0.0 and 0.0 must group and compare as the same coordinate
            Value::Number(if n == 0.0 { 0.0 } else { n })
        } else {
            Value::Empty
        }
    }

    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Display form: integral numbers without decimals, text as-is, empty as "".
    pub fn display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
        }
    }
}

/// Integral values below 1e15 print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// `null`, a string, or a number; integral numbers serialize as integers.
impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from a header and rows; rows are padded or truncated to the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn field_index(&self, field: Field) -> Option<usize> {
        self.column_index(field.name())
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.field_index(field).is_some()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Same header, only the rows `keep` accepts, in their original order.
    pub fn filter<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Typed view of each row in order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        let idx = FieldIndex::resolve(self);
        self.rows.iter().map(move |row| idx.record(row))
    }

    pub(crate) fn rename_column(&mut self, col: usize, name: &str) {
        self.columns[col] = name.to_string();
    }

    pub(crate) fn map_column<F>(&mut self, col: usize, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            row[col] = f(&row[col]);
        }
    }
}

// =============================================================================
// Record: typed row view
// =============================================================================

/// One normalized row seen through the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Record<'a> {
    pub linea_a: Option<&'a str>,
    pub linea_b: Option<&'a str>,
    pub latitud: Option<f64>,
    pub longitud: Option<f64>,
    pub fecha: Option<&'a str>,
    pub hora: Option<&'a str>,
}

impl Record<'_> {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitud?, self.longitud?))
    }
}

/// Column positions of the canonical fields, resolved once per table.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FieldIndex {
    pub linea_a: Option<usize>,
    pub linea_b: Option<usize>,
    pub latitud: Option<usize>,
    pub longitud: Option<usize>,
    pub fecha: Option<usize>,
    pub hora: Option<usize>,
}

impl FieldIndex {
    pub fn resolve(table: &Table) -> Self {
        Self {
            linea_a: table.field_index(Field::LineaA),
            linea_b: table.field_index(Field::LineaB),
            latitud: table.field_index(Field::Latitud),
            longitud: table.field_index(Field::Longitud),
            fecha: table.field_index(Field::Fecha),
            hora: table.field_index(Field::Hora),
        }
    }

    pub fn record<'a>(&self, row: &'a [Value]) -> Record<'a> {
        let text = |i: Option<usize>| i.and_then(|i| row[i].as_text());
        let num = |i: Option<usize>| i.and_then(|i| row[i].as_number());
        Record {
            linea_a: text(self.linea_a),
            linea_b: text(self.linea_b),
            latitud: num(self.latitud),
            longitud: num(self.longitud),
            fecha: text(self.fecha),
            hora: text(self.hora),
        }
    }
}
