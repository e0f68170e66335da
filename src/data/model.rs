use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Used as a `BTreeMap` key for grouping, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

// -- Manual Eq/Ord so we can group and sort by Value --

// Equality follows `Ord`, so `Eq`, `Ord` and `Hash` agree on every float.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Mixed numbers compare by value; ties fall back to the variant.
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(std::cmp::Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(std::cmp::Ordering::Greater),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            // Whole floats keep their decimal point so `3.0` reads as a float key.
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Null => write!(f, "NaN"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// DType – the inferred type category of a column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    Bool,
    Float64,
    Int64,
    Object,
}

impl DType {
    /// Integer and float columns take part in numeric summaries; booleans do not.
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Int64 | DType::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::Float64 => "float64",
            DType::Int64 => "int64",
            DType::Object => "object",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Column – one typed column of the table
// ---------------------------------------------------------------------------

/// A typed column. `None` marks a missing cell; a `NaN` float is missing too.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of cells, nulls included.
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Column::Integer(_) => DType::Int64,
            Column::Float(_) => DType::Float64,
            // A boolean column with gaps can no longer be stored as plain bool.
            Column::Bool(v) if v.iter().any(Option::is_none) => DType::Object,
            Column::Bool(_) => DType::Bool,
            Column::Text(_) => DType::Object,
        }
    }

    /// The cell at `row` as a [`Value`]. Out-of-range rows read as null.
    pub fn get(&self, row: usize) -> Value {
        match self {
            Column::Integer(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Integer),
            Column::Float(v) => v
                .get(row)
                .copied()
                .flatten()
                .filter(|f| !f.is_nan())
                // -0.0 and 0.0 are one value for grouping and counting.
                .map_or(Value::Null, |f| Value::Float(if f == 0.0 { 0.0 } else { f })),
            Column::Bool(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Bool),
            Column::Text(v) => v
                .get(row)
                .cloned()
                .flatten()
                .map_or(Value::Null, Value::String),
        }
    }

    /// Iterate all cells in row order.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |row| self.get(row))
    }

    pub fn null_count(&self) -> usize {
        self.values().filter(Value::is_null).count()
    }

    pub fn non_null_count(&self) -> usize {
        self.len() - self.null_count()
    }

    /// The numeric cell at `row`, or `None` when the cell is null or the
    /// column is not numeric.
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        match self {
            Column::Integer(_) | Column::Float(_) => self.get(row).as_f64(),
            _ => None,
        }
    }

    /// All non-null cells of a numeric column as `f64`, in row order.
    /// Returns `None` when the column is not numeric.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        if !self.dtype().is_numeric() {
            return None;
        }
        Some((0..self.len()).filter_map(|row| self.numeric_at(row)).collect())
    }

    /// Copy of the rows in `range`, clamped to the column length.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Column {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        match self {
            Column::Integer(v) => Column::Integer(v[start..end].to_vec()),
            Column::Float(v) => Column::Float(v[start..end].to_vec()),
            Column::Bool(v) => Column::Bool(v[start..end].to_vec()),
            Column::Text(v) => Column::Text(v[start..end].to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("column '{column}' has dtype {dtype}, expected a numeric column")]
    NotNumeric { column: String, dtype: DType },
    #[error("column '{column}' has {actual} rows but the table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Named columns in their original order, all of the same length.
/// Built once by the loader and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<(String, Column)>,
    rows: usize,
}

impl Table {
    /// Build a table, checking that every column has the same length.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, TableError> {
        let rows = columns.first().map_or(0, |(_, c)| c.len());
        for (name, col) in &columns {
            if col.len() != rows {
                return Err(TableError::LengthMismatch {
                    column: name.clone(),
                    expected: rows,
                    actual: col.len(),
                });
            }
        }
        Ok(Table { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// Look up a column by name; `None` when the table lacks it.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    /// Like [`Table::column`], but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Like [`Table::require`], and the column must also be numeric.
    pub fn require_numeric(&self, name: &str) -> Result<&Column, TableError> {
        let col = self.require(name)?;
        if !col.dtype().is_numeric() {
            return Err(TableError::NotNumeric {
                column: name.to_string(),
                dtype: col.dtype(),
            });
        }
        Ok(col)
    }

    /// The first `n` rows, all columns.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.slice(0..n)))
                .collect(),
            rows: n.min(self.rows),
        }
    }
}
