use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::compute::kernels::cast::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Table, Value};

/// Cell spellings read as missing, besides the empty field.
const NULL_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA", "#N/A N/A", "-1.#IND", "1.#IND", "-1.#QNAN", "1.#QNAN",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one record per line
/// * `.json`    – `[{ "col": value, ... }, ...]` (records orientation)
/// * `.parquet` – flat columns of integers, floats, booleans or strings
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let (rows, cols) = table.shape();
    log::info!("Loaded {rows} rows x {cols} columns from {}", path.display());
    for (name, col) in table.columns() {
        log::debug!("column '{name}': {} ({} nulls)", col.dtype(), col.null_count());
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: comma-delimited, header row with column names, quoted fields
/// allowed. Every record must have as many fields as the header.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = dedup_headers(reader.headers().context("reading CSV headers")?.iter());

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    // Data rows are numbered from 1, not counting the header.
    for (idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", idx + 1))?;
        for (col_idx, col_cells) in cells.iter_mut().enumerate() {
            col_cells.push(record.get(col_idx).and_then(parse_cell));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, col_cells)| (name, infer_column(col_cells)))
        .collect();
    Ok(Table::from_columns(columns)?)
}

/// Repeated header names get a `.1`, `.2`, ... suffix so every column stays addressable.
fn dedup_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|h| {
            let n = seen.entry(h.to_string()).or_insert(0);
            let name = if *n == 0 {
                h.to_string()
            } else {
                format!("{h}.{n}")
            };
            *n += 1;
            name
        })
        .collect()
}

fn parse_cell(s: &str) -> Option<String> {
    if s.is_empty() || NULL_TOKENS.contains(&s) {
        return None;
    }
    Some(s.to_string())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Pick the narrowest column type that holds every non-null cell:
/// integer, then float, then bool, else text. An integer column with gaps is
/// widened to float; a column with no values at all is an all-null float.
fn infer_column(cells: Vec<Option<String>>) -> Column {
    let mut present = cells.iter().flatten().peekable();
    if present.peek().is_none() {
        return Column::Float(vec![None; cells.len()]);
    }
    let has_nulls = cells.iter().any(Option::is_none);

    if cells.iter().flatten().all(|s| s.parse::<i64>().is_ok()) {
        let ints = cells.iter().map(|c| c.as_deref().and_then(|s| s.parse::<i64>().ok()));
        return if has_nulls {
            Column::Float(ints.map(|i| i.map(|i| i as f64)).collect())
        } else {
            Column::Integer(ints.collect())
        };
    }
    if cells.iter().flatten().all(|s| s.parse::<f64>().is_ok()) {
        return Column::Float(
            cells
                .iter()
                .map(|c| c.as_deref().and_then(|s| s.parse::<f64>().ok()))
                .collect(),
        );
    }
    if cells.iter().flatten().all(|s| parse_bool(s).is_some()) {
        return Column::Bool(cells.iter().map(|c| c.as_deref().and_then(parse_bool)).collect());
    }
    Column::Text(cells)
}

/// Same narrowing rules as [`infer_column`], for cells that already carry a type.
fn column_from_values(values: Vec<Value>) -> Column {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return Column::Float(vec![None; values.len()]);
    }
    let has_nulls = present.len() != values.len();

    if !has_nulls && present.iter().all(|v| matches!(v, Value::Integer(_))) {
        return Column::Integer(
            values
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        );
    }
    if present.iter().all(|v| v.as_f64().is_some()) {
        return Column::Float(values.iter().map(Value::as_f64).collect());
    }
    if present.iter().all(|v| matches!(v, Value::Bool(_))) {
        return Column::Bool(
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect(),
        );
    }
    Column::Text(
        values
            .into_iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Survived": 1, "Sex": "female", "Age": 38.0 },
///   { "Survived": 0, "Sex": "male",   "Age": null },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen key order; a key missing from a record is null.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut values: Vec<Vec<Value>> = Vec::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        for (key, val) in obj {
            let col = *index.entry(key.clone()).or_insert_with(|| {
                names.push(key.clone());
                // Earlier rows lacked this key.
                values.push(vec![Value::Null; i]);
                values.len() - 1
            });
            values[col].push(json_to_value(val));
        }
        for col in &mut values {
            if col.len() < i + 1 {
                col.push(Value::Null);
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| (name, column_from_values(vals)))
        .collect();
    Ok(Table::from_columns(columns)?)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Integer columns of any width are read as `i64`, float columns as `f64`,
/// booleans and UTF-8 strings as themselves. Any other Arrow type is kept as
/// text in its display form.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, col_values) in values.iter_mut().enumerate() {
            let col = batch.column(col_idx);
            extract_values(col, col_values)
                .with_context(|| format!("reading column '{}'", names[col_idx]))?;
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| (name, column_from_values(vals)))
        .collect();
    Ok(Table::from_columns(columns)?)
}

// -- Parquet / Arrow helpers --

/// Append every cell of an Arrow column to `out`.
fn extract_values(col: &Arc<dyn Array>, out: &mut Vec<Value>) -> Result<()> {
    match col.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let ints = cast(col.as_ref(), &DataType::Int64).context("casting to Int64")?;
            let arr = ints.as_primitive::<Int64Type>();
            out.extend(arr.iter().map(|v| v.map_or(Value::Null, Value::Integer)));
        }
        DataType::UInt64 | DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let floats = cast(col.as_ref(), &DataType::Float64).context("casting to Float64")?;
            let arr = floats.as_primitive::<Float64Type>();
            out.extend(arr.iter().map(|v| v.map_or(Value::Null, Value::Float)));
        }
        DataType::Boolean => {
            out.extend(col.as_boolean().iter().map(|v| v.map_or(Value::Null, Value::Bool)));
        }
        DataType::Utf8 => {
            out.extend(
                col.as_string::<i32>()
                    .iter()
                    .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string()))),
            );
        }
        DataType::LargeUtf8 => {
            out.extend(
                col.as_string::<i64>()
                    .iter()
                    .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string()))),
            );
        }
        _ => {
            let options = FormatOptions::default();
            let formatter =
                ArrayFormatter::try_new(col.as_ref(), &options).context("formatting column")?;
            for row in 0..col.len() {
                if col.is_null(row) {
                    out.push(Value::Null);
                } else {
                    out.push(Value::String(formatter.value(row).to_string()));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use arrow::array::{BooleanArray, Float32Array, Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    use super::*;
    use crate::data::model::DType;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn csv_infers_column_types() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "p.csv",
            "Survived,Pclass,Sex,Age,Fare,Flag\n\
             0,3,male,22,7.25,True\n\
             1,,female,NA,71.2833,False\n\
             1,1,\"Smith, Jr.\",26,8.05,true\n",
        );
        let table = load_file(&path).unwrap();
        assert_eq!(table.shape(), (3, 6));

        let dtypes: Vec<DType> = table.columns().map(|(_, c)| c.dtype()).collect();
        assert_eq!(
            dtypes,
            vec![
                DType::Int64,
                DType::Float64, // integer with a gap is widened
                DType::Object,
                DType::Float64,
                DType::Float64,
                DType::Bool,
            ]
        );
        assert_eq!(table.column("Pclass").unwrap().get(1), Value::Null);
        assert_eq!(table.column("Age").unwrap().null_count(), 1);
        assert_eq!(
            table.column("Sex").unwrap().get(2),
            Value::String("Smith, Jr.".into())
        );
    }

    #[test]
    fn csv_text_keeps_original_spelling() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "Ticket\n1.50\nA/5 21171\n");
        let table = load_file(&path).unwrap();
        let ticket = table.column("Ticket").unwrap();
        assert_eq!(ticket.get(0), Value::String("1.50".into()));
    }

    #[test]
    fn csv_spreadsheet_na_spellings_are_null() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "na.csv",
            "Age\n22\n#NA\n#N/A N/A\n-1.#IND\n1.#IND\n-1.#QNAN\n1.#QNAN\n",
        );
        let table = load_file(&path).unwrap();
        let age = table.column("Age").unwrap();
        assert_eq!(age.dtype(), DType::Float64);
        assert_eq!(age.null_count(), 6);
        assert_eq!(age.numeric_values(), Some(vec![22.0]));
    }

    #[test]
    fn csv_all_null_column_is_float() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "n.csv", "Cabin,Survived\n,1\nNaN,0\n");
        let table = load_file(&path).unwrap();
        let cabin = table.column("Cabin").unwrap();
        assert_eq!(cabin.dtype(), DType::Float64);
        assert_eq!(cabin.null_count(), 2);
    }

    #[test]
    fn csv_duplicate_headers_are_suffixed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "d.csv", "a,a,b\n1,2,3\n");
        let table = load_file(&path).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["a", "a.1", "b"]);
    }

    #[test]
    fn malformed_csv_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.csv", "a,b\n1,2\n3\n");
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("CSV row 2"));
    }

    #[test]
    fn unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "data.xlsx", "");
        let err = load_file(&path).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file extension: .xlsx");
    }

    #[test]
    fn json_records_fill_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "p.json",
            r#"[
                {"Survived": 1, "Sex": "female", "Age": 38.5},
                {"Survived": 0, "Sex": null},
                {"Survived": 1, "Sex": "female", "Age": 26, "Embarked": "S"}
            ]"#,
        );
        let table = load_file(&path).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Survived", "Sex", "Age", "Embarked"]);
        assert_eq!(table.column("Survived").unwrap().dtype(), DType::Int64);
        assert_eq!(table.column("Age").unwrap().numeric_values(), Some(vec![38.5, 26.0]));
        assert_eq!(table.column("Embarked").unwrap().null_count(), 2);
        assert_eq!(table.column("Sex").unwrap().get(1), Value::Null);
    }

    #[test]
    fn json_must_be_array_of_objects() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "o.json", r#"{"Survived": [1, 0]}"#);
        assert!(load_file(&path).is_err());
        let path = write(&dir, "a.json", "[1, 2]");
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn parquet_flat_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("Survived", DataType::Int32, false),
            Field::new("Sex", DataType::Utf8, true),
            Field::new("Age", DataType::Float32, true),
            Field::new("Alone", DataType::Boolean, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![1, 0])),
                Arc::new(StringArray::from(vec![Some("female"), None])),
                Arc::new(Float32Array::from(vec![Some(38.0), None])),
                Arc::new(BooleanArray::from(vec![true, false])),
            ],
        )
        .unwrap();
        let file = fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.shape(), (2, 4));
        assert_eq!(table.column("Survived").unwrap().get(0), Value::Integer(1));
        assert_eq!(table.column("Sex").unwrap().get(1), Value::Null);
        assert_eq!(table.column("Age").unwrap().get(0), Value::Float(38.0));
        assert_eq!(table.column("Alone").unwrap().dtype(), DType::Bool);
    }
}
