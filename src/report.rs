use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::display::FormatOptions;
use arrow::util::pretty::pretty_format_batches_with_options;

use crate::analysis::{self, Description};
use crate::config::AnalysisConfig;
use crate::data::loader::load_file;
use crate::data::model::{Column, DType, Table, Value};

const RULE_WIDTH: usize = 50;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the whole analysis over `config.input_path`, writing the report to `out`.
///
/// A missing input file is reported on `out` and is not an error. Any other
/// failure (unreadable table, missing or non-numeric outcome column) stops
/// the run at the stage where it occurs.
pub fn run(config: &AnalysisConfig, out: &mut impl Write) -> Result<()> {
    let path = &config.input_path;
    if !path.exists() {
        log::warn!("input file {} not found, nothing to analyse", path.display());
        writeln!(out, "Error: file {} does not exist!", path.display())?;
        return Ok(());
    }

    let table = load_file(path).with_context(|| format!("loading {}", path.display()))?;

    report_overview(&table, config, out)?;
    report_info(&table, out)?;
    report_missing(&table, out)?;
    report_describe(&table, out)?;
    report_categoricals(&table, config, out)?;
    report_survival(&table, config, out)?;
    report_age(&table, config, out)?;

    writeln!(out, "\nAnalysis complete!")?;
    Ok(())
}

fn section(out: &mut impl Write, title: &str) -> Result<()> {
    writeln!(out, "\n{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{title}")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn report_overview(table: &Table, config: &AnalysisConfig, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: overview");
    log::debug!("columns: {}", table.column_names().collect::<Vec<_>>().join(", "));
    let (rows, cols) = table.shape();
    writeln!(out, "Data loaded successfully!")?;
    writeln!(out, "Shape: ({rows}, {cols})")?;
    writeln!(out, "\nFirst {} rows:", config.head_rows)?;
    writeln!(out, "{}", render_table(&table.head(config.head_rows))?)?;
    Ok(())
}

fn report_info(table: &Table, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: info");
    section(out, "Dataset info:")?;
    write!(out, "{}", render_info(table))?;
    Ok(())
}

fn report_missing(table: &Table, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: missing values");
    section(out, "Missing values:")?;

    let missing: Vec<(String, usize)> = analysis::missing_counts(table)
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect();
    if missing.is_empty() {
        writeln!(out, "No missing values")?;
        return Ok(());
    }

    let (names, counts): (Vec<String>, Vec<usize>) = missing.into_iter().unzip();
    let summary = Table::from_columns(vec![
        ("column".into(), Column::Text(names.into_iter().map(Some).collect())),
        ("missing".into(), counts_column(&counts)),
    ])?;
    writeln!(out, "{}", render_table(&summary)?)?;
    Ok(())
}

fn report_describe(table: &Table, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: describe");
    section(out, "Descriptive statistics (numeric columns):")?;

    let summary = match analysis::describe(table) {
        Description::Numeric(columns) => {
            let mut stat_columns = vec![label_column(&[
                "count", "mean", "std", "min", "25%", "50%", "75%", "max",
            ])];
            for (name, summary) in columns {
                let cells = summary.rows().iter().map(|(_, v)| Some(format!("{v:.6}"))).collect();
                stat_columns.push((name, Column::Text(cells)));
            }
            Table::from_columns(stat_columns)?
        }
        Description::Categorical(columns) => {
            let mut stat_columns = vec![label_column(&["count", "unique", "top", "freq"])];
            for (name, summary) in columns {
                let cells = vec![
                    Some(summary.count.to_string()),
                    Some(summary.unique.to_string()),
                    summary.top.map(|v| v.to_string()),
                    Some(summary.freq.to_string()),
                ];
                stat_columns.push((name, Column::Text(cells)));
            }
            Table::from_columns(stat_columns)?
        }
    };
    writeln!(out, "{}", render_table(&summary)?)?;
    Ok(())
}

fn report_categoricals(table: &Table, config: &AnalysisConfig, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: value counts");
    section(
        out,
        &format!("Categorical distributions ({}):", config.categorical_columns.join(", ")),
    )?;

    for name in &config.categorical_columns {
        let Some(col) = table.column(name) else {
            log::info!("no '{name}' column, skipping its value counts");
            continue;
        };
        let (values, counts): (Vec<Value>, Vec<usize>) =
            analysis::value_counts(col).into_iter().unzip();
        let summary = Table::from_columns(vec![
            (name.clone(), value_column(values)),
            ("count".into(), counts_column(&counts)),
        ])?;
        writeln!(out, "\n{name} value counts:")?;
        writeln!(out, "{}", render_table(&summary)?)?;
    }
    Ok(())
}

fn report_survival(table: &Table, config: &AnalysisConfig, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: survival rates");
    section(out, "Survival rate analysis:")?;

    let target = &config.target_column;
    let rate = analysis::survival_rate(table, target)?;
    writeln!(out, "Overall survival rate: {:.2}%", rate * 100.0)?;

    for by in &config.group_columns {
        if table.column(by).is_none() {
            log::info!("no '{by}' column, skipping survival rate by {by}");
            continue;
        }
        let (keys, means): (Vec<Value>, Vec<f64>) =
            analysis::group_mean(table, by, target)?.into_iter().unzip();
        let summary = Table::from_columns(vec![
            (by.clone(), value_column(keys)),
            (
                target.clone(),
                Column::Text(means.iter().map(|m| Some(format!("{m:.6}"))).collect()),
            ),
        ])?;
        writeln!(out, "\nSurvival rate by {by}:")?;
        writeln!(out, "{}", render_table(&summary)?)?;
    }
    Ok(())
}

fn report_age(table: &Table, config: &AnalysisConfig, out: &mut impl Write) -> Result<()> {
    log::debug!("stage: age vs. survival");
    let Some(cmp) = analysis::age_by_outcome(table, &config.age_column, &config.target_column)?
    else {
        log::info!("no '{}' column, skipping age comparison", config.age_column);
        return Ok(());
    };

    section(out, "Age vs. survival:")?;
    writeln!(out, "Mean age of survivors: {:.2} years", cmp.survived)?;
    writeln!(out, "Mean age of non-survivors: {:.2} years", cmp.not_survived)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn label_column(labels: &[&str]) -> (String, Column) {
    (
        String::new(),
        Column::Text(labels.iter().map(|l| Some(l.to_string())).collect()),
    )
}

fn value_column(values: Vec<Value>) -> Column {
    Column::Text(
        values
            .into_iter()
            .map(|v| (!v.is_null()).then(|| v.to_string()))
            .collect(),
    )
}

fn counts_column(counts: &[usize]) -> Column {
    Column::Integer(counts.iter().map(|&n| Some(n as i64)).collect())
}

/// Render a table as a bordered text grid. Nulls print as `NaN`.
pub fn render_table(table: &Table) -> Result<String> {
    if table.shape().1 == 0 {
        return Ok(format!("Empty table ({} rows)", table.len()));
    }
    let batch = to_record_batch(table)?;
    let options = FormatOptions::default().with_null("NaN");
    let grid = pretty_format_batches_with_options(&[batch], &options)
        .context("formatting table")?;
    Ok(grid.to_string())
}

fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for (name, col) in table.columns() {
        let (data_type, array): (DataType, ArrayRef) = match col {
            Column::Integer(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
            Column::Float(v) => (
                DataType::Float64,
                Arc::new(Float64Array::from(
                    v.iter().map(|f| f.filter(|x| !x.is_nan())).collect::<Vec<_>>(),
                )),
            ),
            Column::Bool(v) => (DataType::Boolean, Arc::new(BooleanArray::from(v.clone()))),
            Column::Text(v) => (
                DataType::Utf8,
                Arc::new(StringArray::from(
                    v.iter().map(Option::as_deref).collect::<Vec<_>>(),
                )),
            ),
        };
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(table.len()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
        .context("building record batch")
}

/// Schema listing: index, column name, non-null count and dtype per column,
/// followed by a dtype tally.
pub fn render_info(table: &Table) -> String {
    let rows = table.len();
    let infos = analysis::info(table);

    let name_width = infos
        .iter()
        .map(|i| i.name.chars().count())
        .chain(std::iter::once("Column".len()))
        .max()
        .unwrap_or(0);
    let counts: Vec<String> = infos.iter().map(|i| format!("{} non-null", i.non_null)).collect();
    let count_width = counts
        .iter()
        .map(String::len)
        .chain(std::iter::once("Non-Null Count".len()))
        .max()
        .unwrap_or(0);

    let mut text = String::new();
    if table.is_empty() {
        text.push_str("RangeIndex: 0 entries\n");
    } else {
        text.push_str(&format!("RangeIndex: {rows} entries, 0 to {}\n", rows - 1));
    }
    text.push_str(&format!("Data columns (total {} columns):\n", infos.len()));
    text.push_str(&format!(
        " {:<3} {:<name_width$}  {:<count_width$}  {}\n",
        "#", "Column", "Non-Null Count", "Dtype"
    ));
    text.push_str(&format!(
        "{:<4} {:<name_width$}  {:<count_width$}  {}\n",
        "---", "------", "--------------", "-----"
    ));
    for (idx, (info, count)) in infos.iter().zip(&counts).enumerate() {
        text.push_str(&format!(
            " {:<3} {:<name_width$}  {:<count_width$}  {}\n",
            idx, info.name, count, info.dtype
        ));
    }

    let mut tally: BTreeMap<DType, usize> = BTreeMap::new();
    for info in &infos {
        *tally.entry(info.dtype).or_default() += 1;
    }
    let tally = tally
        .iter()
        .map(|(dtype, n)| format!("{dtype}({n})"))
        .collect::<Vec<_>>()
        .join(", ");
    text.push_str(&format!("dtypes: {tally}\n"));
    text
}
