use std::collections::{BTreeMap, HashMap};

use crate::data::model::{Column, DType, Table, TableError, Value};
use crate::stats::{self, Summary};

// ---------------------------------------------------------------------------
// Schema and missing values
// ---------------------------------------------------------------------------

/// One line of the schema report.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: DType,
    pub non_null: usize,
}

pub fn info(table: &Table) -> Vec<ColumnInfo> {
    table
        .columns()
        .map(|(name, col)| ColumnInfo {
            name: name.to_string(),
            dtype: col.dtype(),
            non_null: col.non_null_count(),
        })
        .collect()
}

/// Null count of every column, in column order.
pub fn missing_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .columns()
        .map(|(name, col)| (name.to_string(), col.null_count()))
        .collect()
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

/// Summary of a text-like column: non-null count, distinct values, and the
/// most frequent value with its frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    pub count: usize,
    pub unique: usize,
    pub top: Option<Value>,
    pub freq: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    /// One summary per numeric column, in column order.
    Numeric(Vec<(String, Summary)>),
    /// Used when the table has no numeric column at all.
    Categorical(Vec<(String, CategoricalSummary)>),
}

/// Descriptive statistics over the numeric columns, nulls dropped. A table
/// without numeric columns is described categorically instead.
pub fn describe(table: &Table) -> Description {
    let numeric: Vec<(String, Summary)> = table
        .columns()
        .filter_map(|(name, col)| {
            col.numeric_values()
                .map(|values| (name.to_string(), Summary::from_values(&values)))
        })
        .collect();

    if !numeric.is_empty() || table.shape().1 == 0 {
        return Description::Numeric(numeric);
    }

    Description::Categorical(
        table
            .columns()
            .map(|(name, col)| (name.to_string(), categorical_summary(col)))
            .collect(),
    )
}

fn categorical_summary(col: &Column) -> CategoricalSummary {
    let counts: Vec<(Value, usize)> = value_counts(col)
        .into_iter()
        .filter(|(v, _)| !v.is_null())
        .collect();
    let (top, freq) = counts
        .first()
        .map_or((None, 0), |(v, n)| (Some(v.clone()), *n));
    CategoricalSummary {
        count: col.non_null_count(),
        unique: counts.len(),
        top,
        freq,
    }
}

// ---------------------------------------------------------------------------
// Frequencies and grouping
// ---------------------------------------------------------------------------

/// Frequency of every distinct value, nulls included as their own bucket,
/// most frequent first. Equal counts keep first-appearance order.
pub fn value_counts(col: &Column) -> Vec<(Value, usize)> {
    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for value in col.values() {
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    // Stable sort keeps first-appearance order among ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Mean of `target` for each distinct non-null value of `by`, ascending by key.
/// Rows with a null key are left out; null targets are skipped in each group.
pub fn group_mean(table: &Table, by: &str, target: &str) -> Result<Vec<(Value, f64)>, TableError> {
    let keys = table.require(by)?;
    let target_col = table.require_numeric(target)?;

    let mut groups: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for (row, key) in keys.values().enumerate() {
        if key.is_null() {
            continue;
        }
        let bucket = groups.entry(key).or_default();
        if let Some(v) = target_col.numeric_at(row) {
            bucket.push(v);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, values)| (key, stats::mean(&values)))
        .collect())
}

// ---------------------------------------------------------------------------
// Survival
// ---------------------------------------------------------------------------

/// Mean of the 0/1 `target` column, nulls skipped.
pub fn survival_rate(table: &Table, target: &str) -> Result<f64, TableError> {
    let col = table.require_numeric(target)?;
    let values = col.numeric_values().unwrap_or_default();
    Ok(stats::mean(&values))
}

/// Mean age of each outcome group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeComparison {
    pub survived: f64,
    pub not_survived: f64,
}

/// Mean of `age` among rows with `target == 1` and among rows with
/// `target == 0`, null ages dropped. `None` when the table has no `age` column.
pub fn age_by_outcome(
    table: &Table,
    age: &str,
    target: &str,
) -> Result<Option<AgeComparison>, TableError> {
    if table.column(age).is_none() {
        return Ok(None);
    }
    let ages = table.require_numeric(age)?;
    let outcome = table.require_numeric(target)?;

    let mean_where = |wanted: f64| {
        let values: Vec<f64> = (0..table.len())
            .filter(|&row| outcome.numeric_at(row) == Some(wanted))
            .filter_map(|row| ages.numeric_at(row))
            .collect();
        stats::mean(&values)
    };

    Ok(Some(AgeComparison {
        survived: mean_where(1.0),
        not_survived: mean_where(0.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<(&str, Column)>) -> Table {
        Table::from_columns(columns.into_iter().map(|(n, c)| (n.to_string(), c)).collect())
            .unwrap()
    }

    fn ints(values: &[i64]) -> Column {
        Column::Integer(values.iter().copied().map(Some).collect())
    }

    fn text(values: &[Option<&str>]) -> Column {
        Column::Text(values.iter().map(|v| v.map(str::to_string)).collect())
    }

    #[test]
    fn survival_rate_and_sex_groups() {
        let t = table(vec![
            ("Survived", ints(&[1, 0, 1])),
            ("Sex", text(&[Some("female"), Some("male"), Some("female")])),
        ]);
        let rate = survival_rate(&t, "Survived").unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);

        let groups = group_mean(&t, "Sex", "Survived").unwrap();
        assert_eq!(
            groups,
            vec![
                (Value::String("female".into()), 1.0),
                (Value::String("male".into()), 0.0),
            ]
        );
    }

    #[test]
    fn group_mean_drops_null_keys_and_sorts() {
        let t = table(vec![
            ("Survived", ints(&[1, 0, 1, 1, 0])),
            ("Pclass", Column::Float(vec![Some(3.0), Some(1.0), None, Some(1.0), Some(3.0)])),
        ]);
        let groups = group_mean(&t, "Pclass", "Survived").unwrap();
        assert_eq!(
            groups,
            vec![(Value::Float(1.0), 0.5), (Value::Float(3.0), 0.5)]
        );
    }

    #[test]
    fn missing_target_is_an_error() {
        let t = table(vec![("Sex", text(&[Some("male")]))]);
        assert!(matches!(
            survival_rate(&t, "Survived"),
            Err(TableError::MissingColumn(_))
        ));
        let t = table(vec![("Survived", text(&[Some("yes")]))]);
        assert!(matches!(
            survival_rate(&t, "Survived"),
            Err(TableError::NotNumeric { .. })
        ));
    }

    #[test]
    fn age_means_exclude_nulls() {
        let t = table(vec![
            ("Age", Column::Float(vec![Some(22.0), None, Some(38.0), Some(26.0)])),
            ("Survived", ints(&[0, 1, 1, 0])),
        ]);
        let cmp = age_by_outcome(&t, "Age", "Survived").unwrap().unwrap();
        assert_eq!(cmp.survived, 38.0);
        assert_eq!(cmp.not_survived, 24.0);
    }

    #[test]
    fn age_comparison_skipped_without_age() {
        let t = table(vec![("Survived", ints(&[0, 1]))]);
        assert_eq!(age_by_outcome(&t, "Age", "Survived").unwrap(), None);
    }

    #[test]
    fn age_comparison_with_empty_group_is_nan() {
        let t = table(vec![
            ("Age", Column::Float(vec![Some(30.0), None])),
            ("Survived", ints(&[1, 0])),
        ]);
        let cmp = age_by_outcome(&t, "Age", "Survived").unwrap().unwrap();
        assert_eq!(cmp.survived, 30.0);
        assert!(cmp.not_survived.is_nan());
    }

    #[test]
    fn value_counts_include_nulls_and_sum_to_rows() {
        let pclass = Column::Float(vec![Some(3.0), None, Some(1.0), Some(3.0), None, Some(2.0)]);
        let counts = value_counts(&pclass);
        assert_eq!(
            counts,
            vec![
                (Value::Float(3.0), 2),
                (Value::Null, 2),
                (Value::Float(1.0), 1),
                (Value::Float(2.0), 1),
            ]
        );
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), pclass.len());
    }

    #[test]
    fn signed_zeros_share_a_bucket() {
        let col = Column::Float(vec![Some(0.0), Some(-0.0), Some(1.0)]);
        assert_eq!(
            value_counts(&col),
            vec![(Value::Float(0.0), 2), (Value::Float(1.0), 1)]
        );

        let t = table(vec![
            ("Fare", col),
            ("Survived", ints(&[1, 0, 1])),
        ]);
        assert_eq!(
            group_mean(&t, "Fare", "Survived").unwrap(),
            vec![(Value::Float(0.0), 0.5), (Value::Float(1.0), 1.0)]
        );
    }

    #[test]
    fn missing_counts_per_column() {
        let t = table(vec![
            ("Survived", ints(&[1, 0])),
            ("Embarked", text(&[Some("S"), None])),
        ]);
        assert_eq!(
            missing_counts(&t),
            vec![("Survived".to_string(), 0), ("Embarked".to_string(), 1)]
        );
    }

    #[test]
    fn info_reports_dtypes_and_non_null() {
        let t = table(vec![
            ("Survived", ints(&[1, 0])),
            ("Embarked", text(&[Some("S"), None])),
        ]);
        assert_eq!(
            info(&t),
            vec![
                ColumnInfo { name: "Survived".into(), dtype: DType::Int64, non_null: 2 },
                ColumnInfo { name: "Embarked".into(), dtype: DType::Object, non_null: 1 },
            ]
        );
    }

    #[test]
    fn describe_covers_numeric_columns_only() {
        let t = table(vec![
            ("Survived", ints(&[1, 0, 1, 0])),
            ("Sex", text(&[Some("f"), Some("m"), Some("f"), Some("m")])),
            ("Age", Column::Float(vec![Some(1.0), Some(2.0), None, Some(4.0)])),
        ]);
        let Description::Numeric(summaries) = describe(&t) else {
            panic!("expected a numeric description");
        };
        let names: Vec<&str> = summaries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Survived", "Age"]);
        assert_eq!(summaries[1].1.count, 3);
        assert_eq!(summaries[1].1.q50, 2.0);
    }

    #[test]
    fn describe_falls_back_to_categorical() {
        let t = table(vec![("Sex", text(&[Some("m"), Some("f"), Some("m"), None]))]);
        assert_eq!(
            describe(&t),
            Description::Categorical(vec![(
                "Sex".into(),
                CategoricalSummary {
                    count: 3,
                    unique: 2,
                    top: Some(Value::String("m".into())),
                    freq: 2,
                },
            )])
        );
    }
}
