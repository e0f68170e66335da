use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Analysis settings
// ---------------------------------------------------------------------------

/// What the pipeline reads and which columns it looks at.
/// The binary always runs with [`AnalysisConfig::default`].
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Input table, relative to the working directory.
    pub input_path: PathBuf,

    /// Rows shown in the preview.
    pub head_rows: usize,

    /// Columns whose value counts are reported, if present.
    pub categorical_columns: Vec<String>,

    /// Binary 0/1 outcome column. Mandatory.
    pub target_column: String,

    /// Columns the survival rate is broken down by, if present.
    pub group_columns: Vec<String>,

    /// Numeric column compared between outcomes, if present.
    pub age_column: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("Data").join("clean_titanic.csv"),
            head_rows: 5,
            categorical_columns: vec!["Sex".into(), "Embarked".into(), "Pclass".into()],
            target_column: "Survived".into(),
            group_columns: vec!["Sex".into(), "Pclass".into()],
            age_column: "Age".into(),
        }
    }
}

impl AnalysisConfig {
    /// Default settings reading from `path` instead.
    pub fn with_input(path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: path.into(),
            ..Self::default()
        }
    }
}
