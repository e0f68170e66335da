/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file, infer column types → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table   │  named typed columns, read-only after load
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
