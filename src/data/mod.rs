/// Data layer: core types, loading, filtering and queries.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse + clean rows → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  Vec<NameRecord>, name / department / year indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  sex / year range / department predicates
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ query + insights │  sum birth counts → result rows
///   └──────────────────┘
/// ```

pub mod filter;
pub mod insights;
pub mod loader;
pub mod model;
pub mod query;
