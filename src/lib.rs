//! In-memory query layer for French first-name birth statistics
//! (INSEE `dpt2020.csv`: name, sex, year, department, count).
//!
//! Load a [`Dataset`] once with [`load_file`], then ask a [`QueryEngine`] for
//! rankings, time series, per-department counts and sex comparisons. The
//! dataset is never mutated after load, so engines over it can be used from
//! any number of threads.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;

pub use config::{ColumnNames, Config, GapPolicy, LoaderConfig, QueryConfig, SexCodes, SourceFormat};
pub use data::filter::{Filter, YearRange};
pub use data::insights::{DepartmentCount, DepartmentLeader, NameProfile, NameTrend, Overview};
pub use data::loader::{load_csv_reader, load_file};
pub use data::model::{Dataset, NameRecord, Sex};
pub use data::query::{NameCount, QueryEngine, SexSplit, YearCount};
pub use error::{Error, Result};
