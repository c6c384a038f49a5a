use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::data::filter::{Filter, YearRange};
use crate::data::model::Sex;
use crate::data::query::QueryEngine;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Query French first-name birth statistics; results are printed as JSON.
#[derive(Debug, Parser)]
#[command(name = "prenoms", version)]
pub struct Cli {
    /// Source file (.csv, .json or .parquet)
    #[arg(short, long)]
    pub data: PathBuf,

    /// TOML file with loader and query options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Zero-fill years without data in time series
    #[arg(long)]
    pub zero_fill: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Optional restrictions shared by the ranged commands.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// F or M
    #[arg(long)]
    pub sex: Option<Sex>,

    /// First year, inclusive
    #[arg(long)]
    pub from: Option<i32>,

    /// Last year, inclusive
    #[arg(long)]
    pub to: Option<i32>,

    /// Department code, e.g. 75 or 2A
    #[arg(long)]
    pub department: Option<String>,
}

impl FilterArgs {
    /// Build a filter; a single year bound leaves the other side open.
    pub fn to_filter(&self) -> Filter {
        let years = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(YearRange::new(
                from.unwrap_or(i32::MIN),
                to.unwrap_or(i32::MAX),
            )),
        };
        Filter {
            sex: self.sex,
            years,
            department: self.department.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Total births, distinct names, departments, year span and top name
    Overview {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Most given names
    Top {
        /// How many names (defaults to query.default_top_n)
        #[arg(short)]
        n: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Births per year for one name
    Series {
        name: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Births per department for one name
    Departments {
        name: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Female and male births per year
    Compare {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Total births per year
    Yearly {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Most given name in each department for one year
    Leaders {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        sex: Option<Sex>,
    },
    /// Names containing a fragment
    Search { fragment: String },
    /// Totals, sex split, peak year and top departments of one name
    Profile {
        name: String,
        /// How many departments to list
        #[arg(long, default_value_t = 10)]
        departments: usize,
    },
    /// Top names with their yearly series
    Trends {
        #[arg(short)]
        n: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Run one command against the engine and return its result as JSON.
pub fn execute(command: &Command, engine: &QueryEngine<'_>) -> Result<JsonValue> {
    let default_n = engine.config.default_top_n;

    let value = match command {
        Command::Overview { filter } => {
            serde_json::to_value(engine.overview(&filter.to_filter())?)?
        }
        Command::Top { n, filter } => {
            let top = engine.top_names(n.unwrap_or(default_n), &filter.to_filter())?;
            serde_json::to_value(top)?
        }
        Command::Series { name, filter } => {
            serde_json::to_value(engine.time_series(name, &filter.to_filter())?)?
        }
        Command::Departments { name, year } => {
            serde_json::to_value(engine.by_department(name, *year)?)?
        }
        Command::Compare { filter } => {
            serde_json::to_value(engine.compare_by_sex(&filter.to_filter())?)?
        }
        Command::Yearly { filter } => {
            serde_json::to_value(engine.yearly_totals(&filter.to_filter())?)?
        }
        Command::Leaders { year, sex } => {
            serde_json::to_value(engine.department_leaders(*year, *sex))?
        }
        Command::Search { fragment } => serde_json::to_value(engine.search(fragment))?,
        Command::Profile { name, departments } => {
            serde_json::to_value(engine.name_profile(name, *departments))?
        }
        Command::Trends { n, filter } => {
            let trends = engine.trends(n.unwrap_or(default_n), &filter.to_filter())?;
            serde_json::to_value(trends)?
        }
    };
    Ok(value)
}

/// Initialise `env_logger` on stderr; `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
