use anyhow::{Context, Result};
use clap::Parser;

use prenoms::cli::{self, Cli};
use prenoms::{load_file, Config, GapPolicy, QueryEngine};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if cli.zero_fill {
        config.query.gap_policy = GapPolicy::ZeroFill;
    }

    let dataset = load_file(&cli.data, &config.loader)
        .with_context(|| format!("loading {}", cli.data.display()))?;
    let engine = QueryEngine::new(&dataset, &config.query);

    let output = cli::execute(&cli.command, &engine)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
