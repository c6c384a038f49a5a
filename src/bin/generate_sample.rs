use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use log::info;
use parquet::arrow::ArrowWriter;

use prenoms::Sex;

/// Write a synthetic dataset in the INSEE `dpt2020` layout
/// (`sexe;preusuel;annais;dpt;nombre`) as CSV or Parquet.
#[derive(Debug, Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file; the extension (.csv or .parquet) picks the format
    #[arg(short, long, default_value = "sample_names.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1950)]
    from: i32,

    #[arg(long, default_value_t = 2020)]
    to: i32,
}

/// One generated row, before serialisation.
struct Row {
    sex: Sex,
    name: String,
    year: String,
    department: String,
    count: i64,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Multiplicative noise in `[1 - spread, 1 + spread)`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + spread * (2.0 * self.next_f64() - 1.0)
    }
}

// (name, sex, peak year, width in years, births per year at peak nationally)
const NAMES: &[(&str, Sex, f64, f64, f64)] = &[
    ("MARIE", Sex::F, 1950.0, 25.0, 20000.0),
    ("NATHALIE", Sex::F, 1966.0, 7.0, 30000.0),
    ("CÉLINE", Sex::F, 1980.0, 6.0, 18000.0),
    ("LAURA", Sex::F, 1990.0, 6.0, 12000.0),
    ("EMMA", Sex::F, 2005.0, 7.0, 9000.0),
    ("JADE", Sex::F, 2014.0, 6.0, 7000.0),
    ("CAMILLE", Sex::F, 1995.0, 10.0, 9000.0),
    ("JEAN", Sex::M, 1948.0, 15.0, 25000.0),
    ("PHILIPPE", Sex::M, 1960.0, 9.0, 22000.0),
    ("NICOLAS", Sex::M, 1980.0, 8.0, 25000.0),
    ("THOMAS", Sex::M, 1990.0, 8.0, 16000.0),
    ("LUCAS", Sex::M, 2004.0, 6.0, 10000.0),
    ("GABRIEL", Sex::M, 2016.0, 8.0, 6000.0),
    ("CAMILLE", Sex::M, 1975.0, 10.0, 1500.0),
];

// (department code, share of national births)
const DEPARTMENTS: &[(&str, f64)] = &[
    ("75", 0.050),
    ("13", 0.035),
    ("59", 0.045),
    ("69", 0.030),
    ("33", 0.022),
    ("31", 0.020),
    ("44", 0.020),
    ("67", 0.018),
    ("06", 0.015),
    ("35", 0.016),
    ("2A", 0.002),
    ("2B", 0.002),
    ("974", 0.013),
];

fn generate(args: &Args) -> Vec<Row> {
    let mut rng = SimpleRng::new(args.seed);
    let mut rows = Vec::new();

    for &(name, sex, peak, width, amplitude) in NAMES {
        let mut unknown_year_total = 0;
        for year in args.from..=args.to {
            let national = gaussian(f64::from(year), peak, width, amplitude);
            for &(dept, share) in DEPARTMENTS {
                // INSEE omits rows below the publication threshold.
                let count = (national * share * rng.jitter(0.2)).round() as i64;
                if count < 3 {
                    continue;
                }
                rows.push(Row {
                    sex,
                    name: name.to_string(),
                    year: year.to_string(),
                    department: dept.to_string(),
                    count,
                });
            }
            unknown_year_total += (national * 0.001).round() as i64;
        }
        if unknown_year_total > 0 {
            rows.push(Row {
                sex,
                name: name.to_string(),
                year: "XXXX".to_string(),
                department: "XX".to_string(),
                count: unknown_year_total,
            });
        }
    }

    for year in args.from..=args.to {
        for sex in [Sex::F, Sex::M] {
            rows.push(Row {
                sex,
                name: "_PRENOMS_RARES".to_string(),
                year: year.to_string(),
                department: "75".to_string(),
                count: 400 + (rng.next_f64() * 200.0) as i64,
            });
        }
    }
    rows
}

fn sex_code(sex: Sex) -> i32 {
    match sex {
        Sex::M => 1,
        Sex::F => 2,
    }
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .context("creating CSV output")?;
    writer.write_record(["sexe", "preusuel", "annais", "dpt", "nombre"])?;
    for row in rows {
        writer.write_record([
            sex_code(row.sex).to_string(),
            row.name.clone(),
            row.year.clone(),
            row.department.clone(),
            row.count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("sexe", DataType::Int32, false),
        Field::new("preusuel", DataType::Utf8, false),
        // text, because unknown years are written as XXXX
        Field::new("annais", DataType::Utf8, false),
        Field::new("dpt", DataType::Utf8, false),
        Field::new("nombre", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| sex_code(r.sex)))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.name.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.year.as_str()))),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.department.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.count))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.from > args.to {
        bail!("--from {} is after --to {}", args.from, args.to);
    }

    let rows = generate(&args);
    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &rows)?,
        "parquet" | "pq" => write_parquet(&args.output, &rows)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    info!("wrote {} rows to {}", rows.len(), args.output.display());
    Ok(())
}
