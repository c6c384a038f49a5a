use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, NameRecord, Sex};
use crate::config::{LoaderConfig, SourceFormat};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a name statistics dataset from a file.
///
/// The format comes from `config.format`, or from the extension when unset:
/// * `.csv` / `.txt` – delimited text with a header row (INSEE uses `;`)
/// * `.json`         – `[{ "preusuel": "EMMA", "sexe": 2, ... }, ...]`
/// * `.parquet`      – one column per field, any type castable to text
pub fn load_file(path: &Path, config: &LoaderConfig) -> Result<Dataset> {
    let format = match config.format {
        Some(format) => format,
        None => format_from_extension(path)?,
    };
    debug!("loading {} as {format:?}", path.display());

    let mut rows = RowParser::new(config);
    match format {
        SourceFormat::Csv => {
            let reader = csv_builder(config)?.from_path(path)?;
            read_csv(reader, &mut rows)?;
        }
        SourceFormat::Json => load_json(path, &mut rows)?,
        SourceFormat::Parquet => load_parquet(path, &mut rows)?,
    }
    Ok(rows.finish())
}

/// Load delimited text from any reader (an open file, stdin, a buffer).
pub fn load_csv_reader<R: Read>(reader: R, config: &LoaderConfig) -> Result<Dataset> {
    let mut rows = RowParser::new(config);
    read_csv(csv_builder(config)?.from_reader(reader), &mut rows)?;
    Ok(rows.finish())
}

fn format_from_extension(path: &Path) -> Result<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => Ok(SourceFormat::Csv),
        "json" => Ok(SourceFormat::Json),
        "parquet" | "pq" => Ok(SourceFormat::Parquet),
        _ => Err(Error::UnsupportedFormat(ext)),
    }
}

// ---------------------------------------------------------------------------
// Row validation shared by every format
// ---------------------------------------------------------------------------

/// The five required fields of one source row, as text.
struct RawRow<'a> {
    name: &'a str,
    sex: &'a str,
    year: &'a str,
    department: &'a str,
    count: &'a str,
}

#[derive(Debug, Default)]
struct LoadStats {
    rows: usize,
    skipped_names: usize,
    skipped_years: usize,
    skipped_departments: usize,
}

/// Validates raw rows, applies the cleaning rules and accumulates records.
struct RowParser<'c> {
    config: &'c LoaderConfig,
    records: Vec<NameRecord>,
    stats: LoadStats,
}

impl<'c> RowParser<'c> {
    fn new(config: &'c LoaderConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            stats: LoadStats::default(),
        }
    }

    /// Next 1-based data row number, used in error locations.
    fn next_row(&self) -> usize {
        self.stats.rows + 1
    }

    fn push(&mut self, raw: RawRow<'_>) -> Result<()> {
        self.stats.rows += 1;
        let row = self.stats.rows;
        let columns = &self.config.columns;

        let name = required(row, &columns.name, raw.name)?;
        let sex = required(row, &columns.sex, raw.sex)?;
        let year = required(row, &columns.year, raw.year)?;
        let department = required(row, &columns.department, raw.department)?;
        let count = required(row, &columns.count, raw.count)?;

        if self.config.skip_names.iter().any(|s| s == name) {
            self.stats.skipped_names += 1;
            return Ok(());
        }
        if self.config.unknown_year_marker.as_deref() == Some(year) {
            self.stats.skipped_years += 1;
            return Ok(());
        }
        if self.config.excluded_departments.iter().any(|d| d == department) {
            self.stats.skipped_departments += 1;
            return Ok(());
        }

        let year: i32 = year.parse().map_err(|_| {
            Error::data_format(
                location(row),
                format!("{} '{year}' is not an integer year", columns.year),
            )
        })?;
        let sex = self.parse_sex(row, sex)?;
        let birth_count = parse_count(row, &columns.count, count)?;

        let first_name = if self.config.uppercase_names {
            name.to_uppercase()
        } else {
            name.to_string()
        };

        self.records.push(NameRecord {
            first_name,
            sex,
            year,
            department_code: department.to_string(),
            birth_count,
        });
        Ok(())
    }

    fn parse_sex(&self, row: usize, value: &str) -> Result<Sex> {
        let codes = &self.config.sex_codes;
        if value == codes.female {
            return Ok(Sex::F);
        }
        if value == codes.male {
            return Ok(Sex::M);
        }
        value.parse().map_err(|_| {
            Error::data_format(
                location(row),
                format!(
                    "{} '{value}' is not a valid sex (expected {}, {}, F or M)",
                    self.config.columns.sex, codes.female, codes.male
                ),
            )
        })
    }

    fn finish(self) -> Dataset {
        let stats = &self.stats;
        debug!(
            "skipped rows: {} placeholder names, {} unknown years, {} excluded departments",
            stats.skipped_names, stats.skipped_years, stats.skipped_departments
        );
        info!(
            "loaded {} records from {} source rows",
            self.records.len(),
            stats.rows
        );
        if self.records.is_empty() {
            warn!("dataset is empty after loading");
        }

        if self.config.uppercase_names {
            Dataset::from_uppercased_records(self.records)
        } else {
            Dataset::from_records(self.records)
        }
    }
}

fn location(row: usize) -> String {
    format!("row {row}")
}

fn required<'a>(row: usize, column: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::data_format(
            location(row),
            format!("missing value for required field '{column}'"),
        ));
    }
    Ok(value)
}

fn parse_count(row: usize, column: &str, value: &str) -> Result<u64> {
    let count: i64 = value.parse().map_err(|_| {
        Error::data_format(location(row), format!("{column} '{value}' is not an integer"))
    })?;
    u64::try_from(count).map_err(|_| {
        Error::data_format(location(row), format!("{column} {count} is negative"))
    })
}

fn missing_column(column: &str) -> Error {
    Error::data_format("header", format!("missing required column '{column}'"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn csv_builder(config: &LoaderConfig) -> Result<csv::ReaderBuilder> {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(config.delimiter_byte()?);
    Ok(builder)
}

/// CSV layout: header row naming the columns, one record per line.
/// Extra columns are ignored.
fn read_csv<R: Read>(mut reader: csv::Reader<R>, rows: &mut RowParser<'_>) -> Result<()> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let columns = &rows.config.columns;
    let index_of = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| missing_column(column))
    };
    let name_idx = index_of(&columns.name)?;
    let sex_idx = index_of(&columns.sex)?;
    let year_idx = index_of(&columns.year)?;
    let dept_idx = index_of(&columns.department)?;
    let count_idx = index_of(&columns.count)?;

    for result in reader.records() {
        let record =
            result.map_err(|e| Error::data_format(location(rows.next_row()), e.to_string()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(RawRow {
            name: cell(name_idx),
            sex: cell(sex_idx),
            year: cell(year_idx),
            department: cell(dept_idx),
            count: cell(count_idx),
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "sexe": 1, "preusuel": "EMMA", "annais": "2000", "dpt": "75", "nombre": 120 },
///   ...
/// ]
/// ```
///
/// Scalars of any JSON type are accepted and read as text.
fn load_json(path: &Path, rows: &mut RowParser<'_>) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| Error::data_format("document", "expected a top-level JSON array"))?;

    for rec in records {
        let obj = rec.as_object().ok_or_else(|| {
            Error::data_format(location(rows.next_row()), "row is not a JSON object")
        })?;

        let columns = &rows.config.columns;
        let name = json_cell(obj.get(&columns.name));
        let sex = json_cell(obj.get(&columns.sex));
        let year = json_cell(obj.get(&columns.year));
        let department = json_cell(obj.get(&columns.department));
        let count = json_cell(obj.get(&columns.count));

        rows.push(RawRow {
            name: &name,
            sex: &sex,
            year: &year,
            department: &department,
            count: &count,
        })?;
    }
    Ok(())
}

fn json_cell(val: Option<&JsonValue>) -> String {
    match val {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per required field.
///
/// Columns may be strings, integers or dictionaries; each is cast to text and
/// validated like a CSV cell. Nulls count as missing values.
fn load_parquet(path: &Path, rows: &mut RowParser<'_>) -> Result<()> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    for batch_result in reader {
        let batch = batch_result?;
        let columns = &rows.config.columns;

        let name_col = text_column(&batch, &columns.name)?;
        let sex_col = text_column(&batch, &columns.sex)?;
        let year_col = text_column(&batch, &columns.year)?;
        let dept_col = text_column(&batch, &columns.department)?;
        let count_col = text_column(&batch, &columns.count)?;

        for row in 0..batch.num_rows() {
            rows.push(RawRow {
                name: text_cell(&name_col, row),
                sex: text_cell(&sex_col, row),
                year: text_cell(&year_col, row),
                department: text_cell(&dept_col, row),
                count: text_cell(&count_col, row),
            })?;
        }
    }
    Ok(())
}

// -- Arrow helpers --

/// Locate a column by name and cast it to UTF-8.
fn text_column(batch: &RecordBatch, column: &str) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(column)
        .map_err(|_| missing_column(column))?;
    Ok(cast(batch.column(idx), &DataType::Utf8)?)
}

fn text_cell(col: &ArrayRef, row: usize) -> &str {
    if col.is_null(row) {
        return "";
    }
    col.as_string::<i32>().value(row)
}
