use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    F,
    M,
}

impl FromStr for Sex {
    type Err = String;

    /// Accepts `F` or `M`, any case. Numeric source codes are mapped by the
    /// loader, see [`crate::config::SexCodes`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "F" | "f" => Ok(Sex::F),
            "M" | "m" => Ok(Sex::M),
            other => Err(format!("'{other}' is not a valid sex (expected F or M)")),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::F => write!(f, "F"),
            Sex::M => write!(f, "M"),
        }
    }
}

// ---------------------------------------------------------------------------
// NameRecord – one row of the source table
// ---------------------------------------------------------------------------

/// Births of one first name, for one sex, in one department and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub first_name: String,
    pub sex: Sex,
    pub year: i32,
    pub department_code: String,
    pub birth_count: u64,
}

impl NameRecord {
    pub fn new(
        first_name: impl Into<String>,
        sex: Sex,
        year: i32,
        department_code: impl Into<String>,
        birth_count: u64,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            sex,
            year,
            department_code: department_code.into(),
            birth_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The loaded records with pre-computed indices.
///
/// Fields are private: once built, a dataset is only ever read, which is what
/// lets queries run from several threads without locking.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<NameRecord>,
    names: BTreeSet<String>,
    departments: BTreeSet<String>,
    year_span: Option<(i32, i32)>,
    uppercase_names: bool,
}

impl Dataset {
    /// Build indices from records whose names are kept exactly as given.
    pub fn from_records(records: Vec<NameRecord>) -> Self {
        Self::build(records, false)
    }

    /// Build indices from records whose names were upper-cased at load;
    /// query arguments are then upper-cased too.
    pub(crate) fn from_uppercased_records(records: Vec<NameRecord>) -> Self {
        Self::build(records, true)
    }

    fn build(records: Vec<NameRecord>, uppercase_names: bool) -> Self {
        let mut names = BTreeSet::new();
        let mut departments = BTreeSet::new();
        let mut year_span: Option<(i32, i32)> = None;

        for rec in &records {
            if !names.contains(&rec.first_name) {
                names.insert(rec.first_name.clone());
            }
            if !departments.contains(&rec.department_code) {
                departments.insert(rec.department_code.clone());
            }
            year_span = Some(match year_span {
                None => (rec.year, rec.year),
                Some((lo, hi)) => (lo.min(rec.year), hi.max(rec.year)),
            });
        }

        Dataset {
            records,
            names,
            departments,
            year_span,
            uppercase_names,
        }
    }

    pub fn records(&self) -> &[NameRecord] {
        &self.records
    }

    /// Distinct first names, sorted.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Distinct department codes, sorted.
    pub fn departments(&self) -> &BTreeSet<String> {
        &self.departments
    }

    /// First and last observed year, `None` when empty.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        self.year_span
    }

    /// Normalise a user-supplied name the way names were normalised at load.
    pub fn canonical_name(&self, name: &str) -> String {
        let trimmed = name.trim();
        if self.uppercase_names {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
