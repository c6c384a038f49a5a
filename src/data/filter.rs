use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, NameRecord, Sex};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// YearRange – inclusive bounds on the birth year
// ---------------------------------------------------------------------------

/// Inclusive year bounds. Construction is unchecked; queries call
/// [`YearRange::validate`] and reject `start > end` with `InvalidRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn single(year: i32) -> Self {
        Self::new(year, year)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }
}

// ---------------------------------------------------------------------------
// Filter – optional restrictions applied to a query
// ---------------------------------------------------------------------------

/// Restrictions on sex, year range and department.
/// A `None` field means "no restriction on that dimension".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub sex: Option<Sex>,
    pub years: Option<YearRange>,
    pub department: Option<String>,
}

impl Filter {
    /// No restriction at all.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_years(mut self, start: i32, end: i32) -> Self {
        self.years = Some(YearRange::new(start, end));
        self
    }

    pub fn with_year(self, year: i32) -> Self {
        self.with_years(year, year)
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Same filter without its sex restriction.
    pub fn any_sex(&self) -> Self {
        Self {
            sex: None,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.years {
            Some(range) => range.validate(),
            None => Ok(()),
        }
    }

    /// A record passes when it satisfies every restriction that is set.
    pub fn matches(&self, rec: &NameRecord) -> bool {
        if let Some(sex) = self.sex {
            if rec.sex != sex {
                return false;
            }
        }
        if let Some(range) = &self.years {
            if !range.contains(rec.year) {
                return false;
            }
        }
        if let Some(dept) = &self.department {
            if rec.department_code != *dept {
                return false;
            }
        }
        true
    }
}

/// Records of `dataset` passing `filter`, in load order.
///
/// The filter is not validated here; an inverted range simply matches nothing.
pub fn filtered_records<'a>(
    dataset: &'a Dataset,
    filter: &'a Filter,
) -> impl Iterator<Item = &'a NameRecord> + 'a {
    dataset.records().iter().filter(move |rec| filter.matches(rec))
}
