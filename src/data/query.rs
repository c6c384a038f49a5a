use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;

use super::filter::{filtered_records, Filter, YearRange};
use super::model::{Dataset, Sex};
use crate::config::{GapPolicy, QueryConfig};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Result shapes handed to the presentation layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SexSplit {
    pub year: i32,
    pub female: u64,
    pub male: u64,
}

// ---------------------------------------------------------------------------
// QueryEngine
// ---------------------------------------------------------------------------

/// Filter-and-aggregate queries over a loaded [`Dataset`].
///
/// Every operation is a read-only scan summing `birth_count` over matching
/// records. The engine is `Copy`; several threads may each hold one over the
/// same dataset.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    pub(crate) dataset: &'a Dataset,
    pub(crate) config: &'a QueryConfig,
}

impl<'a> QueryEngine<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a QueryConfig) -> Self {
        Self { dataset, config }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// The `n` most given names, descending by total, ties alphabetical.
    pub fn top_names(&self, n: usize, filter: &Filter) -> Result<Vec<NameCount>> {
        filter.validate()?;
        let mut ranked = self.totals_by_name(filter);
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Every matching name with its total, in `top_names` order.
    pub(crate) fn totals_by_name(&self, filter: &Filter) -> Vec<NameCount> {
        let mut totals: HashMap<&str, u64> = HashMap::new();
        for rec in filtered_records(self.dataset, filter) {
            *totals.entry(rec.first_name.as_str()).or_default() += rec.birth_count;
        }

        let mut ranked: Vec<NameCount> = totals
            .into_iter()
            .map(|(name, total)| NameCount {
                name: name.to_string(),
                total,
            })
            .collect();
        ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        ranked
    }

    /// Yearly births of one name, ascending by year.
    ///
    /// Years without a matching record are omitted or zero-filled according
    /// to [`QueryConfig::gap_policy`]. Zero-filling spans the dataset's
    /// observed years, narrowed to the filter's year range when it has one. A
    /// name with no matching record yields an empty series either way.
    pub fn time_series(&self, name: &str, filter: &Filter) -> Result<Vec<YearCount>> {
        filter.validate()?;
        let name = self.dataset.canonical_name(name);

        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        for rec in filtered_records(self.dataset, filter) {
            if rec.first_name == name {
                *by_year.entry(rec.year).or_default() += rec.birth_count;
            }
        }
        debug!("time series for {name}: {} years with data", by_year.len());

        if by_year.is_empty() {
            return Ok(Vec::new());
        }

        let span = match self.config.gap_policy {
            GapPolicy::Omit => None,
            GapPolicy::ZeroFill => self.dataset.year_span().map(|(first, last)| match filter.years {
                Some(range) => YearRange::new(range.start.max(first), range.end.min(last)),
                None => YearRange::new(first, last),
            }),
        };

        let series = match span {
            Some(range) => range
                .years()
                .map(|year| YearCount {
                    year,
                    count: by_year.get(&year).copied().unwrap_or(0),
                })
                .collect(),
            None => by_year
                .into_iter()
                .map(|(year, count)| YearCount { year, count })
                .collect(),
        };
        Ok(series)
    }

    /// Births of one name per department code, optionally for a single year.
    pub fn by_department(&self, name: &str, year: Option<i32>) -> Result<BTreeMap<String, u64>> {
        let filter = Filter {
            years: year.map(YearRange::single),
            ..Filter::default()
        };
        let name = self.dataset.canonical_name(name);

        let mut by_dept: BTreeMap<String, u64> = BTreeMap::new();
        for rec in filtered_records(self.dataset, &filter) {
            if rec.first_name == name {
                *by_dept.entry(rec.department_code.clone()).or_default() += rec.birth_count;
            }
        }
        Ok(by_dept)
    }

    /// Female and male births per year, ascending by year.
    /// The filter's sex restriction, if any, is ignored.
    pub fn compare_by_sex(&self, filter: &Filter) -> Result<Vec<SexSplit>> {
        filter.validate()?;
        let filter = filter.any_sex();

        let mut by_year: BTreeMap<i32, SexSplit> = BTreeMap::new();
        for rec in filtered_records(self.dataset, &filter) {
            let split = by_year.entry(rec.year).or_insert(SexSplit {
                year: rec.year,
                female: 0,
                male: 0,
            });
            match rec.sex {
                Sex::F => split.female += rec.birth_count,
                Sex::M => split.male += rec.birth_count,
            }
        }
        Ok(by_year.into_values().collect())
    }

    /// Total births per year across all names, ascending by year.
    pub fn yearly_totals(&self, filter: &Filter) -> Result<Vec<YearCount>> {
        filter.validate()?;
        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        for rec in filtered_records(self.dataset, filter) {
            *by_year.entry(rec.year).or_default() += rec.birth_count;
        }
        Ok(by_year
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::NameRecord;
    use crate::error::Error;

    fn emma_dataset() -> Dataset {
        Dataset::from_records(vec![
            NameRecord::new("Emma", Sex::F, 2000, "75", 120),
            NameRecord::new("Emma", Sex::F, 2000, "13", 80),
        ])
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            NameRecord::new("Emma", Sex::F, 2000, "75", 120),
            NameRecord::new("Emma", Sex::F, 2000, "13", 80),
            NameRecord::new("Emma", Sex::F, 2002, "75", 50),
            NameRecord::new("Lucas", Sex::M, 2000, "75", 150),
            NameRecord::new("Lucas", Sex::M, 2002, "13", 100),
            NameRecord::new("Camille", Sex::F, 2001, "75", 60),
            NameRecord::new("Camille", Sex::M, 2001, "13", 40),
            NameRecord::new("Alix", Sex::F, 2001, "13", 100),
            // duplicate key, summed
            NameRecord::new("Alix", Sex::F, 2001, "13", 0),
        ])
    }

    #[test]
    fn by_department_and_series_match_the_emma_example() {
        let ds = emma_dataset();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let depts = engine.by_department("Emma", Some(2000)).unwrap();
        assert_eq!(
            depts,
            BTreeMap::from([("75".to_string(), 120), ("13".to_string(), 80)])
        );

        let series = engine.time_series("Emma", &Filter::all()).unwrap();
        assert_eq!(series, [YearCount { year: 2000, count: 200 }]);
    }

    #[test]
    fn top_names_orders_by_total_then_name() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let top = engine.top_names(10, &Filter::all()).unwrap();
        let pairs: Vec<(&str, u64)> = top.iter().map(|nc| (nc.name.as_str(), nc.total)).collect();
        assert_eq!(
            pairs,
            [("Emma", 250), ("Lucas", 250), ("Alix", 100), ("Camille", 100)]
        );

        let top2 = engine.top_names(2, &Filter::all()).unwrap();
        assert_eq!(top2.len(), 2);
        assert!(engine.top_names(0, &Filter::all()).unwrap().is_empty());
    }

    #[test]
    fn top_names_respects_filters() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let filter = Filter::all().with_sex(Sex::M).with_years(2001, 2002);
        let top = engine.top_names(5, &filter).unwrap();
        assert_eq!(
            top,
            [
                NameCount { name: "Lucas".into(), total: 100 },
                NameCount { name: "Camille".into(), total: 40 },
            ]
        );

        let filter = Filter::all().with_department("75");
        assert_eq!(engine.top_names(1, &filter).unwrap()[0].name, "Emma");
    }

    #[test]
    fn series_gaps_follow_policy() {
        let ds = sample();
        let omit = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &omit);
        let series = engine.time_series("Emma", &Filter::all()).unwrap();
        assert_eq!(
            series,
            [
                YearCount { year: 2000, count: 200 },
                YearCount { year: 2002, count: 50 },
            ]
        );

        let fill = QueryConfig {
            gap_policy: GapPolicy::ZeroFill,
            ..QueryConfig::default()
        };
        let engine = QueryEngine::new(&ds, &fill);
        let series = engine.time_series("Emma", &Filter::all()).unwrap();
        let counts: Vec<u64> = series.iter().map(|yc| yc.count).collect();
        assert_eq!(counts, [200, 0, 50]);

        let series = engine
            .time_series("Emma", &Filter::all().with_years(1999, 2000))
            .unwrap();
        assert_eq!(
            series,
            [
                YearCount { year: 1999, count: 0 },
                YearCount { year: 2000, count: 200 },
            ]
        );

        assert!(engine.time_series("Nobody", &Filter::all()).unwrap().is_empty());
    }

    #[test]
    fn zero_fill_stays_within_observed_years() {
        let ds = sample();
        let fill = QueryConfig {
            gap_policy: GapPolicy::ZeroFill,
            ..QueryConfig::default()
        };
        let engine = QueryEngine::new(&ds, &fill);

        let series = engine
            .time_series("Emma", &Filter::all().with_years(-50_000_000, 50_000_000))
            .unwrap();
        let years: Vec<i32> = series.iter().map(|yc| yc.year).collect();
        assert_eq!(years, [2000, 2001, 2002]);

        let series = engine
            .time_series("Lucas", &Filter::all().with_years(i32::MIN, i32::MAX))
            .unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn series_sum_equals_department_sum_for_a_year() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        for name in ["Emma", "Lucas", "Camille", "Alix"] {
            for year in 2000..=2002 {
                let series: u64 = engine
                    .time_series(name, &Filter::all().with_year(year))
                    .unwrap()
                    .iter()
                    .map(|yc| yc.count)
                    .sum();
                let depts: u64 = engine.by_department(name, Some(year)).unwrap().values().sum();
                assert_eq!(series, depts, "{name} in {year}");
            }
        }
    }

    #[test]
    fn compare_by_sex_splits_each_year() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let split = engine.compare_by_sex(&Filter::all().with_sex(Sex::F)).unwrap();
        assert_eq!(
            split,
            [
                SexSplit { year: 2000, female: 200, male: 150 },
                SexSplit { year: 2001, female: 160, male: 40 },
                SexSplit { year: 2002, female: 50, male: 100 },
            ]
        );

        let split = engine
            .compare_by_sex(&Filter::all().with_department("13").with_year(2002))
            .unwrap();
        assert_eq!(split, [SexSplit { year: 2002, female: 0, male: 100 }]);
    }

    #[test]
    fn yearly_totals_sum_all_names() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let totals = engine.yearly_totals(&Filter::all()).unwrap();
        let counts: Vec<(i32, u64)> = totals.iter().map(|yc| (yc.year, yc.count)).collect();
        assert_eq!(counts, [(2000, 350), (2001, 200), (2002, 150)]);
    }

    #[test]
    fn inverted_range_is_rejected_by_every_ranged_query() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);
        let bad = Filter::all().with_years(2002, 2000);

        assert!(matches!(engine.top_names(3, &bad), Err(Error::InvalidRange { .. })));
        assert!(matches!(engine.time_series("Emma", &bad), Err(Error::InvalidRange { .. })));
        assert!(matches!(engine.compare_by_sex(&bad), Err(Error::InvalidRange { .. })));
        assert!(matches!(engine.yearly_totals(&bad), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn absent_name_gives_empty_results() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        assert!(engine.time_series("Zoé", &Filter::all()).unwrap().is_empty());
        assert!(engine.by_department("Zoé", None).unwrap().is_empty());
    }

    #[test]
    fn names_are_matched_after_canonicalisation() {
        let ds = Dataset::from_uppercased_records(vec![NameRecord::new(
            "EMMA", Sex::F, 2000, "75", 120,
        )]);
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        assert_eq!(engine.by_department(" emma ", None).unwrap().len(), 1);
        assert_eq!(engine.time_series("Emma", &Filter::all()).unwrap().len(), 1);
    }
}
