//! Higher-level analyses built on the query engine: dataset overview,
//! most given name per department, name search and per-name profiles.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::filter::{filtered_records, Filter};
use super::model::Sex;
use super::query::{NameCount, QueryEngine, YearCount};
use crate::error::Result;

/// Headline figures over the rows passing a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total_births: u64,
    pub unique_names: usize,
    pub departments: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub top_name: Option<NameCount>,
}

/// The most given name of one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentLeader {
    pub department: String,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameProfile {
    pub name: String,
    pub total: u64,
    pub female: u64,
    pub male: u64,
    /// Year with the most births, both sexes summed; the earliest such year
    /// on ties. A name given to girls and boys alike may therefore peak in a
    /// year where neither sex alone reaches its own maximum.
    pub peak: YearCount,
    pub top_departments: Vec<DepartmentCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameTrend {
    pub name: String,
    pub total: u64,
    pub series: Vec<YearCount>,
}

impl QueryEngine<'_> {
    /// Total births, distinct names and departments, observed years and the
    /// most given name, all over the rows passing `filter`.
    pub fn overview(&self, filter: &Filter) -> Result<Overview> {
        filter.validate()?;

        let mut total_births = 0;
        let mut names: HashSet<&str> = HashSet::new();
        let mut departments: HashSet<&str> = HashSet::new();
        let mut span: Option<(i32, i32)> = None;
        for rec in filtered_records(self.dataset, filter) {
            total_births += rec.birth_count;
            names.insert(rec.first_name.as_str());
            departments.insert(rec.department_code.as_str());
            span = Some(match span {
                None => (rec.year, rec.year),
                Some((lo, hi)) => (lo.min(rec.year), hi.max(rec.year)),
            });
        }

        Ok(Overview {
            total_births,
            unique_names: names.len(),
            departments: departments.len(),
            first_year: span.map(|(first, _)| first),
            last_year: span.map(|(_, last)| last),
            top_name: self.totals_by_name(filter).into_iter().next(),
        })
    }

    /// Most given name in each department for `year`, optionally for one sex.
    ///
    /// Sorted by count descending, then department code. Within a department
    /// a tie goes to the alphabetically first name.
    pub fn department_leaders(&self, year: i32, sex: Option<Sex>) -> Vec<DepartmentLeader> {
        let filter = Filter {
            sex,
            ..Filter::all().with_year(year)
        };

        let mut totals: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for rec in filtered_records(self.dataset, &filter) {
            *totals
                .entry((rec.department_code.as_str(), rec.first_name.as_str()))
                .or_default() += rec.birth_count;
        }

        // Keys iterate by department then name, so a strict `>` keeps the
        // alphabetically first name on ties.
        let mut best: BTreeMap<&str, (&str, u64)> = BTreeMap::new();
        for ((dept, name), count) in totals {
            let replace = best.get(dept).map_or(true, |&(_, current)| count > current);
            if replace {
                best.insert(dept, (name, count));
            }
        }

        let mut leaders: Vec<DepartmentLeader> = best
            .into_iter()
            .map(|(dept, (name, count))| DepartmentLeader {
                department: dept.to_string(),
                name: name.to_string(),
                count,
            })
            .collect();
        leaders.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.department.cmp(&b.department))
        });
        leaders
    }

    /// Distinct names containing `fragment`, sorted.
    pub fn search(&self, fragment: &str) -> Vec<String> {
        let needle = self.dataset.canonical_name(fragment);
        if needle.is_empty() {
            return Vec::new();
        }
        self.dataset
            .names()
            .iter()
            .filter(|name| name.contains(&needle))
            .cloned()
            .collect()
    }

    /// Summary of one name over the whole dataset, `None` when absent.
    pub fn name_profile(&self, name: &str, top_departments: usize) -> Option<NameProfile> {
        let name = self.dataset.canonical_name(name);

        let mut female = 0;
        let mut male = 0;
        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        let mut by_dept: HashMap<&str, u64> = HashMap::new();
        for rec in self.dataset.records().iter().filter(|r| r.first_name == name) {
            match rec.sex {
                Sex::F => female += rec.birth_count,
                Sex::M => male += rec.birth_count,
            }
            *by_year.entry(rec.year).or_default() += rec.birth_count;
            *by_dept.entry(rec.department_code.as_str()).or_default() += rec.birth_count;
        }

        let mut peak: Option<YearCount> = None;
        for (year, count) in by_year {
            if peak.map_or(true, |p| count > p.count) {
                peak = Some(YearCount { year, count });
            }
        }
        let peak = peak?;

        let mut departments: Vec<DepartmentCount> = by_dept
            .into_iter()
            .map(|(dept, count)| DepartmentCount {
                department: dept.to_string(),
                count,
            })
            .collect();
        departments.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.department.cmp(&b.department))
        });
        departments.truncate(top_departments);

        Some(NameProfile {
            name,
            total: female + male,
            female,
            male,
            peak,
            top_departments: departments,
        })
    }

    /// The `n` top names under `filter`, each with its yearly series.
    pub fn trends(&self, n: usize, filter: &Filter) -> Result<Vec<NameTrend>> {
        let top = self.top_names(n, filter)?;
        top.into_iter()
            .map(|NameCount { name, total }| {
                let series = self.time_series(&name, filter)?;
                Ok(NameTrend {
                    name,
                    total,
                    series,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::data::model::{Dataset, NameRecord};
    use crate::error::Error;

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            NameRecord::new("Emma", Sex::F, 2000, "75", 120),
            NameRecord::new("Emma", Sex::F, 2000, "13", 80),
            NameRecord::new("Emma", Sex::F, 2002, "75", 50),
            NameRecord::new("Lucas", Sex::M, 2000, "75", 150),
            NameRecord::new("Lucas", Sex::M, 2000, "13", 80),
            NameRecord::new("Lucas", Sex::M, 2002, "13", 100),
            NameRecord::new("Camille", Sex::F, 2001, "75", 60),
            NameRecord::new("Camille", Sex::M, 2001, "13", 40),
            NameRecord::new("Emmanuel", Sex::M, 2001, "2A", 10),
        ])
    }

    #[test]
    fn overview_counts_everything() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        assert_eq!(
            engine.overview(&Filter::all()).unwrap(),
            Overview {
                total_births: 690,
                unique_names: 4,
                departments: 3,
                first_year: Some(2000),
                last_year: Some(2002),
                top_name: Some(NameCount { name: "Lucas".into(), total: 330 }),
            }
        );

        let empty = Dataset::default();
        let engine = QueryEngine::new(&empty, &config);
        let overview = engine.overview(&Filter::all()).unwrap();
        assert_eq!(overview.first_year, None);
        assert_eq!(overview.total_births, 0);
        assert_eq!(overview.top_name, None);
    }

    #[test]
    fn overview_follows_the_filter() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let girls = engine
            .overview(&Filter::all().with_sex(Sex::F).with_years(2001, 2002))
            .unwrap();
        assert_eq!(
            girls,
            Overview {
                total_births: 110,
                unique_names: 2,
                departments: 1,
                first_year: Some(2001),
                last_year: Some(2002),
                top_name: Some(NameCount { name: "Camille".into(), total: 60 }),
            }
        );

        let nothing = engine.overview(&Filter::all().with_year(1950)).unwrap();
        assert_eq!(nothing.total_births, 0);
        assert_eq!(nothing.unique_names, 0);

        assert!(matches!(
            engine.overview(&Filter::all().with_years(2002, 2000)),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn profile_peak_sums_both_sexes() {
        let ds = Dataset::from_records(vec![
            NameRecord::new("Dominique", Sex::F, 1960, "75", 70),
            NameRecord::new("Dominique", Sex::M, 1960, "75", 50),
            NameRecord::new("Dominique", Sex::M, 1962, "75", 100),
        ]);
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let profile = engine.name_profile("Dominique", 3).unwrap();
        assert_eq!(profile.peak, YearCount { year: 1960, count: 120 });
    }

    #[test]
    fn department_leaders_pick_the_top_name() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let leaders = engine.department_leaders(2000, None);
        assert_eq!(
            leaders,
            [
                DepartmentLeader { department: "75".into(), name: "Lucas".into(), count: 150 },
                // Emma and Lucas tie at 80 in department 13.
                DepartmentLeader { department: "13".into(), name: "Emma".into(), count: 80 },
            ]
        );

        let girls = engine.department_leaders(2000, Some(Sex::F));
        assert_eq!(girls[0].name, "Emma");
        assert_eq!(girls[0].count, 120);

        assert!(engine.department_leaders(1950, None).is_empty());
    }

    #[test]
    fn search_matches_substrings() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        assert_eq!(engine.search("Emma"), ["Emma", "Emmanuel"]);
        assert_eq!(engine.search("mil"), ["Camille"]);
        assert!(engine.search("   ").is_empty());
        assert!(engine.search("Zoé").is_empty());
    }

    #[test]
    fn profile_summarises_one_name() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let profile = engine.name_profile("Camille", 1).unwrap();
        assert_eq!(profile.total, 100);
        assert_eq!((profile.female, profile.male), (60, 40));
        assert_eq!(profile.peak, YearCount { year: 2001, count: 100 });
        assert_eq!(
            profile.top_departments,
            [DepartmentCount { department: "75".into(), count: 60 }]
        );

        let lucas = engine.name_profile("Lucas", 10).unwrap();
        assert_eq!(lucas.peak, YearCount { year: 2000, count: 230 });
        assert_eq!(lucas.top_departments.len(), 2);
        assert_eq!(lucas.top_departments[0].department, "13");

        assert!(engine.name_profile("Zoé", 10).is_none());
    }

    #[test]
    fn trends_pair_top_names_with_series() {
        let ds = sample();
        let config = QueryConfig::default();
        let engine = QueryEngine::new(&ds, &config);

        let trends = engine.trends(2, &Filter::all()).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].name, "Lucas");
        assert_eq!(trends[0].total, 330);
        assert_eq!(trends[1].name, "Emma");
        assert_eq!(
            trends[1].series,
            [YearCount { year: 2000, count: 200 }, YearCount { year: 2002, count: 50 }]
        );

        assert!(matches!(
            engine.trends(2, &Filter::all().with_years(2002, 2001)),
            Err(Error::InvalidRange { .. })
        ));
    }
}
