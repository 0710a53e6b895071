pub use crate::config::*;

use std::collections::{HashMap, HashSet};

/// A builder for assembling the population table.
///
/// The builder enforces the table invariants while rows are added: years
/// within bounds, no duplicate (country, gender, year) combination, and a
/// single region mapping per country and display noun per gender. Loaders
/// should report the first violation instead of continuing.
///
/// ```
/// pub use demographics::builder::TableBuilder;
/// pub use demographics::{Generation, PopulationRecord};
/// # use demographics::StoryErrors;
///
/// let mut builder = TableBuilder::new();
/// builder.add_record(&PopulationRecord {
///     country: "France".to_string(),
///     iso3_code: "FRA".to_string(),
///     subregion: "Western Europe".to_string(),
///     continent: "Europe".to_string(),
///     gender: "Male".to_string(),
///     g_type: "Men".to_string(),
///     year: 1980,
///     population: 400_000,
///     generation: Generation::classify(1980),
/// })?;
/// let records = builder.finish()?;
/// assert_eq!(records.len(), 1);
///
/// # Ok::<(), StoryErrors>(())
/// ```
pub struct TableBuilder {
    pub(crate) _records: Vec<PopulationRecord>,
    pub(crate) _seen: HashSet<(String, String, i32)>,
    pub(crate) _countries: HashMap<String, (String, String, String)>,
    pub(crate) _genders: HashMap<String, String>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder {
            _records: Vec::new(),
            _seen: HashSet::new(),
            _countries: HashMap::new(),
            _genders: HashMap::new(),
        }
    }

    /// Validates one record against the table invariants and keeps it.
    pub fn add_record(&mut self, record: &PopulationRecord) -> Result<(), StoryErrors> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&record.year) {
            return Err(StoryErrors::YearOutOfRange { year: record.year });
        }

        let key = (
            record.country.clone(),
            record.gender.clone(),
            record.year,
        );
        if !self._seen.insert(key) {
            return Err(StoryErrors::DuplicateRecord {
                country: record.country.clone(),
                gender: record.gender.clone(),
                year: record.year,
            });
        }

        let mapping = (
            record.iso3_code.clone(),
            record.subregion.clone(),
            record.continent.clone(),
        );
        match self._countries.get(&record.country) {
            Some(known) if *known != mapping => {
                return Err(StoryErrors::InconsistentCountry {
                    country: record.country.clone(),
                });
            }
            Some(_) => {}
            None => {
                self._countries.insert(record.country.clone(), mapping);
            }
        }

        match self._genders.get(&record.gender) {
            Some(known) if *known != record.g_type => {
                return Err(StoryErrors::InconsistentGender {
                    gender: record.gender.clone(),
                });
            }
            Some(_) => {}
            None => {
                self._genders
                    .insert(record.gender.clone(), record.g_type.clone());
            }
        }

        self._records.push(record.clone());
        Ok(())
    }

    /// Returns the finished table. An empty table is an error.
    pub fn finish(self) -> Result<Vec<PopulationRecord>, StoryErrors> {
        if self._records.is_empty() {
            return Err(StoryErrors::EmptyTable);
        }
        Ok(self._records)
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        TableBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, gender: &str, year: i32) -> PopulationRecord {
        PopulationRecord {
            country: country.to_string(),
            iso3_code: country[..3].to_uppercase(),
            subregion: "Western Europe".to_string(),
            continent: "Europe".to_string(),
            gender: gender.to_string(),
            g_type: format!("{}s", gender),
            year,
            population: 100,
            generation: Generation::classify(year),
        }
    }

    #[test]
    fn accepts_distinct_rows() {
        let mut builder = TableBuilder::new();
        builder.add_record(&record("France", "Male", 1980)).unwrap();
        builder.add_record(&record("France", "Male", 1981)).unwrap();
        builder.add_record(&record("France", "Female", 1980)).unwrap();
        assert_eq!(builder.finish().unwrap().len(), 3);
    }

    #[test]
    fn rejects_duplicate_rows() {
        let mut builder = TableBuilder::new();
        builder.add_record(&record("France", "Male", 1980)).unwrap();
        let res = builder.add_record(&record("France", "Male", 1980));
        assert_eq!(
            res,
            Err(StoryErrors::DuplicateRecord {
                country: "France".to_string(),
                gender: "Male".to_string(),
                year: 1980,
            })
        );
    }

    #[test]
    fn rejects_out_of_range_years() {
        let mut builder = TableBuilder::new();
        let res = builder.add_record(&record("France", "Male", 1949));
        assert_eq!(res, Err(StoryErrors::YearOutOfRange { year: 1949 }));
        let res = builder.add_record(&record("France", "Male", 2025));
        assert_eq!(res, Err(StoryErrors::YearOutOfRange { year: 2025 }));
    }

    #[test]
    fn rejects_conflicting_country_mappings() {
        let mut builder = TableBuilder::new();
        builder.add_record(&record("France", "Male", 1980)).unwrap();
        let mut other = record("France", "Male", 1981);
        other.continent = "Asia".to_string();
        let res = builder.add_record(&other);
        assert_eq!(
            res,
            Err(StoryErrors::InconsistentCountry {
                country: "France".to_string()
            })
        );
    }

    #[test]
    fn rejects_conflicting_gender_nouns() {
        let mut builder = TableBuilder::new();
        builder.add_record(&record("France", "Male", 1980)).unwrap();
        let mut other = record("France", "Male", 1981);
        other.g_type = "Gentlemen".to_string();
        let res = builder.add_record(&other);
        assert_eq!(
            res,
            Err(StoryErrors::InconsistentGender {
                gender: "Male".to_string()
            })
        );
    }

    #[test]
    fn empty_table_is_an_error() {
        let builder = TableBuilder::new();
        assert_eq!(builder.finish(), Err(StoryErrors::EmptyTable));
    }
}
