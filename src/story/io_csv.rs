// Primitives for reading the population CSV file.

use std::collections::HashMap;
use std::io::Read;

use log::debug;
use snafu::prelude::*;

use demographics::builder::TableBuilder;
use demographics::{Generation, PopulationRecord};

use crate::story::{io_common::decode_latin1, *};

/// Reads and validates the population table from a CSV file.
pub fn read_population_csv(path: &str) -> PopstoryResult<Vec<PopulationRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_population_records(rdr)
}

/// Reads and validates the population table from any reader. Used by the
/// tests with in-memory bytes.
pub fn read_population_reader<R: Read>(reader: R) -> PopstoryResult<Vec<PopulationRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);
    read_population_records(rdr)
}

fn read_population_records<R: Read>(rdr: csv::Reader<R>) -> PopstoryResult<Vec<PopulationRecord>> {
    let mut records = rdr.into_byte_records();

    // The header row drives the column positions; column order in the file
    // does not matter.
    let header = records
        .next()
        .whatever_context("The input file is empty")?
        .context(CsvLineParseSnafu {})?;
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, bytes)| (decode_latin1(bytes), idx))
        .collect();
    debug!("read_population_records: header: {:?}", columns);

    let country_idx = column(&columns, "Country")?;
    let iso3_idx = column(&columns, "ISO3_code")?;
    let subregion_idx = column(&columns, "Subregion")?;
    let continent_idx = column(&columns, "Continent")?;
    let gender_idx = column(&columns, "Gender")?;
    let g_type_idx = column(&columns, "G_Type")?;
    let year_idx = column(&columns, "Year")?;
    let population_idx = column(&columns, "Population")?;
    // The generation column is optional; it is derived from the year when
    // the file does not carry it.
    let generation_idx = columns.get("Generation").copied();

    let mut builder = TableBuilder::new();
    for (idx, record_r) in records.enumerate() {
        let lineno = idx + 2;
        let record = record_r.context(CsvLineParseSnafu {})?;
        debug!("read_population_records: line {}: {:?}", lineno, record);

        let year_value = field(&record, year_idx, lineno, "Year")?;
        let year = year_value
            .trim()
            .parse::<i32>()
            .ok()
            .context(InvalidYearSnafu {
                lineno,
                value: year_value.clone(),
            })?;

        let population_value = field(&record, population_idx, lineno, "Population")?;
        let population = population_value
            .trim()
            .parse::<u64>()
            .ok()
            .context(InvalidPopulationSnafu {
                lineno,
                value: population_value.clone(),
            })?;

        let generation = match generation_idx {
            Some(gen_idx) => {
                let label = field(&record, gen_idx, lineno, "Generation")?;
                if label.is_empty() {
                    Generation::classify(year)
                } else {
                    Generation::from_label(&label).context(InvalidGenerationSnafu {
                        lineno,
                        value: label.clone(),
                    })?
                }
            }
            None => Generation::classify(year),
        };

        let row = PopulationRecord {
            country: field(&record, country_idx, lineno, "Country")?,
            iso3_code: field(&record, iso3_idx, lineno, "ISO3_code")?,
            subregion: field(&record, subregion_idx, lineno, "Subregion")?,
            continent: field(&record, continent_idx, lineno, "Continent")?,
            gender: field(&record, gender_idx, lineno, "Gender")?,
            g_type: field(&record, g_type_idx, lineno, "G_Type")?,
            year,
            population,
            generation,
        };
        builder.add_record(&row).context(InvalidRowSnafu { lineno })?;
    }

    builder.finish().context(StorySnafu {})
}

fn column(columns: &HashMap<String, usize>, name: &str) -> PopstoryResult<usize> {
    columns
        .get(name)
        .copied()
        .context(MissingColumnSnafu { column: name })
}

fn field(
    record: &csv::ByteRecord,
    idx: usize,
    lineno: usize,
    name: &str,
) -> PopstoryResult<String> {
    let bytes = record.get(idx).context(CsvLineTooShortSnafu {
        lineno,
        column: name,
    })?;
    Ok(decode_latin1(bytes))
}
