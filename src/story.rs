use log::{debug, info, warn};

use demographics::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod export;
pub mod io_common;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum PopstoryError {
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV row"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno}: missing value for column {column}"))]
    CsvLineTooShort { lineno: usize, column: String },
    #[snafu(display("Missing column {column} in the header row"))]
    MissingColumn { column: String },
    #[snafu(display("Line {lineno}: invalid population count {value:?}"))]
    InvalidPopulation { lineno: usize, value: String },
    #[snafu(display("Line {lineno}: invalid year {value:?}"))]
    InvalidYear { lineno: usize, value: String },
    #[snafu(display("Line {lineno}: unknown generation label {value:?}"))]
    InvalidGeneration { lineno: usize, value: String },
    #[snafu(display("Line {lineno}: {source}"))]
    InvalidRow { lineno: usize, source: StoryErrors },
    #[snafu(display("{source}"))]
    Story { source: StoryErrors },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing output to {path}"))]
    WritingOutput { source: std::io::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PopstoryResult<T> = Result<T, PopstoryError>;

/// One record of the wire payload: the table row plus the per-request
/// derived columns, under the column names the renderer filters on.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct WireRecord {
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "ISO3_code")]
    iso3_code: String,
    #[serde(rename = "Subregion")]
    subregion: String,
    #[serde(rename = "Continent")]
    continent: String,
    #[serde(rename = "Gender")]
    gender: String,
    #[serde(rename = "G_Type")]
    g_type: String,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Population")]
    population: u64,
    #[serde(rename = "Generation")]
    generation: String,
    #[serde(rename = "Year2")]
    year2: String,
    #[serde(rename = "IsSelectedYear")]
    is_selected_year: String,
}

fn wire_record(row: &StoryRow) -> WireRecord {
    let r = row.record;
    WireRecord {
        country: r.country.clone(),
        iso3_code: r.iso3_code.clone(),
        subregion: r.subregion.clone(),
        continent: r.continent.clone(),
        gender: r.gender.clone(),
        g_type: r.g_type.clone(),
        year: r.year,
        population: r.population,
        generation: r.generation.label().to_string(),
        year2: row.year2.clone(),
        is_selected_year: if row.is_selected_year { "yes" } else { "no" }.to_string(),
    }
}

fn channel_to_json(binding: &ChannelBinding) -> JSValue {
    match binding {
        ChannelBinding::Clear => JSValue::Null,
        ChannelBinding::Field(f) => json!(f.column_name()),
        ChannelBinding::Fields(fs) => {
            json!(fs.iter().map(|f| f.column_name()).collect::<Vec<_>>())
        }
    }
}

fn config_to_json(config: &ChartConfig) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    if let Some(preset) = &config.preset {
        m.insert("preset".to_string(), json!(preset.as_str()));
    }
    if let Some(title) = &config.title {
        m.insert("title".to_string(), json!(title));
    }
    if let Some(geometry) = &config.geometry {
        m.insert("geometry".to_string(), json!(geometry.as_str()));
    }
    for (name, channel) in [
        ("x", &config.x),
        ("y", &config.y),
        ("color", &config.color),
        ("lightness", &config.lightness),
        ("size", &config.size),
        ("label", &config.label),
    ] {
        if let Some(binding) = channel {
            m.insert(name.to_string(), channel_to_json(binding));
        }
    }
    if let Some(legend) = &config.legend {
        let value = match legend {
            Legend::Off => JSValue::Null,
            Legend::Color => json!("color"),
        };
        m.insert("legend".to_string(), value);
    }
    if let Some(Alignment::Stretch) = &config.align {
        m.insert("align".to_string(), json!("stretch"));
    }
    if let Some(field) = &config.stacked_by {
        m.insert("stackedBy".to_string(), json!(field.column_name()));
    }
    JSValue::Object(m)
}

fn style_to_json(style: &StepStyle) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    if let Some(font_size) = &style.title_font_size {
        m.insert("title".to_string(), json!({ "fontSize": font_size }));
    }
    if let Some(width) = &style.logo_width {
        m.insert("logo".to_string(), json!({ "width": width, "filter": "none" }));
    }

    let mut marker: JSMap<String, JSValue> = JSMap::new();
    if let Some(label) = &style.marker_label {
        let mut l: JSMap<String, JSValue> = JSMap::new();
        for (name, value) in [
            ("format", &label.format),
            ("fontSize", &label.font_size),
            ("position", &label.position),
            ("numberFormat", &label.number_format),
            ("maxFractionDigits", &label.max_fraction_digits),
            ("numberScale", &label.number_scale),
        ] {
            if let Some(v) = value {
                l.insert(name.to_string(), json!(v));
            }
        }
        marker.insert("label".to_string(), JSValue::Object(l));
    }
    if let Some(palette) = &style.color_palette {
        marker.insert("colorPalette".to_string(), json!(palette));
    }
    if let Some(direction) = &style.lightness_range {
        marker.insert("lightnessRange".to_string(), json!(direction.stops()));
    }
    if !marker.is_empty() {
        m.insert("plot".to_string(), json!({ "marker": marker }));
    }
    JSValue::Object(m)
}

fn step_to_json(step: &StepSpec) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    match &step.filter {
        FilterAction::Keep => {}
        FilterAction::Clear => {
            m.insert("filter".to_string(), JSValue::Null);
        }
        FilterAction::Only(filter) => {
            m.insert("filter".to_string(), json!(filter.to_expression()));
        }
    }
    m.insert("config".to_string(), config_to_json(&step.config));
    if let Some(style) = &step.style {
        m.insert("style".to_string(), style_to_json(style));
    }
    JSValue::Object(m)
}

/// Assembles the wire payload for the renderer: the data records with their
/// derived columns, the slide sequence and the story-level toggles.
pub fn story_to_json(rows: &[StoryRow], artifacts: &StoryArtifacts) -> JSValue {
    let records: Vec<JSValue> = rows.iter().map(|r| json!(wire_record(r))).collect();
    let slides: Vec<JSValue> = artifacts
        .story
        .slides
        .iter()
        .map(|slide| {
            let steps: Vec<JSValue> = slide.steps.iter().map(step_to_json).collect();
            json!({ "steps": steps })
        })
        .collect();

    let mut root: JSMap<String, JSValue> = JSMap::new();
    root.insert("data".to_string(), json!({ "records": records }));
    root.insert("slides".to_string(), json!(slides));
    root.insert(
        "features".to_string(),
        json!({ "tooltip": artifacts.story.tooltip }),
    );
    if let Some(start) = artifacts.story.start_slide {
        root.insert("startSlide".to_string(), json!(start));
    }
    JSValue::Object(root)
}

fn parse_variant(value: Option<&str>) -> PopstoryResult<StoryVariant> {
    match value {
        None | Some("age-mates") => Ok(StoryVariant::AgeMates),
        Some("contemporaries") => Ok(StoryVariant::Contemporaries),
        Some(x) => {
            whatever!("Unknown story variant {:?} (expected 'age-mates' or 'contemporaries')", x)
        }
    }
}

fn page_title(variant: StoryVariant) -> &'static str {
    match variant {
        StoryVariant::AgeMates => "My Age-Mates",
        StoryVariant::Contemporaries => "My Contemporaries",
    }
}

fn read_reference(path: &str) -> PopstoryResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn run_story(args: &Args) -> PopstoryResult<()> {
    let variant = parse_variant(args.story.as_deref())?;
    let records = io_csv::read_population_csv(&args.data)?;
    info!(
        "run_story: loaded {} records from {}",
        records.len(),
        args.data
    );

    let selection = Selection {
        year: args.year,
        country: args.country.clone(),
        gender: args.gender.clone(),
    };
    let artifacts = build_story(&records, &selection, variant).context(StorySnafu {})?;
    debug!("run_story: aggregates: {:?}", artifacts.aggregates);

    let rows = derived_rows(&records, &selection);
    let story_js = story_to_json(&rows, &artifacts);
    let pretty = serde_json::to_string_pretty(&story_js).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty),
        Some(path) => {
            fs::write(path, &pretty).context(WritingOutputSnafu { path })?;
            info!("run_story: story written to {}", path);
        }
    }

    if let Some(path) = &args.html {
        export::write_html(path, page_title(variant), &story_js)?;
        info!("run_story: HTML export written to {}", path);
    }

    // The reference story, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference = read_reference(reference_path)?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty {
            warn!("Found differences with the reference story");
            print_diff(pretty_reference.as_str(), pretty.as_ref(), "\n");
            whatever!("Difference detected between built story and reference story")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population,Generation\n",
        );
        // "C\xf4te d'Ivoire" carries a Latin-1 byte.
        data.extend_from_slice(
            b"C\xf4te d'Ivoire,CIV,Western Africa,Africa,Male,Men,1980,120,Gen X\n",
        );
        data.extend_from_slice(
            b"C\xf4te d'Ivoire,CIV,Western Africa,Africa,Female,Women,1980,130,Gen X\n",
        );
        data.extend_from_slice(b"Japan,JPN,Eastern Asia,Asia,Male,Men,2000,400,Gen Z\n");
        data
    }

    fn sample_artifacts() -> (Vec<PopulationRecord>, Selection, StoryArtifacts) {
        let records = io_csv::read_population_reader(sample_csv().as_slice()).unwrap();
        let selection = Selection {
            year: 1980,
            country: "Côte d'Ivoire".to_string(),
            gender: "Male".to_string(),
        };
        let artifacts = build_story(&records, &selection, StoryVariant::AgeMates).unwrap();
        (records, selection, artifacts)
    }

    #[test]
    fn csv_reader_decodes_latin1() {
        let records = io_csv::read_population_reader(sample_csv().as_slice()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].country, "Côte d'Ivoire");
        assert_eq!(records[0].population, 120);
        assert_eq!(records[0].generation, Generation::GenX);
    }

    #[test]
    fn csv_reader_derives_missing_generation_column() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,2000,400\n";
        let records = io_csv::read_population_reader(data).unwrap();
        assert_eq!(records[0].generation, Generation::GenZ);
    }

    #[test]
    fn csv_reader_rejects_bad_population() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,2000,many\n";
        let res = io_csv::read_population_reader(data);
        match res {
            Err(PopstoryError::InvalidPopulation { lineno, value }) => {
                assert_eq!(lineno, 2);
                assert_eq!(value, "many");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn csv_reader_rejects_bad_year() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,droid,400\n";
        let res = io_csv::read_population_reader(data);
        assert!(matches!(
            res,
            Err(PopstoryError::InvalidYear { lineno: 2, .. })
        ));
    }

    #[test]
    fn csv_reader_rejects_out_of_range_year() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,1937,400\n";
        let res = io_csv::read_population_reader(data);
        match res {
            Err(PopstoryError::InvalidRow { lineno, source }) => {
                assert_eq!(lineno, 2);
                assert_eq!(source, StoryErrors::YearOutOfRange { year: 1937 });
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn csv_reader_rejects_missing_column() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,2000\n";
        let res = io_csv::read_population_reader(data);
        match res {
            Err(PopstoryError::MissingColumn { column }) => {
                assert_eq!(column, "Population");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn csv_reader_rejects_duplicates() {
        let data: &[u8] = b"Country,ISO3_code,Subregion,Continent,Gender,G_Type,Year,Population\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,2000,400\n\
            Japan,JPN,Eastern Asia,Asia,Male,Men,2000,401\n";
        let res = io_csv::read_population_reader(data);
        assert!(matches!(
            res,
            Err(PopstoryError::InvalidRow {
                lineno: 3,
                source: StoryErrors::DuplicateRecord { .. }
            })
        ));
    }

    #[test]
    fn story_json_shape() {
        let (records, selection, artifacts) = sample_artifacts();
        let rows = derived_rows(&records, &selection);
        let js = story_to_json(&rows, &artifacts);

        assert_eq!(js["slides"].as_array().unwrap().len(), 9);
        assert_eq!(js["startSlide"], json!(6));
        assert_eq!(js["features"]["tooltip"], json!(true));

        let records_js = js["data"]["records"].as_array().unwrap();
        assert_eq!(records_js.len(), 3);
        assert_eq!(records_js[0]["Country"], json!("Côte d'Ivoire"));
        assert_eq!(records_js[0]["Year2"], json!("1980"));
        assert_eq!(records_js[0]["IsSelectedYear"], json!("yes"));
        assert_eq!(records_js[2]["IsSelectedYear"], json!("no"));

        let first_step = &js["slides"][0]["steps"][0];
        assert_eq!(
            first_step["filter"],
            json!(
                "record['Year'] == '1980' && record['Country'] == 'C\u{f4}te d'Ivoire' \
                 && record['Gender'] == 'Male'"
            )
        );
        assert_eq!(first_step["config"]["geometry"], json!("circle"));
        assert_eq!(first_step["config"]["legend"], JSValue::Null);
        assert_eq!(
            first_step["style"]["plot"]["marker"]["label"]["format"],
            json!("dimensionsFirst")
        );
    }

    #[test]
    fn contemporaries_json_has_no_start_slide() {
        let records = io_csv::read_population_reader(sample_csv().as_slice()).unwrap();
        let selection = Selection {
            year: 2000,
            country: "Japan".to_string(),
            gender: "Male".to_string(),
        };
        let artifacts = build_story(&records, &selection, StoryVariant::Contemporaries).unwrap();
        let rows = derived_rows(&records, &selection);
        let js = story_to_json(&rows, &artifacts);
        assert_eq!(js["slides"].as_array().unwrap().len(), 12);
        assert!(js.get("startSlide").is_none());
    }

    #[test]
    fn clear_filter_serializes_as_null() {
        let step = StepSpec {
            filter: FilterAction::Clear,
            config: ChartConfig::default(),
            style: None,
        };
        let js = step_to_json(&step);
        assert_eq!(js["filter"], JSValue::Null);

        let keep = StepSpec {
            filter: FilterAction::Keep,
            config: ChartConfig::default(),
            style: None,
        };
        let js = step_to_json(&keep);
        assert!(js.get("filter").is_none());
    }

    #[test]
    fn variant_parsing() {
        assert_eq!(parse_variant(None).unwrap(), StoryVariant::AgeMates);
        assert_eq!(
            parse_variant(Some("age-mates")).unwrap(),
            StoryVariant::AgeMates
        );
        assert_eq!(
            parse_variant(Some("contemporaries")).unwrap(),
            StoryVariant::Contemporaries
        );
        assert!(parse_variant(Some("saga")).is_err());
    }

    #[test]
    fn html_export_embeds_the_story() {
        let (records, selection, artifacts) = sample_artifacts();
        let rows = derived_rows(&records, &selection);
        let js = story_to_json(&rows, &artifacts);
        let html = export::render_html("My Age-Mates", &js);
        assert!(html.contains("<title>My Age-Mates</title>"));
        assert!(html.contains("vizzu-story"));
        assert!(html.contains("\"startSlide\""));
        assert!(html.contains("Côte d'Ivoire"));
    }
}
