// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Lower bound of the birth-year picker and of the input table.
pub const YEAR_MIN: i32 = 1950;
/// Upper bound of the birth-year picker and of the input table.
pub const YEAR_MAX: i32 = 2024;

/// The five birth cohorts used throughout the stories.
///
/// `GenA` is a deliberate catch-all: any year that does not fall in one of
/// the four named ranges classifies as `GenA`, including years before 1946.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Generation {
    BabyBoomer,
    GenX,
    Millennial,
    GenZ,
    GenA,
}

impl Generation {
    /// The cohorts in their fixed chronological order. This order drives the
    /// reveal animation and the rendering of cohort filters.
    pub const ORDER: [Generation; 5] = [
        Generation::BabyBoomer,
        Generation::GenX,
        Generation::Millennial,
        Generation::GenZ,
        Generation::GenA,
    ];

    /// Maps a birth year to its cohort. Inclusive ranges, first match wins.
    /// Total over any integer input.
    pub fn classify(year: i32) -> Generation {
        match year {
            1946..=1964 => Generation::BabyBoomer,
            1965..=1980 => Generation::GenX,
            1981..=1996 => Generation::Millennial,
            1997..=2012 => Generation::GenZ,
            _ => Generation::GenA,
        }
    }

    /// The display label, as it appears in the input table and in titles.
    pub fn label(&self) -> &'static str {
        match self {
            Generation::BabyBoomer => "Baby Boomer",
            Generation::GenX => "Gen X",
            Generation::Millennial => "Millennial",
            Generation::GenZ => "Gen Z",
            Generation::GenA => "Gen A",
        }
    }

    /// Parses a label from the input table.
    pub fn from_label(label: &str) -> Option<Generation> {
        Generation::ORDER.iter().find(|g| g.label() == label).copied()
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the population table: the count of people of one gender born
/// in one country in one year.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PopulationRecord {
    pub country: String,
    pub iso3_code: String,
    pub subregion: String,
    pub continent: String,
    pub gender: String,
    /// Display noun for the gender, used in generated titles ("Men", "Women").
    pub g_type: String,
    pub year: i32,
    pub population: u64,
    pub generation: Generation,
}

/// The three values picked by the visitor. Country and gender are expected
/// to be drawn from the table's own distinct values.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    pub year: i32,
    pub country: String,
    pub gender: String,
}

/// Which of the two story pipelines to build.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum StoryVariant {
    /// Nine slides ending on the generation/percentage recaps; the embedded
    /// presentation starts at slide 6.
    AgeMates,
    /// Twelve slides including the per-generation reveal and the regional
    /// distribution tail.
    Contemporaries,
}

// ******** Output data structures *********

/// The selection joined against the table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelectionProfile {
    pub year: i32,
    pub country: String,
    pub gender: String,
    pub generation: Generation,
    pub iso3_code: String,
    pub subregion: String,
    pub continent: String,
    pub g_type: String,
}

/// The seven filtered sums computed for one request. All of them feed title
/// strings; the last two also feed percentages.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Aggregates {
    /// Same year, country and gender as the visitor.
    pub same_year_country_gender: u64,
    /// Same year and country, both genders.
    pub same_year_country: u64,
    /// Same year, whole subregion.
    pub same_year_subregion: u64,
    /// Same year, whole continent.
    pub same_year_continent: u64,
    /// Same year, worldwide.
    pub same_year: u64,
    /// Same generation, all years and countries.
    pub same_generation: u64,
    /// Every record in the table.
    pub total: u64,
}

/// A table row plus the per-request derived columns. Recomputed fresh for
/// every request and discarded after rendering.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StoryRow<'a> {
    pub record: &'a PopulationRecord,
    /// String form of the year, for categorical chart axes.
    pub year2: String,
    /// Whether this row's year is the selected year.
    pub is_selected_year: bool,
}

// ******** Chart specification *********

/// A column of the table as seen by the chart renderer.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Field {
    Country,
    Iso3Code,
    Subregion,
    Continent,
    Gender,
    GType,
    Year,
    Population,
    Generation,
    Year2,
    IsSelectedYear,
}

impl Field {
    /// The column name in the input file and in the renderer's record
    /// expressions.
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::Country => "Country",
            Field::Iso3Code => "ISO3_code",
            Field::Subregion => "Subregion",
            Field::Continent => "Continent",
            Field::Gender => "Gender",
            Field::GType => "G_Type",
            Field::Year => "Year",
            Field::Population => "Population",
            Field::Generation => "Generation",
            Field::Year2 => "Year2",
            Field::IsSelectedYear => "IsSelectedYear",
        }
    }
}

/// One clause of a record filter.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Predicate {
    /// The field equals the given value.
    Eq(Field, String),
    /// The field equals one of the given values.
    AnyOf(Field, Vec<String>),
    /// The field is present (non-empty).
    Present(Field),
}

impl Predicate {
    fn to_expression(&self) -> String {
        match self {
            Predicate::Eq(field, value) => {
                format!("record['{}'] == '{}'", field.column_name(), value)
            }
            Predicate::AnyOf(field, values) => {
                let alternatives: Vec<String> = values
                    .iter()
                    .map(|v| format!("record['{}'] == '{}'", field.column_name(), v))
                    .collect();
                format!("({})", alternatives.join(" || "))
            }
            Predicate::Present(field) => format!("record['{}']", field.column_name()),
        }
    }
}

/// A conjunction of clauses over one record.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RecordFilter {
    pub clauses: Vec<Predicate>,
}

impl RecordFilter {
    pub fn new(clauses: Vec<Predicate>) -> RecordFilter {
        RecordFilter { clauses }
    }

    /// Renders the filter in the renderer's record-expression syntax, for
    /// example `record['Year'] == '1980' && record['Country'] == 'France'`.
    pub fn to_expression(&self) -> String {
        let parts: Vec<String> = self.clauses.iter().map(|c| c.to_expression()).collect();
        parts.join(" && ")
    }
}

/// What a step does to the active record filter.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FilterAction {
    /// Leave the filter of the previous step in place.
    Keep,
    /// Remove any active filter: the step shows every record.
    Clear,
    /// Replace the active filter.
    Only(RecordFilter),
}

/// A channel assignment in a chart configuration.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelBinding {
    /// Detach whatever the channel was bound to.
    Clear,
    Field(Field),
    Fields(Vec<Field>),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Geometry {
    Circle,
    Rectangle,
    Area,
}

impl Geometry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Geometry::Circle => "circle",
            Geometry::Rectangle => "rectangle",
            Geometry::Area => "area",
        }
    }
}

/// Renderer chart presets used by the distribution slides.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChartPreset {
    Bar,
    StackedBar,
    Bubble,
}

impl ChartPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartPreset::Bar => "bar",
            ChartPreset::StackedBar => "stackedBar",
            ChartPreset::Bubble => "bubble",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Legend {
    /// Hide the legend.
    Off,
    /// Show the color legend.
    Color,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Alignment {
    /// Stretch every bar to full length (percentage view).
    Stretch,
}

/// One chart state. Fields left at `None` carry over from the previous step.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ChartConfig {
    pub preset: Option<ChartPreset>,
    pub title: Option<String>,
    pub geometry: Option<Geometry>,
    pub x: Option<ChannelBinding>,
    pub y: Option<ChannelBinding>,
    pub color: Option<ChannelBinding>,
    pub lightness: Option<ChannelBinding>,
    pub size: Option<ChannelBinding>,
    pub label: Option<ChannelBinding>,
    pub legend: Option<Legend>,
    pub align: Option<Alignment>,
    pub stacked_by: Option<Field>,
}

/// Marker label styling parameters, all renderer-native string values.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MarkerLabelStyle {
    pub format: Option<String>,
    pub font_size: Option<String>,
    pub position: Option<String>,
    pub number_format: Option<String>,
    pub max_fraction_digits: Option<String>,
    pub number_scale: Option<String>,
}

/// Which end of the lightness range the selected year lands on.
///
/// The renderer assigns lightness stops to the `IsSelectedYear` categories
/// in first-seen row order. When the selected year is the first year on the
/// axis, "yes" is seen first and must take the dark (emphasized) stop;
/// otherwise "no" is seen first and the range runs light to dark. Derived
/// once per request from the selected year.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HighlightDirection {
    DarkToLight,
    LightToDark,
}

impl HighlightDirection {
    pub fn for_year(year: i32) -> HighlightDirection {
        if year == YEAR_MIN {
            HighlightDirection::DarkToLight
        } else {
            HighlightDirection::LightToDark
        }
    }

    /// The lightness stops in assignment order.
    pub fn stops(&self) -> [&'static str; 2] {
        match self {
            HighlightDirection::DarkToLight => ["0", "0.65"],
            HighlightDirection::LightToDark => ["0.65", "0"],
        }
    }
}

/// Styling attached to one step. Fields left at `None` are not emitted.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StepStyle {
    pub title_font_size: Option<String>,
    pub logo_width: Option<String>,
    pub marker_label: Option<MarkerLabelStyle>,
    pub color_palette: Option<Vec<String>>,
    pub lightness_range: Option<HighlightDirection>,
}

/// One animation unit: a filter action, a chart configuration and optional
/// styling.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StepSpec {
    pub filter: FilterAction,
    pub config: ChartConfig,
    pub style: Option<StepStyle>,
}

/// An ordered group of steps presented as one slide.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SlideSpec {
    pub steps: Vec<StepSpec>,
}

impl SlideSpec {
    pub fn new(step: StepSpec) -> SlideSpec {
        SlideSpec { steps: vec![step] }
    }

    pub fn add_step(&mut self, step: StepSpec) {
        self.steps.push(step);
    }
}

/// The full request output handed to the renderer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StorySpec {
    pub slides: Vec<SlideSpec>,
    /// Zero-based slide the embedded presentation opens on.
    pub start_slide: Option<usize>,
    /// Whether the hover tooltip feature is switched on.
    pub tooltip: bool,
}

/// Everything produced for one request.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StoryArtifacts {
    pub profile: SelectionProfile,
    pub aggregates: Aggregates,
    pub story: StorySpec,
}

/// Errors raised while assembling the table or resolving a selection.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StoryErrors {
    EmptyTable,
    YearOutOfRange {
        year: i32,
    },
    /// A (country, gender, year) combination appeared twice; summing both
    /// rows would double count.
    DuplicateRecord {
        country: String,
        gender: String,
        year: i32,
    },
    /// A country appeared with two different ISO3/subregion/continent
    /// mappings.
    InconsistentCountry {
        country: String,
    },
    /// A gender appeared with two different display nouns.
    InconsistentGender {
        gender: String,
    },
    UnknownCountry {
        country: String,
    },
    UnknownGender {
        gender: String,
    },
}

impl Error for StoryErrors {}

impl Display for StoryErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryErrors::EmptyTable => write!(f, "the population table is empty"),
            StoryErrors::YearOutOfRange { year } => {
                write!(f, "year {} outside [{}, {}]", year, YEAR_MIN, YEAR_MAX)
            }
            StoryErrors::DuplicateRecord {
                country,
                gender,
                year,
            } => write!(
                f,
                "duplicate record for ({}, {}, {})",
                country, gender, year
            ),
            StoryErrors::InconsistentCountry { country } => {
                write!(f, "country {} has conflicting region mappings", country)
            }
            StoryErrors::InconsistentGender { gender } => {
                write!(f, "gender {} has conflicting display nouns", gender)
            }
            StoryErrors::UnknownCountry { country } => {
                write!(f, "unknown selection: country {} is not in the table", country)
            }
            StoryErrors::UnknownGender { gender } => {
                write!(f, "unknown selection: gender {} is not in the table", gender)
            }
        }
    }
}
