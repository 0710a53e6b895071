mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

pub use crate::config::*;

// **** Core transforms ****

/// Formats a population count with a K/M/B suffix at one fractional digit,
/// or the plain integer below 1,000.
///
/// Rounding of the fractional digit is the standard formatter's: ties on the
/// decimal expansion round to even. The billion suffix only applies from
/// 1e9 upward, so 999_999_999 renders as "1000.0M".
pub fn format_population(population: u64) -> String {
    let p = population as f64;
    if p >= 1e9 {
        format!("{:.1}B", p / 1e9)
    } else if p >= 1e6 {
        format!("{:.1}M", p / 1e6)
    } else if p >= 1e3 {
        format!("{:.1}K", p / 1e3)
    } else {
        population.to_string()
    }
}

/// Sums the population of the records matched by the predicate. An empty
/// match is a zero sum, not an error.
pub fn sum_population<P>(records: &[PopulationRecord], predicate: P) -> u64
where
    P: Fn(&PopulationRecord) -> bool,
{
    records
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.population)
        .sum()
}

/// Share of `part` in `total` as a value in [0, 100]. Zero when the total is
/// zero.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Joins the selection against the table. Fails fast when the country or
/// gender does not appear in any record.
pub fn resolve_selection(
    records: &[PopulationRecord],
    selection: &Selection,
) -> Result<SelectionProfile, StoryErrors> {
    let country_row = records
        .iter()
        .find(|r| r.country == selection.country)
        .ok_or(StoryErrors::UnknownCountry {
            country: selection.country.clone(),
        })?;
    let gender_row = records
        .iter()
        .find(|r| r.gender == selection.gender)
        .ok_or(StoryErrors::UnknownGender {
            gender: selection.gender.clone(),
        })?;
    Ok(SelectionProfile {
        year: selection.year,
        country: selection.country.clone(),
        gender: selection.gender.clone(),
        generation: Generation::classify(selection.year),
        iso3_code: country_row.iso3_code.clone(),
        subregion: country_row.subregion.clone(),
        continent: country_row.continent.clone(),
        g_type: gender_row.g_type.clone(),
    })
}

/// Computes the seven per-request aggregates.
pub fn compute_aggregates(records: &[PopulationRecord], profile: &SelectionProfile) -> Aggregates {
    let year = profile.year;
    Aggregates {
        same_year_country_gender: sum_population(records, |r| {
            r.year == year && r.country == profile.country && r.gender == profile.gender
        }),
        same_year_country: sum_population(records, |r| {
            r.year == year && r.country == profile.country
        }),
        same_year_subregion: sum_population(records, |r| {
            r.year == year && r.subregion == profile.subregion
        }),
        same_year_continent: sum_population(records, |r| {
            r.year == year && r.continent == profile.continent
        }),
        same_year: sum_population(records, |r| r.year == year),
        same_generation: sum_population(records, |r| r.generation == profile.generation),
        total: sum_population(records, |_| true),
    }
}

/// Attaches the per-request derived columns to each record.
pub fn derived_rows<'a>(
    records: &'a [PopulationRecord],
    selection: &Selection,
) -> Vec<StoryRow<'a>> {
    records
        .iter()
        .map(|r| StoryRow {
            record: r,
            year2: r.year.to_string(),
            is_selected_year: r.year == selection.year,
        })
        .collect()
}

// **** Styling tables ****

const MALE_PALETTE: [&str; 2] = ["#1f77b4", "#89c2e8"];
const FEMALE_PALETTE: [&str; 2] = ["#d45087", "#f2a3c5"];
const NEUTRAL_PALETTE: [&str; 2] = ["#4f5b66", "#b3bcc4"];

/// Marker palette for the opening circle slide, keyed on the gender label.
/// Palette choice is cosmetic: labels outside the table's usual pair fall
/// back to the neutral palette instead of failing.
pub fn palette_for_gender(gender: &str) -> &'static [&'static str] {
    match gender {
        "Male" => &MALE_PALETTE,
        "Female" => &FEMALE_PALETTE,
        _ => &NEUTRAL_PALETTE,
    }
}

/// The reveal schedule of the generation-distribution slide: for each
/// viewer cohort, the cohorts included at each step.
///
/// Every schedule opens on the viewer's own cohort, grows strictly outward
/// (each step is a superset of the previous one) and closes on all five
/// cohorts. The five orderings are deliberately enumerated rather than
/// computed: the oldest and youngest cohorts sweep in one direction, the
/// inner cohorts take both neighbours before the far ends.
pub fn generation_expansion(generation: Generation) -> Vec<Vec<Generation>> {
    use crate::config::Generation::*;
    match generation {
        BabyBoomer => vec![
            vec![BabyBoomer],
            vec![BabyBoomer, GenX],
            vec![BabyBoomer, GenX, Millennial],
            vec![BabyBoomer, GenX, Millennial, GenZ],
            Generation::ORDER.to_vec(),
        ],
        GenX => vec![
            vec![GenX],
            vec![BabyBoomer, GenX, Millennial],
            vec![BabyBoomer, GenX, Millennial, GenZ],
            Generation::ORDER.to_vec(),
        ],
        Millennial => vec![
            vec![Millennial],
            vec![GenX, Millennial, GenZ],
            Generation::ORDER.to_vec(),
        ],
        GenZ => vec![
            vec![GenZ],
            vec![Millennial, GenZ, GenA],
            vec![GenX, Millennial, GenZ, GenA],
            Generation::ORDER.to_vec(),
        ],
        GenA => vec![
            vec![GenA],
            vec![GenZ, GenA],
            vec![Millennial, GenZ, GenA],
            vec![GenX, Millennial, GenZ, GenA],
            Generation::ORDER.to_vec(),
        ],
    }
}

// **** Story assembly ****

/// Builds the full story for one request.
///
/// Arguments:
/// * `records` the loaded population table
/// * `selection` the visitor's year, country and gender
/// * `variant` which of the two pipelines to build
pub fn build_story(
    records: &[PopulationRecord],
    selection: &Selection,
    variant: StoryVariant,
) -> Result<StoryArtifacts, StoryErrors> {
    if records.is_empty() {
        return Err(StoryErrors::EmptyTable);
    }
    info!(
        "build_story: {:?} records, selection: {:?}, variant: {:?}",
        records.len(),
        selection,
        variant
    );
    let profile = resolve_selection(records, selection)?;
    debug!("build_story: resolved profile: {:?}", profile);
    let aggregates = compute_aggregates(records, &profile);
    debug!("build_story: aggregates: {:?}", aggregates);

    let story = match variant {
        StoryVariant::AgeMates => age_mates_story(&profile, &aggregates),
        StoryVariant::Contemporaries => contemporaries_story(&profile, &aggregates),
    };
    Ok(StoryArtifacts {
        profile,
        aggregates,
        story,
    })
}

fn one(f: Field) -> Option<ChannelBinding> {
    Some(ChannelBinding::Field(f))
}

fn many(fs: &[Field]) -> Option<ChannelBinding> {
    Some(ChannelBinding::Fields(fs.to_vec()))
}

fn detach() -> Option<ChannelBinding> {
    Some(ChannelBinding::Clear)
}

fn eq(f: Field, value: &str) -> Predicate {
    Predicate::Eq(f, value.to_string())
}

fn only(clauses: Vec<Predicate>) -> FilterAction {
    FilterAction::Only(RecordFilter::new(clauses))
}

fn step(filter: FilterAction, config: ChartConfig) -> StepSpec {
    StepSpec {
        filter,
        config,
        style: None,
    }
}

fn styled(filter: FilterAction, config: ChartConfig, style: StepStyle) -> StepSpec {
    StepSpec {
        filter,
        config,
        style: Some(style),
    }
}

/// Slides 1 to 5, shared by both variants: the zoom-out from
/// year+country+gender to the whole world for the selected year. The
/// age-mates page brands the opening slide with the site logo.
fn opening_slides(p: &SelectionProfile, a: &Aggregates, with_logo: bool) -> Vec<SlideSpec> {
    let year = p.year.to_string();
    let mut slides = Vec::new();

    let title1 = format!(
        "You Are One of {} {} Born in {} in {}",
        format_population(a.same_year_country_gender),
        p.g_type,
        p.year,
        p.iso3_code
    );
    slides.push(SlideSpec::new(styled(
        only(vec![
            eq(Field::Year, &year),
            eq(Field::Country, &p.country),
            eq(Field::Gender, &p.gender),
        ]),
        ChartConfig {
            color: one(Field::Gender),
            size: one(Field::Population),
            geometry: Some(Geometry::Circle),
            label: one(Field::Population),
            legend: Some(Legend::Off),
            title: Some(title1),
            ..Default::default()
        },
        StepStyle {
            title_font_size: Some("3em".to_string()),
            logo_width: if with_logo {
                Some("5em".to_string())
            } else {
                None
            },
            marker_label: Some(MarkerLabelStyle {
                format: Some("dimensionsFirst".to_string()),
                font_size: Some("2.5em".to_string()),
                ..Default::default()
            }),
            color_palette: Some(
                palette_for_gender(&p.gender)
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            ),
            ..Default::default()
        },
    )));

    let title2 = format!(
        "You Are One of {} People Born in {} in {}",
        format_population(a.same_year_country),
        p.year,
        p.iso3_code
    );
    slides.push(SlideSpec::new(styled(
        only(vec![
            eq(Field::Country, &p.country),
            eq(Field::Year, &year),
        ]),
        ChartConfig {
            label: many(&[Field::GType, Field::Population]),
            title: Some(title2),
            ..Default::default()
        },
        StepStyle {
            marker_label: Some(MarkerLabelStyle {
                font_size: Some("1.8em".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    )));

    let title3 = format!(
        "You Are One of {} People Born in {} in {}",
        format_population(a.same_year_subregion),
        p.year,
        p.subregion
    );
    slides.push(SlideSpec::new(styled(
        only(vec![
            eq(Field::Subregion, &p.subregion),
            eq(Field::Year, &year),
        ]),
        ChartConfig {
            color: one(Field::Country),
            label: many(&[Field::Iso3Code, Field::Population]),
            legend: Some(Legend::Off),
            title: Some(title3),
            ..Default::default()
        },
        StepStyle {
            marker_label: Some(MarkerLabelStyle {
                number_format: Some("prefixed".to_string()),
                max_fraction_digits: Some("1".to_string()),
                number_scale: Some("shortScaleSymbolUS".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    )));

    // Original title casing kept as-is on this one.
    let title4 = format!(
        "You are One of {} People Born in {} in {}",
        format_population(a.same_year_continent),
        p.year,
        p.continent
    );
    slides.push(SlideSpec::new(step(
        only(vec![
            eq(Field::Continent, &p.continent),
            eq(Field::Year, &year),
        ]),
        ChartConfig {
            title: Some(title4),
            size: many(&[Field::Population]),
            ..Default::default()
        },
    )));

    let title5 = world_title(p, a);
    slides.push(SlideSpec::new(step(
        only(vec![eq(Field::Year, &year)]),
        ChartConfig {
            color: one(Field::Continent),
            label: many(&[Field::Continent, Field::Population]),
            title: Some(title5),
            ..Default::default()
        },
    )));

    slides
}

fn world_title(p: &SelectionProfile, a: &Aggregates) -> String {
    format!(
        "You Are One of {} People Born in {} in the World",
        format_population(a.same_year),
        p.year
    )
}

fn generation_title(p: &SelectionProfile, a: &Aggregates) -> String {
    format!(
        "You Belong to the {} {}s Worldwide",
        format_population(a.same_generation),
        p.generation
    )
}

/// The nine-slide age-mates pipeline. The embedded presentation starts on
/// slide 6, right before the generation recap.
fn age_mates_story(p: &SelectionProfile, a: &Aggregates) -> StorySpec {
    let year = p.year.to_string();
    let mut slides = opening_slides(p, a, true);

    // Slide 6: from the world bubble to a stacked column over the year axis,
    // recolored by generation, narrowed to the visitor's cohort.
    let mut slide6 = SlideSpec::new(step(
        only(vec![eq(Field::Year, &year)]),
        ChartConfig {
            geometry: Some(Geometry::Rectangle),
            x: one(Field::Year2),
            y: many(&[Field::Population, Field::Continent]),
            label: detach(),
            title: Some(world_title(p, a)),
            ..Default::default()
        },
    ));
    slide6.add_step(step(
        FilterAction::Keep,
        ChartConfig {
            y: one(Field::Population),
            color: one(Field::Generation),
            ..Default::default()
        },
    ));
    slide6.add_step(step(
        FilterAction::Keep,
        ChartConfig {
            label: one(Field::Population),
            ..Default::default()
        },
    ));
    slide6.add_step(step(
        only(vec![eq(Field::Generation, p.generation.label())]),
        ChartConfig {
            title: Some(generation_title(p, a)),
            ..Default::default()
        },
    ));
    slides.push(slide6);

    // Slide 7: widen back out to every record, cohorts side by side.
    let mut slide7 = SlideSpec::new(step(
        FilterAction::Keep,
        ChartConfig {
            label: detach(),
            ..Default::default()
        },
    ));
    slide7.add_step(step(
        FilterAction::Keep,
        ChartConfig {
            x: many(&[Field::Generation, Field::Population]),
            y: detach(),
            ..Default::default()
        },
    ));
    slide7.add_step(styled(
        FilterAction::Keep,
        ChartConfig {
            label: one(Field::Population),
            ..Default::default()
        },
        StepStyle {
            marker_label: Some(MarkerLabelStyle {
                position: Some("center".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    ));
    slide7.add_step(step(
        FilterAction::Clear,
        ChartConfig {
            label: many(&[Field::Generation, Field::Population]),
            title: Some(format!(
                "You Are One of {} People Born after 1950 in the World",
                format_population(a.total)
            )),
            ..Default::default()
        },
    ));
    slides.push(slide7);

    // Slide 8: the cohort's share of everyone born since 1950.
    slides.push(SlideSpec::new(step(
        FilterAction::Clear,
        ChartConfig {
            label: many(&[Field::Generation, Field::Population]),
            align: Some(Alignment::Stretch),
            title: Some(format!(
                "Your Generation is {:.1}% of People Born after 1950",
                percentage(a.same_generation, a.total)
            )),
            ..Default::default()
        },
    )));

    // Slide 9: every year on the axis, the selected one emphasized.
    slides.push(SlideSpec::new(styled(
        FilterAction::Clear,
        ChartConfig {
            label: detach(),
            x: many(&[Field::Year2, Field::Generation, Field::Population]),
            lightness: one(Field::IsSelectedYear),
            title: Some(format!(
                "You and Your {} Age-Mates Are {:.1}% of People Born after 1950",
                format_population(a.same_year),
                percentage(a.same_year, a.total)
            )),
            ..Default::default()
        },
        StepStyle {
            lightness_range: Some(HighlightDirection::for_year(p.year)),
            ..Default::default()
        },
    )));

    StorySpec {
        slides,
        start_slide: Some(6),
        tooltip: true,
    }
}

/// The twelve-slide contemporaries pipeline with the per-cohort reveal and
/// the regional distribution tail.
fn contemporaries_story(p: &SelectionProfile, a: &Aggregates) -> StorySpec {
    let year = p.year.to_string();
    let mut slides = opening_slides(p, a, false);

    // Slide 6: the selected year as a stacked column.
    slides.push(SlideSpec::new(step(
        only(vec![eq(Field::Year, &year)]),
        ChartConfig {
            geometry: Some(Geometry::Rectangle),
            x: one(Field::Year2),
            y: many(&[Field::Population, Field::Continent]),
            label: one(Field::Population),
            legend: Some(Legend::Color),
            title: Some(world_title(p, a)),
            ..Default::default()
        },
    )));

    // Slide 7: the visitor's whole cohort.
    slides.push(SlideSpec::new(step(
        only(vec![eq(Field::Generation, p.generation.label())]),
        ChartConfig {
            label: detach(),
            geometry: Some(Geometry::Area),
            title: Some(generation_title(p, a)),
            ..Default::default()
        },
    )));

    // Slide 8: the reveal, one step per entry of the cohort schedule.
    let distribution_title = format!(
        "Distribution of {} Born Since 1950 ({})",
        p.g_type, p.iso3_code
    );
    let mut reveal = SlideSpec { steps: Vec::new() };
    for included in generation_expansion(p.generation) {
        let labels: Vec<String> = included.iter().map(|g| g.label().to_string()).collect();
        reveal.add_step(step(
            only(vec![
                eq(Field::Country, &p.country),
                Predicate::AnyOf(Field::Generation, labels),
                eq(Field::Gender, &p.gender),
            ]),
            ChartConfig {
                preset: Some(ChartPreset::StackedBar),
                x: one(Field::Population),
                color: one(Field::Generation),
                stacked_by: Some(Field::Generation),
                title: Some(distribution_title.clone()),
                ..Default::default()
            },
        ));
    }
    slides.push(reveal);

    // Slides 9-11: the same bar/stacked-bar pair at subregion, continent and
    // world level.
    let subregion_title = format!(
        "Distribution of All {} Born Since 1950 ({})",
        p.g_type, p.subregion
    );
    let subregion_filter = vec![
        eq(Field::Subregion, &p.subregion),
        Predicate::Present(Field::Generation),
        eq(Field::Gender, &p.gender),
    ];
    let mut slide9 = SlideSpec::new(step(
        only(subregion_filter.clone()),
        ChartConfig {
            preset: Some(ChartPreset::Bar),
            y: one(Field::Iso3Code),
            color: one(Field::Country),
            title: Some(subregion_title.clone()),
            ..Default::default()
        },
    ));
    slide9.add_step(step(
        only(subregion_filter),
        ChartConfig {
            preset: Some(ChartPreset::StackedBar),
            x: one(Field::Population),
            y: one(Field::Iso3Code),
            stacked_by: Some(Field::Generation),
            color: one(Field::Generation),
            title: Some(subregion_title),
            ..Default::default()
        },
    ));
    slides.push(slide9);

    let continent_title = format!(
        "Distribution of All {} Born Since 1950 ({})",
        p.g_type, p.continent
    );
    let continent_filter = vec![
        eq(Field::Continent, &p.continent),
        Predicate::Present(Field::Generation),
        eq(Field::Gender, &p.gender),
    ];
    let mut slide10 = SlideSpec::new(step(
        only(continent_filter.clone()),
        ChartConfig {
            preset: Some(ChartPreset::Bar),
            x: one(Field::Population),
            y: one(Field::Subregion),
            color: one(Field::Country),
            title: Some(continent_title.clone()),
            ..Default::default()
        },
    ));
    slide10.add_step(step(
        only(continent_filter),
        ChartConfig {
            preset: Some(ChartPreset::StackedBar),
            x: one(Field::Population),
            y: one(Field::Subregion),
            stacked_by: Some(Field::Generation),
            color: one(Field::Generation),
            title: Some(continent_title),
            ..Default::default()
        },
    ));
    slides.push(slide10);

    let world_distribution_title = format!(
        "Distribution of All {} Born Since 1950 Worldwide",
        p.g_type
    );
    let world_filter = vec![
        Predicate::Present(Field::Generation),
        eq(Field::Gender, &p.gender),
    ];
    let mut slide11 = SlideSpec::new(step(
        only(world_filter.clone()),
        ChartConfig {
            preset: Some(ChartPreset::Bar),
            x: one(Field::Continent),
            y: one(Field::Population),
            color: one(Field::Generation),
            title: Some(world_distribution_title.clone()),
            ..Default::default()
        },
    ));
    slide11.add_step(step(
        only(world_filter.clone()),
        ChartConfig {
            preset: Some(ChartPreset::StackedBar),
            x: one(Field::Continent),
            y: one(Field::Population),
            stacked_by: Some(Field::Generation),
            color: one(Field::Generation),
            title: Some(world_distribution_title),
            ..Default::default()
        },
    ));
    slides.push(slide11);

    // Slide 12: closing bubble view.
    slides.push(SlideSpec::new(step(
        only(world_filter),
        ChartConfig {
            preset: Some(ChartPreset::Bubble),
            size: one(Field::Population),
            geometry: Some(Geometry::Circle),
            color: one(Field::Generation),
            label: one(Field::Generation),
            title: Some(format!(
                "Distribution of All {}s Born Since 1950 Worldwide",
                p.gender
            )),
            ..Default::default()
        },
    )));

    StorySpec {
        slides,
        start_slide: None,
        tooltip: true,
    }
}
