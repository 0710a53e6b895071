use clap::Parser;

/// This is a population data-story building program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The CSV file containing the population table. The expected
    /// columns and encoding are described in the documentation.
    #[clap(short, long, value_parser)]
    pub data: String,

    /// (1950-2024) The selected birth year.
    #[clap(short, long, value_parser = clap::value_parser!(i32).range(1950..=2024))]
    pub year: i32,

    /// The selected country. Must be one of the distinct Country values of
    /// the input table.
    #[clap(short, long, value_parser)]
    pub country: String,

    /// The selected gender. Must be one of the distinct Gender values of the
    /// input table.
    #[clap(short, long, value_parser)]
    pub gender: String,

    /// (default age-mates) The story variant to build: 'age-mates' or
    /// 'contemporaries'.
    #[clap(long, value_parser)]
    pub story: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the story will be written
    /// in JSON format to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, a standalone HTML export embedding
    /// the story will be written to the given location.
    #[clap(long, value_parser)]
    pub html: Option<String>,

    /// (file path) A reference file containing a story in JSON format. If
    /// provided, popstory will check that the built story matches the
    /// reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard
    /// output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
