use std::path::PathBuf;

/// Global lat/lon grid CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "globegrid", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file; missing keys take their defaults
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build the grid, join it to countries and cities, and persist the result
    Build(BuildArgs),

    /// Resolve a place or point to grid cells
    Lookup(LookupArgs),

    /// Produce a place-level time series for a gridded variable
    Series(SeriesArgs),

    /// List the known gridded variables
    Variables,
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Cell size in degrees; must evenly divide 180 and 360
    #[arg(short, long)]
    pub spacing: Option<f64>,

    /// Store directory, defaults to the configured store_dir
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// Cell size of the stored grid to query
    #[arg(short, long, global = true)]
    pub spacing: Option<f64>,

    /// Store directory, defaults to the configured store_dir
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub target: LookupTarget,
}

#[derive(clap::Subcommand, Debug)]
pub enum LookupTarget {
    /// Cells overlying a country
    Country {
        name: String,
    },

    /// Cells overlying a city
    City {
        name: String,

        /// Containing country, to disambiguate shared city names
        #[arg(long)]
        country: Option<String>,
    },

    /// Cell (and places) at a point
    Point {
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        #[arg(allow_negative_numbers = true)]
        lat: f64,
    },
}

#[derive(clap::Args, Debug)]
#[command(group(clap::ArgGroup::new("place").required(true).args(["country", "city"])))]
pub struct SeriesArgs {
    /// Variable key, e.g. air, slp, olr
    pub variable: String,

    /// Aggregate over the cells of this country
    #[arg(long)]
    pub country: Option<String>,

    /// Aggregate over the cells of this city
    #[arg(long)]
    pub city: Option<String>,

    /// Containing country of --city
    #[arg(long = "in", requires = "city")]
    pub city_country: Option<String>,

    /// Output CSV file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Group rows by this column; defaults to "month" with --monthly, else "time"
    #[arg(long)]
    pub time_key: Option<String>,

    /// Convert the variable from Celsius to Fahrenheit
    #[arg(long)]
    pub fahrenheit: bool,

    /// Reduce to per-calendar-month mean and standard deviation
    #[arg(long)]
    pub monthly: bool,

    /// Keep only the last N years of data
    #[arg(long)]
    pub last_years: Option<usize>,

    /// Cell size of the stored grid to use
    #[arg(short, long)]
    pub spacing: Option<f64>,

    /// Store directory, defaults to the configured store_dir
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub store: Option<PathBuf>,
}
