use clap::Parser;
use std::path::PathBuf;

use chrono::NaiveDate;

/// Accepts `YYYY.MM.DD` (archive layout) or `YYYY-MM-DD`
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, roi_subset::types::DATE_DIRECTORY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{value}', expected YYYY.MM.DD or YYYY-MM-DD"))
}

#[derive(Parser, Debug)]
#[command(name = "roi-subset", version, about = "ROI raster subset CLI")]
pub struct CliArgs {
    /// ROI boundary: a GeoJSON file, or a directory of .geojson files
    #[arg(short, long)]
    pub boundary: Option<PathBuf>,

    /// Tile footprint index (GeoJSON FeatureCollection)
    #[arg(short, long)]
    pub tiles: Option<PathBuf>,

    /// Local tile archive root containing YYYY.MM.DD directories
    #[arg(long, conflicts_with = "bucket")]
    pub source_dir: Option<PathBuf>,

    /// S3 bucket holding the tile archive (credentials from AWS_* variables)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix of the archive inside the bucket
    #[arg(long, requires = "bucket")]
    pub prefix: Option<String>,

    /// Output directory for subsets
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file (single ROI, date and variable only)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Variable name(s), e.g. ET,PET
    #[arg(short, long = "variable", value_delimiter = ',')]
    pub variables: Vec<String>,

    /// Acquisition date; all inventory dates when omitted
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// First year to process when no date is given
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last year to process when no date is given
    #[arg(long)]
    pub end_year: Option<i32>,

    /// JSON subset config; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output cell size in degrees
    #[arg(long)]
    pub cell_size: Option<f64>,

    /// Buffer half-width in degrees (default: area-tiered)
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Target CRS of the output grid (e.g. EPSG:4326)
    #[arg(long)]
    pub target_crs: Option<String>,

    /// ROI area in acres, skipping the UTM area computation
    #[arg(long)]
    pub acres: Option<f64>,

    /// Fail instead of writing all-NaN subsets
    #[arg(long, default_value_t = false)]
    pub no_blank: bool,

    /// Print the years and dates available from the source and exit
    #[arg(long, default_value_t = false)]
    pub inventory: bool,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
