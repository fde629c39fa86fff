use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roi_subset::api::{generate_subset_detailed, process_requests};
use roi_subset::core::params::SubsetConfig;
use roi_subset::io::boundary::{boundary_files, load_roi};
use roi_subset::io::{DataSource, LocalDirectorySource, ObjectStoreSource, TileIndex};
use roi_subset::types::{Inventory, SubsetRequest};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_source(args: &CliArgs) -> Result<Box<dyn DataSource>, AppError> {
    match (&args.source_dir, &args.bucket) {
        (Some(dir), None) => Ok(Box::new(LocalDirectorySource::new(dir)?)),
        (None, Some(bucket)) => {
            let mut source = ObjectStoreSource::s3_from_env(bucket)?;
            if let Some(prefix) = &args.prefix {
                source = source.with_prefix(prefix);
            }
            Ok(Box::new(source))
        }
        _ => Err(AppError::MissingSource),
    }
}

fn load_config(args: &CliArgs) -> Result<SubsetConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => SubsetConfig::from_json_file(path)?,
        None => SubsetConfig::default(),
    };
    if let Some(cell_size) = args.cell_size {
        config.cell_size_degrees = cell_size;
    }
    if args.buffer.is_some() {
        config.buffer_size_degrees = args.buffer;
    }
    if let Some(crs) = &args.target_crs {
        config.target_crs = crs.clone();
    }
    if args.no_blank {
        config.allow_blank = false;
    }
    Ok(config)
}

fn print_inventory(inventory: &Inventory) {
    let years: Vec<String> = inventory.years.iter().map(|y| y.to_string()).collect();
    println!("years: {}", years.join(", "));
    for date in &inventory.dates {
        println!("{}", date.format(roi_subset::types::DATE_DIRECTORY_FORMAT));
    }
}

fn request_dates(args: &CliArgs, source: &dyn DataSource) -> Result<Vec<NaiveDate>, AppError> {
    if let Some(date) = args.date {
        return Ok(vec![date]);
    }
    let dates = source
        .inventory()
        .dates_between(args.start_year, args.end_year);
    if dates.is_empty() {
        return Err(AppError::NoDates);
    }
    info!("processing {} inventory dates", dates.len());
    Ok(dates)
}

fn build_requests(
    args: &CliArgs,
    boundaries: &[PathBuf],
    dates: &[NaiveDate],
) -> Result<Vec<SubsetRequest>, AppError> {
    let mut requests = Vec::new();
    for boundary in boundaries {
        let roi = load_roi(boundary, args.acres)?;
        for &date in dates {
            for variable in &args.variables {
                requests.push(SubsetRequest::in_directory(
                    roi.clone(),
                    date,
                    variable.as_str(),
                    &args.output_dir,
                ));
            }
        }
    }

    if let Some(output) = &args.output {
        if requests.len() != 1 {
            return Err(AppError::AmbiguousOutput {
                requests: requests.len(),
            });
        }
        requests[0].output = output.clone();
    }
    Ok(requests)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        init_logging();
    }

    let source = open_source(&args)?;
    if args.inventory {
        print_inventory(&source.inventory());
        return Ok(());
    }

    let boundary = args.boundary.clone().ok_or(AppError::MissingArgument {
        arg: "--boundary".to_string(),
    })?;
    let tiles = args.tiles.clone().ok_or(AppError::MissingArgument {
        arg: "--tiles".to_string(),
    })?;
    if args.variables.is_empty() {
        return Err(AppError::MissingArgument {
            arg: "--variable".to_string(),
        }
        .into());
    }

    let config = load_config(&args)?;
    let selector = TileIndex::from_geojson_file(&tiles)?;
    let boundaries = boundary_files(&boundary)?;
    if boundaries.is_empty() {
        warn!("no boundary files found in {:?}", boundary);
        return Ok(());
    }
    let dates = request_dates(&args, source.as_ref())?;
    let requests = build_requests(&args, &boundaries, &dates)?;

    fs::create_dir_all(&args.output_dir)?;
    info!("Output directory: {:?}", args.output_dir);

    if let [request] = requests.as_slice() {
        let outcome = generate_subset_detailed(source.as_ref(), &selector, request, &config)
            .map_err(AppError::from)?;
        if outcome.from_cache {
            info!("Subset already exists: {:?}", request.output);
        } else {
            info!(
                "Successfully wrote {:?} from {} tile(s)",
                request.output,
                outcome.tiles.len()
            );
        }
        return Ok(());
    }

    info!("Starting batch of {} subset requests", requests.len());
    let report = process_requests(source.as_ref(), &selector, &requests, &config);
    info!("Batch processing complete!");
    info!("Processed: {}", report.processed);
    info!("Cached: {}", report.cached);
    info!("Errors: {}", report.errors);

    if report.errors > 0 {
        return Err(AppError::BatchFailed {
            errors: report.errors,
            total: requests.len(),
        }
        .into());
    }
    Ok(())
}
