use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Exactly one data source is required: --source-dir or --bucket")]
    MissingSource,

    #[error("--output needs a single boundary, date and variable ({requests} requests given)")]
    AmbiguousOutput { requests: usize },

    #[error("No acquisition dates to process")]
    NoDates,

    #[error("{errors} of {total} subset requests failed")]
    BatchFailed { errors: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Subset(#[from] roi_subset::Error),
}
