//! Command Line Interface (CLI) layer.
//!
//! Argument parsing (`args`), error types (`errors`) and the orchestration
//! logic (`runner`) that expands boundaries, dates and variables into subset
//! requests and runs them against a local or object-store tile archive.
//!
//! If you are embedding the pipeline into another application, prefer the
//! high-level `roi_subset::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
