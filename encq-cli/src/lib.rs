// encq-cli/src/lib.rs
//
// Library portion of the encq CLI application.
// Contains argument definitions, job construction and the run loop.

pub mod cli;
pub mod commands;
pub mod jobs;
pub mod logging;
pub mod output;
pub mod run;

// Re-export items needed by the binary or integration tests
pub use cli::Cli;
pub use commands::{CommandOutcome, QueueCommand};
pub use jobs::{JobTemplate, build_command, build_jobs, output_path_for};
pub use run::run_queue;
