// encq-cli/src/cli.rs
//
// Defines the command-line argument structure using clap.

use clap::Parser;
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "encq: sequential encode queue",
    long_about = "Queues one ffmpeg encode per input file, runs them one at a time \
                  and shows live progress. Type `help` while it runs for queue commands."
)]
pub struct Cli {
    /// Input video files, one job each, encoded in the order given
    #[arg(required = true, value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Extra encoder arguments placed between the input and output (after `--`)
    #[arg(last = true, value_name = "ENCODER_ARGS", allow_hyphen_values = true)]
    pub encoder_args: Vec<String>,

    /// Directory where encoded files are written (defaults to each input's directory)
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Optional: Directory for log files. Logs go to the console when omitted.
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Optional: Path to the ffmpeg executable (defaults to the one on PATH)
    #[arg(long, value_name = "FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    // --- Notifications ---
    /// Optional: ntfy.sh topic URL for job notifications (e.g., https://ntfy.sh/your_topic)
    /// Can also be set via the ENCQ_NTFY_TOPIC environment variable.
    #[arg(long, value_name = "TOPIC_URL", env = "ENCQ_NTFY_TOPIC")]
    pub ntfy: Option<String>,

    /// Start with the queue paused; type `resume` to begin
    #[arg(long, default_value_t = false)]
    pub paused: bool,

    /// Encode only the first N frames of every input (test encode)
    #[arg(long, value_name = "FRAMES", value_parser = clap::value_parser!(u64).range(1..))]
    pub test_frames: Option<u64>,
}
