// ============================================================================
// encq-cli/src/output.rs
// ============================================================================
//
// TERMINAL OUTPUT: Queue Listing, Lifecycle Events and the Progress Bar
//
// Everything the user sees comes through here. Lines printed while a bar is
// on screen go through `ProgressBar::println` so the bar is redrawn below them.

use std::fmt::Display;
use std::time::Duration;

use encq_core::{Job, JobId, JobStatus, ProgressSnapshot, QueueEvent};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use owo_colors::OwoColorize;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:30.cyan/blue}] {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Print a heading with colored styling and clear separation
pub fn print_heading(text: &str) {
    let heading = format!(" {text} ").bold().bright_white().to_string();
    let line = "=".repeat(50).bright_blue().to_string();
    println!("\n{line}\n{heading}\n{line}\n");
}

/// Print an info line with label and value, with the label colored
pub fn print_info<T: Display>(label: &str, value: T) {
    println!("{}: {}", label.bright_cyan(), value);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".bold().bright_red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message.yellow());
}

/// Numbered queue listing; the numbers are what `up`, `down` and `remove` take.
pub fn format_queue(jobs: &[Job], paused: bool) -> String {
    if jobs.is_empty() {
        return "Queue is empty".to_string();
    }
    let mut lines: Vec<String> = jobs
        .iter()
        .enumerate()
        .map(|(index, job)| format!("{:>3}. {}", index + 1, job))
        .collect();
    if paused {
        lines.push("(queue paused)".to_string());
    }
    lines.join("\n")
}

fn status_colored(status: JobStatus, text: &str) -> String {
    match status {
        JobStatus::Finished => text.bright_green().to_string(),
        JobStatus::Cancelled => text.yellow().to_string(),
        JobStatus::Running => text.bright_cyan().to_string(),
        JobStatus::Waiting => text.to_string(),
    }
}

/// Renders queue events and the live progress of the running job.
#[derive(Default)]
pub struct Terminal {
    bar: Option<ProgressBar>,
    job: Option<JobId>,
    total_frames: Option<u64>,
    seen_version: u64,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last progress version drawn, for `ProgressCell::wait_newer`.
    pub fn seen_version(&self) -> u64 {
        self.seen_version
    }

    /// Prints a line without tearing the progress bar.
    pub fn println(&self, line: impl AsRef<str>) {
        match &self.bar {
            Some(bar) if !bar.is_hidden() => bar.println(line.as_ref()),
            _ => println!("{}", line.as_ref()),
        }
    }

    pub fn show_queue(&self, jobs: &[Job], paused: bool) {
        self.println(format_queue(jobs, paused));
    }

    fn start_bar(&mut self, id: JobId, title: &str, total_frames: Option<u64>) {
        self.finish_bar();
        let bar = match total_frames {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓▒░ "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        if !console::user_attended() {
            bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }
        bar.set_message(format!("Starting {title}"));
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bar = Some(bar);
        self.job = Some(id);
        self.total_frames = total_frames;
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.job = None;
        self.total_frames = None;
    }

    /// Draws the newest progress sample if it belongs to the job on screen.
    pub fn show_progress(&mut self, version: u64, snapshot: Option<&ProgressSnapshot>) {
        self.seen_version = version;
        let Some(snapshot) = snapshot else {
            return;
        };
        if self.job != Some(snapshot.job_id) {
            return;
        }
        if let Some(bar) = &self.bar {
            let sample = &snapshot.sample;
            if let (Some(total), Some(done)) = (self.total_frames, sample.frames_done) {
                bar.set_position(done.min(total));
            }
            bar.set_message(sample.to_string());
            if !console::user_attended() {
                debug!("{sample}");
            }
        }
    }

    /// Prints one lifecycle event. `lookup` fetches job details by id.
    pub fn show_event(&mut self, event: &QueueEvent, lookup: impl Fn(JobId) -> Option<Job>) {
        match event {
            QueueEvent::JobStarted { id, title } => {
                let total_frames = lookup(*id).and_then(|job| job.total_frames());
                self.println(format!("{} {}", "▶ Started".bold().bright_cyan(), title));
                self.start_bar(*id, title, total_frames);
            }
            QueueEvent::Preamble { text, .. } => {
                for line in text.lines() {
                    self.println(line.dimmed().to_string());
                }
            }
            QueueEvent::StopRequested { id } => {
                let title = lookup(*id).map(|job| job.title().to_string()).unwrap_or_default();
                self.println(format!("{} {}", "■ Stopping".bold().yellow(), title));
            }
            QueueEvent::JobFailed { error, .. } => {
                self.println(format!("{} {}", "Error:".bold().bright_red(), error));
            }
            QueueEvent::SizeReport { report, .. } => {
                self.println(report.to_string().bright_green().to_string());
            }
            QueueEvent::JobFinished { status, summary, .. } => {
                self.finish_bar();
                println!("{}", status_colored(*status, &summary.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encq_core::{ProgressLine, ProgressSample};

    fn job(title: &str) -> Job {
        Job::new(title, vec!["ffmpeg".to_string()], format!("{title}_new.mkv"))
    }

    #[test]
    fn test_format_empty_queue() {
        assert_eq!(format_queue(&[], false), "Queue is empty");
    }

    #[test]
    fn test_format_queue_numbers_jobs() {
        let jobs = [job("a.mkv"), job("b.mkv")];
        let listing = format_queue(&jobs, true);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("  1. ⏱ waiting | a.mkv - "));
        assert!(lines[1].starts_with("  2. ⏱ waiting | b.mkv - "));
        assert_eq!(lines[2], "(queue paused)");
    }

    fn snapshot(job_id: JobId, frame: u64) -> ProgressSnapshot {
        let line = ProgressLine {
            frame: Some(frame),
            ..Default::default()
        };
        ProgressSnapshot {
            job_id,
            sample: ProgressSample::derive(line, Some(1000), Duration::from_secs(12)),
        }
    }

    #[test]
    fn test_progress_for_other_job_is_ignored() {
        let running = job("a.mkv").with_total_frames(Some(1000));
        let id = running.id();
        let mut terminal = Terminal::new();
        terminal.show_event(
            &QueueEvent::JobStarted {
                id,
                title: "a.mkv".to_string(),
            },
            |_| Some(running.clone()),
        );

        terminal.show_progress(7, Some(&snapshot(JobId::new(), 500)));
        assert_eq!(terminal.seen_version(), 7);
        let bar = terminal.bar.as_ref().unwrap();
        assert_eq!(bar.position(), 0);
        assert_eq!(bar.message(), "Starting a.mkv");

        terminal.show_progress(8, Some(&snapshot(id, 120)));
        let bar = terminal.bar.as_ref().unwrap();
        assert_eq!(bar.position(), 120);
        assert!(bar.message().starts_with("frame: 120/1000 | "));
    }

    #[test]
    fn test_cleared_progress_only_advances_version() {
        let mut terminal = Terminal::new();
        terminal.show_progress(3, None);
        assert_eq!(terminal.seen_version(), 3);
        assert!(terminal.bar.is_none());
    }
}
