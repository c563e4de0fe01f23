// ============================================================================
// encq-cli/src/run.rs
// ============================================================================
//
// RUN LOOP: Wiring the CLI to the Queue Supervisor
//
// 1. Set up logging and the queue configuration.
// 2. Locate ffmpeg, probe every input and build one job per input.
// 3. Start the supervisor thread and enqueue the jobs.
// 4. Multiplex queue events, stdin commands and a redraw tick until the queue
//    drains or the user quits.
// 5. On quit, stop the running encode, shut the supervisor down and join it.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, never, select, tick, unbounded};
use encq_core::{
    Job, JobStatus, MediaInfoInspector, NotificationHandler, NtfyNotificationSender,
    QueueConfigBuilder, Supervisor, SupervisorHandle, SystemSpawner, format_elapsed,
    locate_ffmpeg,
};
use log::{debug, info, warn};

use crate::cli::Cli;
use crate::commands::{self, CommandOutcome, QueueCommand};
use crate::jobs::{JobTemplate, build_jobs};
use crate::logging;
use crate::output::{self, Terminal};

const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

/// Reads stdin lines on a detached thread. The receiver disconnects at EOF.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("encq-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Nothing left to run and nobody holding the queue open.
fn queue_drained(handle: &SupervisorHandle) -> bool {
    let queue = handle.queue();
    !queue.is_paused() && !queue.has_pending()
}

/// Label/value rows of the end-of-run summary.
fn totals(jobs: &[Job], elapsed: Duration) -> Vec<(&'static str, String)> {
    let count = |status: JobStatus| jobs.iter().filter(|job| job.status() == status).count();

    let mut rows = vec![
        ("Finished", count(JobStatus::Finished).to_string()),
        ("Cancelled", count(JobStatus::Cancelled).to_string()),
    ];
    let abandoned = count(JobStatus::Waiting);
    if abandoned > 0 {
        rows.push(("Not started", abandoned.to_string()));
    }
    rows.push(("Total time", format_elapsed(elapsed.as_secs_f64())));
    rows
}

fn print_totals(handle: &SupervisorHandle, started: Instant) {
    output::print_heading("Queue Summary");
    for (label, value) in totals(&handle.queue().snapshot(), started.elapsed()) {
        output::print_info(label, value);
    }
}

/// Runs the whole queue for the parsed command line.
pub fn run_queue(cli: Cli) -> Result<()> {
    let started = Instant::now();
    let level = logging::level_for(cli.verbose);
    match &cli.log_dir {
        Some(dir) => {
            let log_file = logging::log_file_path(dir);
            logging::setup_file_logging(&log_file, level)?;
            output::print_info("Log file", log_file.display());
        }
        None => logging::init_console(level),
    }

    let mut builder = QueueConfigBuilder::new();
    if cli.paused {
        builder = builder.start_paused(true);
    }
    if let Some(topic) = &cli.ntfy {
        builder = builder.ntfy_topic(topic.clone());
    }
    let config = builder.build()?;
    debug!("Queue configuration: {config:?}");

    let ffmpeg = locate_ffmpeg(cli.ffmpeg.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let template = JobTemplate {
        ffmpeg,
        output_dir: cli.output_dir.clone(),
        test_frames: cli.test_frames,
        encoder_args: cli.encoder_args.clone(),
    };
    let inspector = MediaInfoInspector::new(&config.mediainfo_path);
    let jobs = build_jobs(&template, &inspector, &cli.inputs)?;

    let (supervisor, handle) = Supervisor::from_config(&config, SystemSpawner);
    if let Some(topic) = &config.ntfy_topic {
        let sender = NtfyNotificationSender::new(topic)?;
        handle
            .events()
            .add_handler(Arc::new(NotificationHandler::new(sender)));
        info!("Sending notifications to {topic}");
    }
    let events = handle.events().subscribe();
    for job in jobs {
        handle.queue().enqueue(job)?;
    }

    output::print_heading("encq");
    let mut terminal = Terminal::new();
    terminal.show_queue(&handle.queue().snapshot(), handle.queue().is_paused());
    terminal.println(commands::HELP);

    let worker = supervisor.spawn()?;
    let mut input = spawn_stdin_reader()?;
    let redraw = tick(REDRAW_INTERVAL);
    let progress = handle.events().progress();

    loop {
        let commands_rx = input.clone();
        select! {
            recv(events) -> event => match event {
                Ok(event) => {
                    terminal.show_event(&event, |id| handle.queue().get(id));
                }
                Err(_) => {
                    warn!("Supervisor stopped unexpectedly");
                    break;
                }
            },
            recv(commands_rx) -> line => match line {
                Ok(line) => match line.parse::<QueueCommand>() {
                    Ok(command) => match commands::apply(command, &handle) {
                        Ok(CommandOutcome::ShowQueue) => terminal
                            .show_queue(&handle.queue().snapshot(), handle.queue().is_paused()),
                        Ok(CommandOutcome::Message(message)) => terminal.println(message),
                        Ok(CommandOutcome::Quit) => break,
                        Err(e) => output::print_warning(&format!("{e:#}")),
                    },
                    Err(e) => output::print_warning(&e.to_string()),
                },
                Err(_) => {
                    if handle.queue().is_paused() {
                        warn!("stdin closed while the queue is paused, exiting");
                        break;
                    }
                    debug!("stdin closed, queue commands disabled");
                    input = never();
                }
            },
            recv(redraw) -> _ => {
                if let Some((version, latest)) =
                    progress.wait_newer(terminal.seen_version(), Duration::ZERO)
                {
                    terminal.show_progress(version, latest.as_ref());
                }
                if queue_drained(&handle) {
                    break;
                }
            },
        }
    }

    if let Some(id) = handle.request_stop() {
        info!("Stopping job {id} before exit");
    }
    handle.shutdown();
    worker
        .join()
        .map_err(|_| anyhow!("supervisor thread panicked"))?;
    for event in events.try_iter() {
        terminal.show_event(&event, |id| handle.queue().get(id));
    }

    print_totals(&handle, started);
    Ok(())
}
