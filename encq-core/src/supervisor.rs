// ============================================================================
// encq-core/src/supervisor.rs
// ============================================================================
//
// SUPERVISOR: The single worker that runs queued jobs one at a time
//
// The supervisor owns its thread and everything that changes while a job
// runs: the encoder process and the parser state. Which job is current is
// read from the queue, under the same lock that marks it Running.
// Observers talk to it only through SupervisorHandle, which sends Control
// messages over a channel; nothing else reaches into the worker.
//
// While idle the worker blocks on two channels: control messages and the
// queue's "something changed" signal. While a job runs it blocks on the
// encoder's output lines and control messages, so a stop request interrupts
// the job as soon as it arrives instead of waiting for the next output line.
//
// Per-job failures never escape the loop. They are logged and reported as
// events, and the worker moves on to the next job. Only Shutdown (or every
// handle being dropped) ends it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use log::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::error::CoreResult;
use crate::events::{EventBus, JobSummary, QueueEvent, SizeReport};
use crate::external::{
    EncoderProcess, MediaInfoInspector, MediaInspector, ProcessSpawner, video_track,
};
use crate::job::{Job, JobId, JobStatus};
use crate::progress::{ProgressParser, ProgressSample, ProgressSnapshot};
use crate::queue::JobQueue;
use crate::utils::bytes_to_mib;

/// Messages consumed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Kill the given job if it is the one running. Ignored otherwise.
    CancelCurrent(JobId),
    Pause,
    Resume,
    /// Stop the worker. A running job is killed, waiting jobs are left alone.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Shutdown,
}

/// How the output stream of one job ended.
struct StreamOutcome {
    cancelled: bool,
    flow: Flow,
    frames_done: Option<u64>,
}

/// Observer-side handle. Cheap to clone.
#[derive(Clone)]
pub struct SupervisorHandle {
    control: Sender<Control>,
    queue: Arc<JobQueue>,
    events: Arc<EventBus>,
}

impl SupervisorHandle {
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The job the supervisor is running right now.
    pub fn current_job(&self) -> Option<JobId> {
        self.queue.running_id()
    }

    /// Asks the supervisor to kill whatever job is running.
    ///
    /// Returns the id of the job the request was aimed at, or `None` when
    /// nothing was running.
    pub fn request_stop(&self) -> Option<JobId> {
        let id = self.current_job()?;
        self.cancel(id);
        Some(id)
    }

    /// Kills job `id` if it is still the running one when the request is
    /// processed.
    pub fn cancel(&self, id: JobId) {
        self.send(Control::CancelCurrent(id));
    }

    pub fn pause(&self) {
        self.send(Control::Pause);
    }

    pub fn resume(&self) {
        self.send(Control::Resume);
    }

    pub fn shutdown(&self) {
        self.send(Control::Shutdown);
    }

    fn send(&self, control: Control) {
        if self.control.send(control).is_err() {
            debug!("Supervisor already stopped, dropping {control:?}");
        }
    }
}

pub struct Supervisor<S: ProcessSpawner> {
    queue: Arc<JobQueue>,
    events: Arc<EventBus>,
    spawner: S,
    parser: ProgressParser,
    inspector: Option<Arc<dyn MediaInspector>>,
    control: Receiver<Control>,
}

impl<S: ProcessSpawner> Supervisor<S> {
    /// Creates a supervisor over `queue` that reports to `events`, using the
    /// default progress prefix and no output inspection.
    pub fn new(queue: Arc<JobQueue>, events: Arc<EventBus>, spawner: S) -> (Self, SupervisorHandle) {
        let (control_tx, control_rx) = unbounded();
        let handle = SupervisorHandle {
            control: control_tx,
            queue: Arc::clone(&queue),
            events: Arc::clone(&events),
        };
        let supervisor = Self {
            queue,
            events,
            spawner,
            parser: ProgressParser::default(),
            inspector: None,
            control: control_rx,
        };
        (supervisor, handle)
    }

    /// Creates a fresh queue, event bus and supervisor from `config`.
    pub fn from_config(config: &QueueConfig, spawner: S) -> (Self, SupervisorHandle) {
        let queue = Arc::new(JobQueue::new(config.start_paused));
        let events = Arc::new(EventBus::new());
        let (supervisor, handle) = Self::new(queue, events, spawner);
        let supervisor = supervisor.with_parser(ProgressParser::new(config.progress_prefix.clone()));
        let supervisor = if config.inspect_output {
            supervisor.with_inspector(Arc::new(MediaInfoInspector::new(&config.mediainfo_path)))
        } else {
            supervisor
        };
        (supervisor, handle)
    }

    pub fn with_parser(mut self, parser: ProgressParser) -> Self {
        self.parser = parser;
        self
    }

    /// Enables the size report, inspecting outputs with `inspector`.
    pub fn with_inspector(mut self, inspector: Arc<dyn MediaInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Runs the worker loop on a new thread.
    pub fn spawn(self) -> CoreResult<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("encq-supervisor".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Runs jobs until shut down.
    pub fn run(self) {
        info!("Supervisor started");
        let changed = self.queue.changed();

        loop {
            if self.drain_control() == Flow::Shutdown {
                break;
            }

            if let Some(job) = self.queue.start_next() {
                if self.run_job(job) == Flow::Shutdown {
                    break;
                }
                continue;
            }

            select! {
                recv(self.control) -> msg => {
                    let flow = match msg {
                        Ok(control) => self.apply_idle(control),
                        Err(_) => Flow::Shutdown,
                    };
                    if flow == Flow::Shutdown {
                        break;
                    }
                }
                recv(changed) -> _ => {}
            }
        }

        let abandoned = self.queue.waiting_ids().len();
        if abandoned > 0 {
            info!("Supervisor stopped, {abandoned} waiting job(s) not run");
        } else {
            info!("Supervisor stopped");
        }
    }

    /// Handles every control message already queued. A disconnected channel
    /// means every handle is gone, which counts as a shutdown.
    fn drain_control(&self) -> Flow {
        loop {
            match self.control.try_recv() {
                Ok(control) => {
                    if self.apply_idle(control) == Flow::Shutdown {
                        return Flow::Shutdown;
                    }
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Shutdown,
            }
        }
    }

    fn apply_idle(&self, control: Control) -> Flow {
        match control {
            Control::CancelCurrent(id) => {
                debug!("Ignoring stop request for job {id}, nothing is running");
                Flow::Continue
            }
            Control::Pause => {
                self.queue.pause();
                info!("Queue paused");
                Flow::Continue
            }
            Control::Resume => {
                self.queue.resume();
                info!("Queue resumed");
                Flow::Continue
            }
            Control::Shutdown => Flow::Shutdown,
        }
    }

    fn run_job(&self, job: Job) -> Flow {
        let started = Instant::now();
        info!("Starting encode of {} ({})", job.title(), job.id());
        debug!("Command: {}", job.command_line());
        self.events.emit(QueueEvent::JobStarted {
            id: job.id(),
            title: job.title().to_string(),
        });

        let mut process = match self.spawner.spawn(job.command()) {
            Ok(process) => process,
            Err(e) => {
                error!("Could not start encoder for {}: {}", job.title(), e);
                self.events.emit(QueueEvent::JobFailed {
                    id: job.id(),
                    error: e.to_string(),
                });
                self.finish(&job, JobStatus::Cancelled, None, started);
                return Flow::Continue;
            }
        };

        let outcome = self.stream_output(&job, &process, started);

        if outcome.cancelled {
            if let Err(e) = process.kill() {
                warn!("Failed to kill encoder for {}: {}", job.title(), e);
            }
            info!("Stopped encode of {}", job.title());
            self.events.emit(QueueEvent::StopRequested { id: job.id() });
            self.finish(&job, JobStatus::Cancelled, outcome.frames_done, started);
            reap(&job, &mut process);
        } else {
            reap(&job, &mut process);
            self.finish(&job, JobStatus::Finished, outcome.frames_done, started);
        }

        outcome.flow
    }

    /// Reads the encoder's output until EOF or until the job is cancelled.
    ///
    /// Lines before the first progress line are collected into the preamble.
    /// After that every progress line is published; the first line that is not
    /// a progress line ends the progress phase and the rest is only logged.
    fn stream_output(&self, job: &Job, process: &S::Process, started: Instant) -> StreamOutcome {
        let lines = process.lines();
        let mut preamble: Option<Vec<String>> = Some(Vec::new());
        let mut progress_over = false;
        let mut outcome = StreamOutcome {
            cancelled: false,
            flow: Flow::Continue,
            frames_done: None,
        };

        loop {
            select! {
                recv(lines) -> line => {
                    let Ok(line) = line else { break };

                    if progress_over {
                        debug!("[{}] {}", job.title(), line);
                        continue;
                    }

                    match self.parser.parse(&line) {
                        Some(parsed) => {
                            if let Some(text) = preamble.take() {
                                self.emit_preamble(job, text);
                            }
                            if parsed.frame.is_some() {
                                outcome.frames_done = parsed.frame;
                            }
                            self.events.publish_progress(ProgressSnapshot {
                                job_id: job.id(),
                                sample: ProgressSample::derive(
                                    parsed,
                                    job.total_frames(),
                                    started.elapsed(),
                                ),
                            });
                        }
                        None => match preamble.as_mut() {
                            Some(text) => text.push(line),
                            None => {
                                debug!("Progress output of {} ended at: {}", job.title(), line);
                                progress_over = true;
                            }
                        },
                    }
                }
                recv(self.control) -> msg => match msg {
                    Ok(Control::CancelCurrent(id)) if id == job.id() => {
                        outcome.cancelled = true;
                        break;
                    }
                    Ok(Control::CancelCurrent(id)) => {
                        debug!("Ignoring stop request for job {id}, {} is running", job.id());
                    }
                    Ok(Control::Pause) => {
                        self.queue.pause();
                        info!("Queue paused, {} keeps running", job.title());
                    }
                    Ok(Control::Resume) => {
                        self.queue.resume();
                        info!("Queue resumed");
                    }
                    Ok(Control::Shutdown) | Err(_) => {
                        info!("Shutting down while {} is running", job.title());
                        outcome.cancelled = true;
                        outcome.flow = Flow::Shutdown;
                        break;
                    }
                }
            }
        }

        if let Some(text) = preamble {
            self.emit_preamble(job, text);
        }
        outcome
    }

    fn emit_preamble(&self, job: &Job, text: Vec<String>) {
        if text.is_empty() {
            return;
        }
        let text = text.join("\n");
        debug!("Encoder preamble for {}:\n{}", job.title(), text);
        self.events.emit(QueueEvent::Preamble { id: job.id(), text });
    }

    /// Records the terminal status and announces the end of the job.
    fn finish(&self, job: &Job, status: JobStatus, frames_done: Option<u64>, started: Instant) {
        let size_report = if status == JobStatus::Finished {
            self.size_report(job)
        } else {
            None
        };
        if let Some(report) = size_report {
            info!("{}: {}", job.title(), report);
            self.events.emit(QueueEvent::SizeReport {
                id: job.id(),
                report,
            });
        }

        if let Err(e) = self.queue.complete(job.id(), status) {
            error!("Could not record final status of {}: {}", job.title(), e);
        }
        self.events.clear_progress();

        let summary = JobSummary {
            title: job.title().to_string(),
            status,
            duration: started.elapsed(),
            frames_done,
            size_report,
        };
        info!("{}", summary);
        self.events.emit(QueueEvent::JobFinished {
            id: job.id(),
            status,
            summary,
        });
    }

    /// Compares the output's video stream with the source's. Any missing
    /// piece silently skips the report.
    fn size_report(&self, job: &Job) -> Option<SizeReport> {
        let inspector = self.inspector.as_ref()?;
        let source_bytes = job.source_video_bytes()?;

        let tracks = match inspector.inspect(job.output_path()) {
            Ok(tracks) => tracks,
            Err(e) => {
                debug!("Skipping size report for {}: {}", job.title(), e);
                return None;
            }
        };
        let Some(output_bytes) = video_track(&tracks).and_then(|track| track.stream_size_bytes) else {
            debug!(
                "Skipping size report for {}: no video stream size in {}",
                job.title(),
                job.output_path().display()
            );
            return None;
        };

        SizeReport::from_sizes(bytes_to_mib(source_bytes), bytes_to_mib(output_bytes))
    }
}

/// Waits for the encoder to exit so no process outlives its job.
fn reap<P: EncoderProcess>(job: &Job, process: &mut P) {
    match process.wait() {
        Ok(Some(0)) => debug!("Encoder for {} exited cleanly", job.title()),
        Ok(Some(code)) => warn!("Encoder for {} exited with code {}", job.title(), code),
        Ok(None) => debug!("Encoder for {} was terminated by a signal", job.title()),
        Err(e) => warn!("Failed to wait for encoder of {}: {}", job.title(), e),
    }
}
