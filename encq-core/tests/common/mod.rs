// Shared test doubles for the supervisor integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use encq_core::{
    CoreError, CoreResult, EncoderProcess, EventBus, Job, JobQueue, JobStatus, MediaInspector,
    MediaTrack, ProcessSpawner, QueueEvent, Supervisor, SupervisorHandle,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub const PROGRESS_120: &str =
    "frame=  120 fps= 45 q=28.0 size=   10240kB time=00:00:05.00 bitrate=16777.2kbits/s speed=1.87x";

/// What the next spawned process does.
pub enum Step {
    /// Prints these lines, then exits.
    Output(Vec<String>),
    /// Prints whatever the test sends, exits when the sender is dropped.
    Controlled(Receiver<String>),
    /// Cannot be started.
    SpawnError,
}

#[derive(Default)]
pub struct Counters {
    pub spawned: AtomicUsize,
    pub killed: AtomicUsize,
    pub waited: AtomicUsize,
}

/// Spawner that plays back scripted processes in order.
#[derive(Clone, Default)]
pub struct ScriptedSpawner {
    steps: Arc<Mutex<VecDeque<Step>>>,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    pub counters: Arc<Counters>,
}

impl ScriptedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn push_output(&self, lines: &[&str]) {
        self.push(Step::Output(lines.iter().map(|l| l.to_string()).collect()));
    }

    /// Queues a process driven through the returned sender.
    pub fn push_controlled(&self) -> Sender<String> {
        let (tx, rx) = unbounded();
        self.push(Step::Controlled(rx));
        tx
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().clone()
    }

    pub fn killed(&self) -> usize {
        self.counters.killed.load(Ordering::SeqCst)
    }

    pub fn waited(&self) -> usize {
        self.counters.waited.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProcess {
    lines: Receiver<String>,
    counters: Arc<Counters>,
}

impl EncoderProcess for ScriptedProcess {
    fn lines(&self) -> &Receiver<String> {
        &self.lines
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.counters.killed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<Option<i32>> {
        self.counters.waited.fetch_add(1, Ordering::SeqCst);
        Ok(Some(0))
    }
}

impl ProcessSpawner for ScriptedSpawner {
    type Process = ScriptedProcess;

    fn spawn(&self, command: &[String]) -> CoreResult<Self::Process> {
        self.commands.lock().push(command.to_vec());
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or(Step::Output(Vec::new()));

        let lines = match step {
            Step::Output(lines) => {
                let (tx, rx) = unbounded();
                for line in lines {
                    tx.send(line).unwrap();
                }
                rx
            }
            Step::Controlled(rx) => rx,
            Step::SpawnError => {
                return Err(encq_core::error::command_start_error(
                    command.join(" "),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
                ));
            }
        };

        self.counters.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedProcess {
            lines,
            counters: Arc::clone(&self.counters),
        })
    }
}

/// Inspector that reports a fixed video stream size, or fails.
pub struct StubInspector {
    video_bytes: Option<u64>,
    calls: AtomicUsize,
}

impl StubInspector {
    pub fn with_video_bytes(bytes: u64) -> Self {
        Self {
            video_bytes: Some(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            video_bytes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaInspector for StubInspector {
    fn inspect(&self, path: &Path) -> CoreResult<Vec<MediaTrack>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.video_bytes {
            Some(bytes) => Ok(vec![MediaTrack {
                track_type: "Video".to_string(),
                stream_size_bytes: Some(bytes),
                ..Default::default()
            }]),
            None => Err(CoreError::InspectionUnavailable(format!(
                "cannot read {}",
                path.display()
            ))),
        }
    }
}

pub fn job(title: &str) -> Job {
    Job::new(
        title,
        vec![
            "ffmpeg".to_string(),
            "-i".to_string(),
            title.to_string(),
            format!("{title}_new.mkv"),
        ],
        format!("{title}_new.mkv"),
    )
}

pub struct Harness {
    pub spawner: ScriptedSpawner,
    pub handle: SupervisorHandle,
    pub events: Receiver<QueueEvent>,
    pub worker: std::thread::JoinHandle<()>,
}

impl Harness {
    /// Starts a supervisor over a fresh queue.
    pub fn start(paused: bool, inspector: Option<Arc<dyn MediaInspector>>) -> Self {
        let spawner = ScriptedSpawner::new();
        let queue = Arc::new(JobQueue::new(paused));
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        let (supervisor, handle) = Supervisor::new(queue, bus, spawner.clone());
        let supervisor = match inspector {
            Some(inspector) => supervisor.with_inspector(inspector),
            None => supervisor,
        };
        let worker = supervisor.spawn().unwrap();
        Self {
            spawner,
            handle,
            events,
            worker,
        }
    }

    pub fn queue(&self) -> &JobQueue {
        self.handle.queue()
    }

    pub fn next_event(&self) -> QueueEvent {
        self.events
            .recv_timeout(TIMEOUT)
            .expect("timed out waiting for a queue event")
    }

    /// Collects events up to and including the next `JobFinished`.
    pub fn events_until_finished(&self) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        loop {
            let event = self.next_event();
            let done = matches!(event, QueueEvent::JobFinished { .. });
            events.push(event);
            if done {
                return events;
            }
        }
    }

    pub fn expect_started(&self) -> encq_core::JobId {
        match self.next_event() {
            QueueEvent::JobStarted { id, .. } => id,
            other => panic!("expected JobStarted, got {other:?}"),
        }
    }

    pub fn assert_quiet(&self, wait: Duration) {
        if let Ok(event) = self.events.recv_timeout(wait) {
            panic!("expected no event, got {event:?}");
        }
    }

    pub fn shutdown(self) {
        self.handle.shutdown();
        self.worker.join().unwrap();
    }
}

pub fn finished_status(events: &[QueueEvent]) -> Option<JobStatus> {
    events.iter().find_map(|event| match event {
        QueueEvent::JobFinished { status, .. } => Some(*status),
        _ => None,
    })
}

/// Event names in order, for asserting sequences.
pub fn kinds(events: &[QueueEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            QueueEvent::JobStarted { .. } => "started",
            QueueEvent::Preamble { .. } => "preamble",
            QueueEvent::StopRequested { .. } => "stop",
            QueueEvent::JobFailed { .. } => "failed",
            QueueEvent::SizeReport { .. } => "size",
            QueueEvent::JobFinished { .. } => "finished",
        })
        .collect()
}
