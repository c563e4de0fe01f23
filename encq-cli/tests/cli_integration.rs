// encq-cli/tests/cli_integration.rs
//
// Builds jobs the way the binary does and runs them through a real
// supervisor. `true` stands in for ffmpeg so no encoder is needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use encq_cli::{Cli, JobTemplate, build_jobs};
use encq_core::{
    CoreResult, EventBus, JobQueue, JobStatus, MediaInspector, MediaTrack, QueueEvent, Supervisor,
    SystemSpawner,
};
use tempfile::tempdir;

struct FixedInspector {
    video: bool,
}

impl MediaInspector for FixedInspector {
    fn inspect(&self, _path: &Path) -> CoreResult<Vec<MediaTrack>> {
        let track_type = if self.video { "Video" } else { "Audio" };
        Ok(vec![MediaTrack {
            track_type: track_type.to_string(),
            frame_count: Some(240),
            stream_size_bytes: Some(2_097_152),
            ..Default::default()
        }])
    }
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"not really a video").unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn template_from(cli: &Cli, ffmpeg: &str) -> JobTemplate {
    JobTemplate {
        ffmpeg: PathBuf::from(ffmpeg),
        output_dir: cli.output_dir.clone(),
        test_frames: cli.test_frames,
        encoder_args: cli.encoder_args.clone(),
    }
}

#[test]
fn test_jobs_from_command_line() {
    let dir = tempdir().unwrap();
    let first = touch(dir.path(), "first.mkv");
    let second = touch(dir.path(), "second.mp4");
    let out = dir.path().join("out");

    let cli = Cli::try_parse_from([
        "encq",
        "--test-frames",
        "100",
        "--output-dir",
        path_str(&out),
        path_str(&first),
        path_str(&second),
        "--",
        "-crf",
        "24",
    ])
    .unwrap();

    let jobs = build_jobs(&template_from(&cli, "ffmpeg"), &FixedInspector { video: true }, &cli.inputs)
        .unwrap();

    let output = out.join("second_new.mkv");
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[1].output_path(), output);
    assert_eq!(jobs[1].total_frames(), Some(100));
    assert_eq!(jobs[1].source_video_bytes(), Some(2_097_152));
    let expected = [
        "ffmpeg",
        "-i",
        path_str(&second),
        "-y",
        "-vframes",
        "100",
        "-crf",
        "24",
        path_str(&output),
    ];
    assert_eq!(jobs[1].command(), expected);
}

#[test]
fn test_audio_only_input_refused() {
    let dir = tempdir().unwrap();
    let input = touch(dir.path(), "track.flac");
    let cli = Cli::try_parse_from(["encq", path_str(&input)]).unwrap();

    let err = build_jobs(&template_from(&cli, "ffmpeg"), &FixedInspector { video: false }, &cli.inputs)
        .unwrap_err();
    assert!(err.to_string().contains("no video track"));
}

#[cfg(unix)]
#[test]
fn test_built_jobs_run_in_order() {
    let dir = tempdir().unwrap();
    let inputs = [touch(dir.path(), "a.mkv"), touch(dir.path(), "b.mkv")];
    let cli = Cli::try_parse_from(["encq", path_str(&inputs[0]), path_str(&inputs[1])])
        .unwrap();
    let jobs = build_jobs(&template_from(&cli, "true"), &FixedInspector { video: true }, &cli.inputs)
        .unwrap();

    let bus = Arc::new(EventBus::new());
    let events = bus.subscribe();
    let (supervisor, handle) = Supervisor::new(Arc::new(JobQueue::default()), bus, SystemSpawner);
    let worker = supervisor.spawn().unwrap();
    let ids: Vec<_> = jobs
        .into_iter()
        .map(|job| handle.queue().enqueue(job).unwrap())
        .collect();

    let mut finished = Vec::new();
    while finished.len() < ids.len() {
        if let QueueEvent::JobFinished { id, status, .. } =
            events.recv_timeout(Duration::from_secs(10)).unwrap()
        {
            finished.push((id, status));
        }
    }

    assert_eq!(
        finished,
        [(ids[0], JobStatus::Finished), (ids[1], JobStatus::Finished)]
    );
    handle.shutdown();
    worker.join().unwrap();
}
