// ============================================================================
// encq-cli/src/jobs.rs
// ============================================================================
//
// JOB CONSTRUCTION: Turning Input Files into Encoder Commands
//
// Each input becomes one job running
//
//   ffmpeg -i <input> -y [-vframes N] <encoder args> <output>
//
// The output sits next to the input (or in --output-dir) as <stem>_new.mkv,
// with the suffix repeated until the name is free so nothing is overwritten.
// A name is taken when it exists on disk or was handed to an earlier job of
// the same run.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use encq_core::{Job, MediaInspector, SourceInfo, probe_source};
use log::{debug, info};

const OUTPUT_SUFFIX: &str = "_new";
const OUTPUT_EXTENSION: &str = "mkv";

/// Settings shared by every job built in one run.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    pub ffmpeg: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub test_frames: Option<u64>,
    pub encoder_args: Vec<String>,
}

/// First `<stem>_new[_new...].mkv` path in `dir` that neither exists nor is
/// in `claimed`.
pub fn output_path_for(
    input: &Path,
    output_dir: Option<&Path>,
    claimed: &HashSet<PathBuf>,
) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut stem: OsString = input
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));

    loop {
        stem.push(OUTPUT_SUFFIX);
        let mut name = stem.clone();
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        let candidate = dir.join(name);
        if !candidate.exists() && !claimed.contains(&candidate) {
            return candidate;
        }
    }
}

/// Full encoder command line, program first.
pub fn build_command(template: &JobTemplate, input: &Path, output: &Path) -> Vec<String> {
    let mut command = vec![
        template.ffmpeg.to_string_lossy().into_owned(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-y".to_string(),
    ];
    if let Some(frames) = template.test_frames {
        command.push("-vframes".to_string());
        command.push(frames.to_string());
    }
    command.extend(template.encoder_args.iter().cloned());
    command.push(output.to_string_lossy().into_owned());
    command
}

/// Builds the job for an already probed source. The chosen output path is
/// added to `claimed`.
pub fn job_for_source(
    template: &JobTemplate,
    source: &SourceInfo,
    claimed: &mut HashSet<PathBuf>,
) -> Result<Job> {
    if !source.has_video {
        bail!("{} has no video track", source.path.display());
    }

    let output = output_path_for(&source.path, template.output_dir.as_deref(), claimed);
    claimed.insert(output.clone());
    let command = build_command(template, &source.path, &output);
    debug!("Job command for {}: {}", source.display_name, command.join(" "));

    // A test encode stops at the frame limit, so that is the denominator.
    let total_frames = template.test_frames.or(source.frame_count);

    Ok(Job::new(source.display_name.clone(), command, output)
        .with_total_frames(total_frames)
        .with_source_video_bytes(source.video_stream_bytes))
}

/// Probes every input and builds its job, stopping at the first input that
/// cannot be queued.
pub fn build_jobs(
    template: &JobTemplate,
    inspector: &dyn MediaInspector,
    inputs: &[PathBuf],
) -> Result<Vec<Job>> {
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut claimed = HashSet::new();
    for input in inputs {
        if !input.is_file() {
            bail!("Input file not found: {}", input.display());
        }
        let source = probe_source(inspector, input)?;
        info!(
            "Queued {} ({} frames, {}x{})",
            source.display_name,
            source
                .frame_count
                .map_or_else(|| "?".to_string(), |frames| frames.to_string()),
            source.width.map_or_else(|| "?".to_string(), |w| w.to_string()),
            source.height.map_or_else(|| "?".to_string(), |h| h.to_string()),
        );
        jobs.push(job_for_source(template, &source, &mut claimed)?);
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encq_core::{CoreResult, MediaTrack};
    use tempfile::tempdir;

    fn template() -> JobTemplate {
        JobTemplate {
            ffmpeg: PathBuf::from("ffmpeg"),
            output_dir: None,
            test_frames: None,
            encoder_args: vec!["-c:v".to_string(), "libx265".to_string()],
        }
    }

    fn source(path: &Path, has_video: bool) -> SourceInfo {
        SourceInfo {
            path: path.to_path_buf(),
            display_name: "movie.mkv".to_string(),
            has_video,
            frame_count: Some(1000),
            video_stream_bytes: Some(104_857_600),
            frame_rate: Some(25.0),
            width: Some(1920),
            height: Some(1080),
            duration_ms: Some(40_000),
        }
    }

    struct VideoInspector;

    impl MediaInspector for VideoInspector {
        fn inspect(&self, _path: &Path) -> CoreResult<Vec<MediaTrack>> {
            Ok(vec![MediaTrack {
                track_type: "Video".to_string(),
                frame_count: Some(500),
                stream_size_bytes: Some(1024),
                ..Default::default()
            }])
        }
    }

    #[test]
    fn test_output_next_to_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mp4");
        assert_eq!(
            output_path_for(&input, None, &HashSet::new()),
            dir.path().join("movie_new.mkv")
        );
    }

    #[test]
    fn test_output_suffix_repeats_until_free() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        std::fs::write(dir.path().join("movie_new.mkv"), b"").unwrap();
        std::fs::write(dir.path().join("movie_new_new.mkv"), b"").unwrap();
        assert_eq!(
            output_path_for(&input, None, &HashSet::new()),
            dir.path().join("movie_new_new_new.mkv")
        );
    }

    #[test]
    fn test_output_dir_override() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("encoded");
        let path = output_path_for(Path::new("/videos/movie.mkv"), Some(&out), &HashSet::new());
        assert_eq!(path, out.join("movie_new.mkv"));
    }

    #[test]
    fn test_command_layout() {
        let command = build_command(
            &template(),
            Path::new("in.mkv"),
            Path::new("in_new.mkv"),
        );
        assert_eq!(
            command,
            ["ffmpeg", "-i", "in.mkv", "-y", "-c:v", "libx265", "in_new.mkv"]
        );
    }

    #[test]
    fn test_command_with_frame_limit() {
        let template = JobTemplate {
            test_frames: Some(300),
            encoder_args: Vec::new(),
            ..template()
        };
        let command = build_command(&template, Path::new("in.mkv"), Path::new("out.mkv"));
        assert_eq!(
            command,
            ["ffmpeg", "-i", "in.mkv", "-y", "-vframes", "300", "out.mkv"]
        );
    }

    #[test]
    fn test_job_for_source() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        let mut claimed = HashSet::new();
        let job = job_for_source(&template(), &source(&input, true), &mut claimed).unwrap();
        assert_eq!(job.title(), "movie.mkv");
        assert_eq!(job.total_frames(), Some(1000));
        assert_eq!(job.source_video_bytes(), Some(104_857_600));
        assert_eq!(job.output_path(), dir.path().join("movie_new.mkv"));
        assert_eq!(job.command().last().map(String::as_str), job.output_path().to_str());
        assert!(claimed.contains(job.output_path()));
    }

    #[test]
    fn test_frame_limit_becomes_total() {
        let dir = tempdir().unwrap();
        let template = JobTemplate {
            test_frames: Some(250),
            ..template()
        };
        let source = source(&dir.path().join("m.mkv"), true);
        let job = job_for_source(&template, &source, &mut HashSet::new()).unwrap();
        assert_eq!(job.total_frames(), Some(250));
    }

    #[test]
    fn test_source_without_video_refused() {
        let err = job_for_source(
            &template(),
            &source(Path::new("a.flac"), false),
            &mut HashSet::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no video track"));
    }

    #[test]
    fn test_build_jobs_probes_each_input() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.mkv");
        let second = dir.path().join("b.mkv");
        std::fs::write(&first, b"x").unwrap();
        std::fs::write(&second, b"x").unwrap();

        let jobs = build_jobs(&template(), &VideoInspector, &[first, second]).unwrap();
        let titles: Vec<&str> = jobs.iter().map(|job| job.title()).collect();
        assert_eq!(titles, ["a.mkv", "b.mkv"]);
        assert!(jobs.iter().all(|job| job.total_frames() == Some(500)));
    }

    #[test]
    fn test_claimed_output_counts_as_taken() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        let claimed = HashSet::from([dir.path().join("movie_new.mkv")]);
        assert_eq!(
            output_path_for(&input, None, &claimed),
            dir.path().join("movie_new_new.mkv")
        );
    }

    #[test]
    fn test_same_stem_inputs_get_distinct_outputs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let first_dir = dir.path().join("s1");
        let second_dir = dir.path().join("s2");
        std::fs::create_dir_all(&first_dir).unwrap();
        std::fs::create_dir_all(&second_dir).unwrap();
        let first = first_dir.join("movie.mkv");
        let second = second_dir.join("movie.mkv");
        std::fs::write(&first, b"x").unwrap();
        std::fs::write(&second, b"x").unwrap();

        let template = JobTemplate {
            output_dir: Some(out.clone()),
            ..template()
        };
        let jobs = build_jobs(&template, &VideoInspector, &[first.clone(), second]).unwrap();
        assert_eq!(jobs[0].output_path(), out.join("movie_new.mkv"));
        assert_eq!(jobs[1].output_path(), out.join("movie_new_new.mkv"));

        // The same input listed twice is two jobs with two outputs.
        let jobs = build_jobs(&template, &VideoInspector, &[first.clone(), first]).unwrap();
        assert_ne!(jobs[0].output_path(), jobs[1].output_path());
    }

    #[test]
    fn test_build_jobs_missing_input() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.mkv");
        let err = build_jobs(&template(), &VideoInspector, &[missing]).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }
}
