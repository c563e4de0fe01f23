// ============================================================================
// encq-core/src/external/process.rs
// ============================================================================
//
// ENCODER PROCESSES: Spawning the encoder and streaming its output
//
// The supervisor only sees the two traits below, so tests can hand it a
// scripted process instead of a real one.
//
// SystemSpawner launches the command with stdout and stderr piped and starts
// one reader thread per pipe. Both threads feed the same channel and split on
// '\r' as well as '\n', because the encoder redraws its stats line with a bare
// carriage return. The channel disconnects once both pipes hit EOF.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};

use crate::error::{CoreResult, command_start_error};

/// A running encoder.
pub trait EncoderProcess: Send {
    /// Merged stdout/stderr, one line per message. Disconnects at EOF.
    fn lines(&self) -> &Receiver<String>;

    /// Forcefully terminates the process. Does not wait for it.
    fn kill(&mut self) -> CoreResult<()>;

    /// Reaps the process and returns its exit code, if it had one.
    fn wait(&mut self) -> CoreResult<Option<i32>>;
}

/// Launches encoder processes from an argument vector (program first).
pub trait ProcessSpawner: Send + 'static {
    type Process: EncoderProcess;

    fn spawn(&self, command: &[String]) -> CoreResult<Self::Process>;
}

/// Spawns real child processes with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

/// A child process plus the channel its reader threads write to.
pub struct SystemProcess {
    child: Child,
    lines: Receiver<String>,
}

impl ProcessSpawner for SystemSpawner {
    type Process = SystemProcess;

    fn spawn(&self, command: &[String]) -> CoreResult<Self::Process> {
        let (program, args) = command.split_first().ok_or_else(|| {
            command_start_error(
                "",
                io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
            )
        })?;

        debug!("Spawning: {}", command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| command_start_error(command.join(" "), e))?;

        let (tx, rx) = unbounded();
        let readers = child
            .stdout
            .take()
            .map_or(Ok(()), |stdout| spawn_reader("stdout", stdout, tx.clone()))
            .and_then(|()| {
                child
                    .stderr
                    .take()
                    .map_or(Ok(()), |stderr| spawn_reader("stderr", stderr, tx))
            });
        if let Err(e) = readers {
            discard_child(&mut child);
            return Err(e);
        }

        Ok(SystemProcess { child, lines: rx })
    }
}

impl EncoderProcess for SystemProcess {
    fn lines(&self) -> &Receiver<String> {
        &self.lines
    }

    fn kill(&mut self) -> CoreResult<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn wait(&mut self) -> CoreResult<Option<i32>> {
        let status = self.child.wait()?;
        Ok(status.code())
    }
}

fn spawn_reader<R>(name: &str, source: R, tx: Sender<String>) -> CoreResult<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("encq-{name}"))
        .spawn(move || {
            if let Err(e) = forward_lines(BufReader::new(source), &tx) {
                warn!("Error reading encoder output: {e}");
            }
        })?;
    Ok(())
}

/// Kills and reaps a child that will never be handed to the supervisor.
fn discard_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            warn!("Failed to kill encoder process {}: {e}", child.id());
        }
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap encoder process {}: {e}", child.id());
    }
}

/// Sends every non-empty '\r' or '\n' terminated line of `reader` to `tx`.
fn forward_lines<R: BufRead>(mut reader: R, tx: &Sender<String>) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf.is_empty() {
            break;
        }

        let consumed = buf.len();
        for &byte in buf {
            if byte == b'\r' || byte == b'\n' {
                if !flush_line(&mut line, tx) {
                    return Ok(());
                }
            } else {
                line.push(byte);
            }
        }
        reader.consume(consumed);
    }
    flush_line(&mut line, tx);
    Ok(())
}

/// Returns `false` once nobody is listening any more.
fn flush_line(line: &mut Vec<u8>, tx: &Sender<String>) -> bool {
    if line.is_empty() {
        return true;
    }
    let text = String::from_utf8_lossy(line).into_owned();
    line.clear();
    tx.send(text).is_ok()
}
