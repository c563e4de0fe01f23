// ============================================================================
// encq-cli/src/commands.rs
// ============================================================================
//
// INTERACTIVE COMMANDS: Queue Control from Standard Input
//
// While the queue runs, one command per stdin line edits it:
//
//   list | pause | resume | stop | up N | down N | remove N | quit | help
//
// N is the 1-based position shown by `list`. `stop` kills the running encode
// and pauses the queue so the next job does not start right away.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use encq_core::{JobId, SupervisorHandle};

pub const HELP: &str = "commands: list | pause | resume | stop | up N | down N | remove N | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCommand {
    List,
    Pause,
    Resume,
    Stop,
    Up(usize),
    Down(usize),
    Remove(usize),
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({HELP})", self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for QueueCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| ParseCommandError("empty command".to_string()))?
            .to_ascii_lowercase();
        let position = words.next();
        if let Some(extra) = words.next() {
            return Err(ParseCommandError(format!("unexpected argument `{extra}`")));
        }

        let simple = |command| match position {
            None => Ok(command),
            Some(arg) => Err(ParseCommandError(format!("unexpected argument `{arg}`"))),
        };
        let positional = |make: fn(usize) -> QueueCommand| match position {
            Some(arg) => parse_position(arg).map(make),
            None => Err(ParseCommandError(format!("`{name}` needs a position"))),
        };

        let command = match name.as_str() {
            "list" | "ls" => simple(QueueCommand::List)?,
            "pause" => simple(QueueCommand::Pause)?,
            "resume" => simple(QueueCommand::Resume)?,
            "stop" => simple(QueueCommand::Stop)?,
            "quit" | "exit" | "q" => simple(QueueCommand::Quit)?,
            "help" | "?" => simple(QueueCommand::Help)?,
            "up" => positional(QueueCommand::Up)?,
            "down" => positional(QueueCommand::Down)?,
            "remove" | "rm" => positional(QueueCommand::Remove)?,
            _ => return Err(ParseCommandError(format!("unknown command `{name}`"))),
        };
        Ok(command)
    }
}

fn parse_position(arg: &str) -> Result<usize, ParseCommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseCommandError(format!("`{arg}` is not a queue position"))),
    }
}

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Print the queue listing.
    ShowQueue,
    /// Print a confirmation line.
    Message(String),
    /// Leave the run loop.
    Quit,
}

/// Id of the job at 1-based `position` in the listing.
fn job_at(handle: &SupervisorHandle, position: usize) -> Result<JobId> {
    handle
        .queue()
        .snapshot()
        .get(position - 1)
        .map(|job| job.id())
        .ok_or_else(|| anyhow!("no job at position {position}"))
}

/// Applies `command` to the queue.
pub fn apply(command: QueueCommand, handle: &SupervisorHandle) -> Result<CommandOutcome> {
    let queue = handle.queue();
    let outcome = match command {
        QueueCommand::List => CommandOutcome::ShowQueue,
        QueueCommand::Help => CommandOutcome::Message(HELP.to_string()),
        QueueCommand::Pause => {
            handle.pause();
            CommandOutcome::Message("Queue paused after the current job".to_string())
        }
        QueueCommand::Resume => {
            handle.resume();
            CommandOutcome::Message("Queue resumed".to_string())
        }
        QueueCommand::Stop => {
            // Pause first so the supervisor never picks up the next job.
            queue.pause();
            match handle.request_stop() {
                Some(_) => CommandOutcome::Message(
                    "Stopping the current encode, queue paused".to_string(),
                ),
                None => CommandOutcome::Message("Nothing is encoding, queue paused".to_string()),
            }
        }
        QueueCommand::Up(position) => {
            let id = job_at(handle, position)?;
            queue
                .move_up(id)
                .with_context(|| format!("cannot move job {position} up"))?;
            CommandOutcome::ShowQueue
        }
        QueueCommand::Down(position) => {
            let id = job_at(handle, position)?;
            queue
                .move_down(id)
                .with_context(|| format!("cannot move job {position} down"))?;
            CommandOutcome::ShowQueue
        }
        QueueCommand::Remove(position) => {
            let id = job_at(handle, position)?;
            let job = queue
                .remove(id)
                .with_context(|| format!("cannot remove job {position}"))?;
            CommandOutcome::Message(format!("Removed {}", job.title()))
        }
        QueueCommand::Quit => CommandOutcome::Quit,
    };
    Ok(outcome)
}
