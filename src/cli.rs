//! Terminal chat mode.
//!
//! Reads participant lines from stdin and prints the interviewer's replies.
//! The whole terminal session is one participant.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::intake::{IntakeError, Phase};
use crate::service::InterviewService;

pub const TERMINAL_PARTICIPANT: &str = "terminal_user";

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// Drive one interview over a line-oriented reader and writer until the
/// interview terminates or input runs out.
pub async fn run_chat<R, W>(service: &InterviewService, input: R, mut output: W) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(b"Type 'exit' to leave at any time.\n").await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let turn = service.handle_turn(TERMINAL_PARTICIPANT, message).await?;
        output.write_all(format!("Interviewer: {}\n", turn.reply).as_bytes()).await?;
        output.flush().await?;

        if turn.phase == Phase::Terminated {
            break;
        }
    }

    if service.registry().get(TERMINAL_PARTICIPANT)?.is_some() {
        service.end_interview(TERMINAL_PARTICIPANT).await?;
    }
    Ok(())
}
