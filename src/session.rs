// Transport-facing session loop
//
// Speaks newline-delimited JSON: one `join` line out, the initial map in,
// then one step state in and one `key` command out per step. The stream
// ending is a clean close.

use log::{error, info, warn};
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::bot::{AgentError, Bot};
use crate::debug_logger::DebugLogger;
use crate::types::{ClientMessage, GameInfo, StepState};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("server closed the connection before sending the map")]
    ClosedBeforeStart,
}

async fn send<W>(writer: &mut W, message: &ClientMessage) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Runs one session to completion and returns the number of moves sent.
///
/// A step whose observation cannot be decoded is skipped and logged; the
/// session keeps going with the next observation.
pub async fn run<R, W>(
    reader: R,
    mut writer: W,
    name: &str,
    bot: &mut Bot,
    logger: &DebugLogger,
) -> Result<u64, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send(&mut writer, &ClientMessage::Join { name: name.to_string() }).await?;

    let mut lines = reader.lines();
    let game: GameInfo = loop {
        match lines.next_line().await? {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break serde_json::from_str(&line)?,
            None => return Err(SessionError::ClosedBeforeStart),
        }
    };
    bot.start(&game)?;
    logger.log_start(game);

    let mut moves = 0u64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let started = Instant::now();

        let state: StepState = match serde_json::from_str(&line) {
            Ok(state) => state,
            Err(e) => {
                warn!("Skipping unreadable step message: {}", e);
                continue;
            }
        };

        match bot.decide(&state, started) {
            Ok(decision) => {
                send(&mut writer, &ClientMessage::key(decision.direction)).await?;
                logger.log_step(state, decision.direction);
                moves += 1;
            }
            Err(e) => error!("Step {} aborted: {}", state.step, e),
        }
    }

    info!("Server closed the session after {} moves", moves);
    bot.end();
    Ok(moves)
}
