//! Pull-based command sources.
//!
//! The REPL reads commands from an [`InputSource`] and feeds them to the
//! same orchestrator entry point the HTTP endpoint uses.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::error::ChatError;

/// Something that yields user commands one at a time.
#[async_trait]
pub trait InputSource: Send {
    /// Next non-blank command, or `None` once the source is exhausted.
    async fn next_command(&mut self) -> Result<Option<String>, ChatError>;
}

/// Line-oriented source over any async reader.
pub struct LineSource<R> {
    lines: LinesStream<R>,
}

/// Commands typed on standard input.
pub type StdinSource = LineSource<BufReader<Stdin>>;

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LinesStream::new(reader.lines()),
        }
    }
}

impl StdinSource {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InputSource for LineSource<R> {
    async fn next_command(&mut self) -> Result<Option<String>, ChatError> {
        while let Some(line) = self.lines.next().await {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }
}

/// Replays a fixed list of commands.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    commands: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl InputSource for ScriptedSource {
    async fn next_command(&mut self) -> Result<Option<String>, ChatError> {
        Ok(self.commands.pop_front())
    }
}

/// True when the command ends an interactive session.
pub fn is_exit(command: &str) -> bool {
    command.to_lowercase().contains("exit")
}
