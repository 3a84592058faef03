//! Interactive y/N confirmation

use crate::core::traits::Prompter;
use async_trait::async_trait;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Whether an answer line means "yes".
///
/// Only the single letter `y`, in either case, is affirmative. The line
/// terminator is stripped but other whitespace is kept, so `" y"` declines.
pub fn is_affirmative(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("y")
}

/// Prompter that prints the question to stdout and reads one answer line
pub struct LinePrompter<R> {
    reader: Mutex<R>,
}

impl LinePrompter<BufReader<Stdin>> {
    /// Prompter reading answers from standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R> LinePrompter<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

#[async_trait]
impl<R> Prompter for LinePrompter<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn confirm(&self, message: &str) -> std::io::Result<bool> {
        let mut stdout = io::stdout();
        stdout.write_all(format!("{} (y/N): ", message).as_bytes()).await?;
        stdout.flush().await?;

        let mut answer = String::new();
        // End of input reads zero bytes and declines
        self.reader.lock().await.read_line(&mut answer).await?;

        Ok(is_affirmative(&answer))
    }
}
