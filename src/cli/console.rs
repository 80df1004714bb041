//! Line-oriented terminal I/O.
//!
//! Reads come from any `AsyncBufRead` so the interactive flows can be driven
//! by scripted input in tests; writes go to stdout.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Line that ends a multi-line answer (case-insensitive).
pub const END_OF_ANSWER: &str = "DONE";

pub struct Console<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next raw line, `None` at end of input.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }

    /// Print `text` without a newline and read the reply, trimmed.
    pub async fn prompt(&mut self, text: &str) -> std::io::Result<Option<String>> {
        print!("{text}");
        std::io::stdout().flush()?;
        Ok(self.read_line().await?.map(|l| l.trim().to_string()))
    }

    /// Prompt until the reply is one of `valid`. `None` at end of input.
    pub async fn choose(&mut self, text: &str, valid: &[&str]) -> std::io::Result<Option<String>> {
        loop {
            let Some(choice) = self.prompt(text).await? else {
                return Ok(None);
            };
            if valid.contains(&choice.as_str()) {
                return Ok(Some(choice));
            }
            println!("Invalid choice. Please try again.");
        }
    }

    /// Read lines until one reads `DONE` or input ends; returns them joined
    /// and trimmed.
    pub async fn read_multiline(&mut self) -> std::io::Result<String> {
        print!("> ");
        std::io::stdout().flush()?;

        let mut collected = Vec::new();
        while let Some(line) = self.read_line().await? {
            if line.trim().eq_ignore_ascii_case(END_OF_ANSWER) {
                break;
            }
            collected.push(line);
        }
        Ok(collected.join("\n").trim().to_string())
    }

    /// Wait for ENTER (or end of input).
    pub async fn pause(&mut self, text: &str) -> std::io::Result<()> {
        self.prompt(text).await?;
        Ok(())
    }
}
