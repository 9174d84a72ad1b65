use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use agentlink_tool_runtime::ProgressSink;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const TOOL_RESULT: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
}

/// Terminal output for tool results and progress.
#[derive(Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print a tool result to stdout: plain content on success, red on error.
    pub fn print_result(&self, content: &str, is_error: bool) -> Result<()> {
        let mut stdout = io::stdout();
        let color = if is_error { Colors::ERROR } else { Colors::TOOL_RESULT };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!("{}\n", content)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print JSON (definitions) uncolored so it can be piped.
    pub fn print_json(&self, value: &serde_json::Value) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", serde_json::to_string_pretty(value)?)?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        Ok(())
    }
}

/// Writes tool progress lines to stderr in a dim color.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn send(&self, line: &str) {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", line)),
            ResetColor,
        )
        .ok();
    }
}
