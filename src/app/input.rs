use std::io::{self, BufRead, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal,
};

/// Where the operator loop gets its lines from. `Ok(None)` means the input
/// is closed.
pub trait LineSource {
    /// `prompt` has already been written by the caller; sources that redraw
    /// the line use it to repaint.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Line editor for an interactive terminal with Up/Down history.
/// Ctrl+C and Ctrl+D close the input.
#[derive(Debug, Default)]
pub struct TerminalLineSource {
    history: Vec<String>,
}

impl TerminalLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_raw(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        let mut input = String::new();
        let mut history_index = self.history.len();

        loop {
            let Event::Key(key_event) = event::read()? else {
                continue;
            };
            if key_event.kind != KeyEventKind::Press {
                continue;
            }

            match key_event.code {
                KeyCode::Enter => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(Some(input));
                }
                KeyCode::Char('c') | KeyCode::Char('d')
                    if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
                {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(None);
                }
                KeyCode::Up => {
                    if history_index > 0 {
                        history_index -= 1;
                        input = self.history[history_index].clone();
                        redraw(&mut stdout, prompt, &input)?;
                    }
                }
                KeyCode::Down => {
                    if history_index < self.history.len() {
                        history_index += 1;
                        input = self
                            .history
                            .get(history_index)
                            .cloned()
                            .unwrap_or_default();
                        redraw(&mut stdout, prompt, &input)?;
                    }
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    write!(stdout, "{}", c)?;
                    stdout.flush()?;
                }
                KeyCode::Backspace => {
                    input.pop();
                    redraw(&mut stdout, prompt, &input)?;
                }
                _ => {}
            }
        }
    }
}

impl LineSource for TerminalLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        terminal::enable_raw_mode()?;
        let line = self.read_raw(prompt);
        terminal::disable_raw_mode()?;

        let line = line?;
        if let Some(input) = &line {
            if !input.trim().is_empty() {
                self.history.push(input.clone());
            }
        }
        Ok(line)
    }
}

fn redraw(stdout: &mut io::Stdout, prompt: &str, input: &str) -> io::Result<()> {
    execute!(
        stdout,
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine)
    )?;
    write!(stdout, "{}{}", prompt, input)?;
    stdout.flush()
}

/// Reads plain lines, for piped or scripted input.
pub struct PlainLineSource<R> {
    reader: R,
}

impl<R: BufRead> PlainLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for PlainLineSource<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn plain_source_strips_line_endings_and_reports_eof() {
        let mut source = PlainLineSource::new(Cursor::new("3\r\n  5\n"));

        assert_eq!(source.read_line("> ").unwrap(), Some("3".to_string()));
        assert_eq!(source.read_line("> ").unwrap(), Some("  5".to_string()));
        assert_eq!(source.read_line("> ").unwrap(), None);
    }
}
