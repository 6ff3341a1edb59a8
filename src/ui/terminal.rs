use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use secrecy::Secret;
use tokio::sync::mpsc;

/// Typed while scanning to leave the scanner. Never sent as a ticket code.
pub const QUIT_COMMAND: &str = "/quit";

pub fn is_quit_command(line: &str) -> bool {
    line.trim() == QUIT_COMMAND
}

/// Lines typed at the terminal.
///
/// Read on a plain thread so a pending read never holds up runtime shutdown.
pub struct Terminal {
    lines: mpsc::Receiver<String>,
}

impl Terminal {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }

    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Drops lines typed while a request was in flight. Returns how many.
    pub fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.lines.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded terminal input typed while busy");
        }
        dropped
    }
}

/// Prompts for one line. `None` at end of input.
///
/// Must not be used while a [`Terminal`] reader is running.
pub async fn prompt_line(label: &str) -> io::Result<Option<String>> {
    show_prompt(label)?;
    tokio::task::spawn_blocking(read_plain_line)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// Prompts for a secret without echoing it. `None` at end of input or Ctrl-C.
///
/// Must not be used while a [`Terminal`] reader is running.
pub async fn prompt_secret(label: &str) -> io::Result<Option<Secret<String>>> {
    show_prompt(label)?;
    let secret = tokio::task::spawn_blocking(read_secret_line)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    Ok(secret.map(Secret::new))
}

fn show_prompt(label: &str) -> io::Result<()> {
    print!("{}", label);
    io::stdout().flush()
}

fn read_plain_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn read_secret_line() -> io::Result<Option<String>> {
    // Piped input has no echo to hide
    if !io::stdin().is_terminal() {
        return read_plain_line();
    }

    enable_raw_mode()?;
    let result = read_keys_until_enter();
    disable_raw_mode()?;
    println!();
    result
}

fn read_keys_until_enter() -> io::Result<Option<String>> {
    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => return Ok(Some(secret)),
            KeyCode::Char('c') | KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None)
            }
            KeyCode::Char(c) => secret.push(c),
            KeyCode::Backspace => {
                secret.pop();
            }
            _ => {}
        }
    }
}
