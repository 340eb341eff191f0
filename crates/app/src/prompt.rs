//! Hidden password input on the terminal.

use std::{error::Error, io::Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};

type PromptResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const MAX_ATTEMPTS: usize = 3;

/// Restores cooked mode even when reading fails half-way.
struct RawMode;

impl RawMode {
    fn enable() -> PromptResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn say(message: &str) -> PromptResult<()> {
    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message)
    )?;
    out.flush()?;
    Ok(())
}

/// Reads one line without echoing it, printing `*` per character.
pub fn read_password(prompt: &str) -> PromptResult<String> {
    let _raw = RawMode::enable()?;
    say(prompt)?;

    let mut out = std::io::stderr();
    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => break,
            KeyCode::Backspace if secret.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                secret.push(ch);
                execute!(out, Print("*"))?;
            }
            _ => continue,
        }
        out.flush()?;
    }

    execute!(out, Print("\r\n"))?;
    Ok(secret)
}

/// Asks for a new password and its confirmation.
pub fn read_new_password() -> PromptResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let password = read_password("New password: ")?;
        if password.is_empty() {
            say("Password must not be empty.\r\n")?;
            continue;
        }
        if read_password("Repeat password: ")? == password {
            return Ok(password);
        }
        say("Passwords differ, try again.\r\n")?;
    }

    Err("too many attempts".into())
}
