use crate::app::Message;
use crate::scheduler::Trigger;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

static VERBOSE: AtomicBool = AtomicBool::new(false);
static RAW_MODE: AtomicBool = AtomicBool::new(false);
static STATUS_LINE: AtomicBool = AtomicBool::new(false);

const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// line terminator for the current terminal mode, raw mode needs an explicit carriage return
pub fn line_end() -> &'static str {
    if RAW_MODE.load(Ordering::Relaxed) {
        "\r\n"
    } else {
        "\n"
    }
}

/// record whether an unterminated status line is on screen
pub fn set_status_line(active: bool) {
    STATUS_LINE.store(active, Ordering::Relaxed);
}

/// write one log line, clearing the status line first so the two don't mix
#[doc(hidden)]
pub fn emit(to_stderr: bool, text: &str) {
    if STATUS_LINE.swap(false, Ordering::Relaxed) {
        let _ = write!(io::stdout(), "\r\x1b[2K");
        let _ = io::stdout().flush();
    }
    if to_stderr {
        let _ = write!(io::stderr(), "{text}{}", line_end());
    } else {
        let _ = write!(io::stdout(), "{text}{}", line_end());
    }
}

#[macro_export]
macro_rules! warning {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        $crate::ui::emit(true, &format!($fmt $(, $($arg)*)?).yellow().to_string());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        $crate::ui::emit(true, &format!("{}", $expr).yellow().to_string());
    }};
}

#[macro_export]
macro_rules! error {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        $crate::ui::emit(true, &format!($fmt $(, $($arg)*)?).red().to_string());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        $crate::ui::emit(true, &format!("{}", $expr).red().to_string());
    }};
}

#[macro_export]
macro_rules! status {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        $crate::ui::emit(false, &format!($fmt $(, $($arg)*)?).green().to_string());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        $crate::ui::emit(false, &format!("{}", $expr).green().to_string());
    }};
}

#[macro_export]
macro_rules! info {
    () => {{
        $crate::ui::emit(false, "");
    }};
    // format string literal (with or without inline formatting or args)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        $crate::ui::emit(false, &format!($fmt $(, $($arg)*)?));
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        $crate::ui::emit(false, &format!("{}", $expr));
    }};
}

/// only printed with --verbose
#[macro_export]
macro_rules! debug {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        if $crate::ui::verbose() {
            use colored::Colorize;
            $crate::ui::emit(true, &format!($fmt $(, $($arg)*)?).dimmed().to_string());
        }
    }};
    ($expr:expr) => {{
        if $crate::ui::verbose() {
            use colored::Colorize;
            $crate::ui::emit(true, &format!("{}", $expr).dimmed().to_string());
        }
    }};
}

/// map a key press to an app message, None for keys we don't handle
pub fn message_for_key(
    code: crossterm::event::KeyCode,
    modifiers: crossterm::event::KeyModifiers,
) -> Option<Message> {
    use crossterm::event::{KeyCode, KeyModifiers};

    match code {
        KeyCode::Esc => Some(Message::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Message::Quit),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Some(Message::Quit),
            'r' => Some(Message::Trigger(Trigger::Manual)),
            'n' => Some(Message::SelectNext),
            'i' => Some(Message::ShowTooltip),
            _ => None,
        },
        _ => None,
    }
}

/// reads single key presses in raw mode and forwards them as messages
///
/// raw mode is enabled for the lifetime of the reader and restored on drop
pub struct KeyReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyReader {
    pub fn start(tx: Sender<Message>) -> Result<Self> {
        use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
        use crossterm::terminal::enable_raw_mode;

        enable_raw_mode().context("this command requires an interactive terminal")?;
        RAW_MODE.store(true, Ordering::Relaxed);

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("keys".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    match event::poll(KEY_POLL_INTERVAL) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(_) => break,
                    }
                    let Ok(Event::Key(KeyEvent {
                        code,
                        modifiers,
                        kind,
                        ..
                    })) = event::read()
                    else {
                        continue;
                    };
                    if kind != KeyEventKind::Press {
                        continue;
                    }
                    if let Some(message) = message_for_key(code, modifiers)
                        && tx.send(message).is_err()
                    {
                        break;
                    }
                }
            });

        match handle {
            Ok(handle) => Ok(Self {
                stop,
                handle: Some(handle),
            }),
            Err(e) => {
                restore_terminal();
                Err(e).context("failed to start key reader")
            }
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = crossterm::terminal::disable_raw_mode();
    RAW_MODE.store(false, Ordering::Relaxed);
}
