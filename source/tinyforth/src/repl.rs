//! The prompt-driven front end of a [`Forth`] VM.
//!
//! A [`Repl`] turns input lines, or raw bytes from a terminal, into the
//! text a user sees:
//!
//! ```text
//! Simple Forth Interpreter
//! ok>
//! 2 3 + .
//! 5
//! ok>
//! foo
//! Unknown word: foo
//! ok>
//! ```
//!
//! It never touches an actual I/O device; everything it prints is appended
//! to a caller-provided buffer.

use alloc::{string::String, string::ToString, vec::Vec};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    input::{InputError, Keystroke, LineEditor},
    Error, Forth,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplSettings {
    /// Printed once, by [`Repl::start`].
    #[serde(default = "ReplSettings::default_banner")]
    pub banner: String,
    #[serde(default = "ReplSettings::default_prompt")]
    pub prompt: String,
    /// Echo accepted keystrokes back, for transports that don't echo
    /// locally.
    #[serde(default)]
    pub echo: bool,
}

impl ReplSettings {
    fn default_banner() -> String {
        "Simple Forth Interpreter".into()
    }

    fn default_prompt() -> String {
        "ok>".into()
    }
}

impl Default for ReplSettings {
    fn default() -> Self {
        Self {
            banner: Self::default_banner(),
            prompt: Self::default_prompt(),
            echo: false,
        }
    }
}

pub struct Repl<T: 'static> {
    forth: Forth<T>,
    settings: ReplSettings,
    editor: LineEditor,
}

impl<T: 'static> Repl<T> {
    pub fn new(forth: Forth<T>, settings: ReplSettings) -> Self {
        let editor = LineEditor::new(forth.input.capacity());
        Self {
            forth,
            settings,
            editor,
        }
    }

    pub fn forth(&self) -> &Forth<T> {
        &self.forth
    }

    pub fn forth_mut(&mut self) -> &mut Forth<T> {
        &mut self.forth
    }

    pub fn settings(&self) -> &ReplSettings {
        &self.settings
    }

    /// Writes the banner and the first prompt.
    pub fn start(&mut self, out: &mut Vec<u8>) {
        push_line(out, &self.settings.banner);
        push_line(out, &self.settings.prompt);
    }

    /// Runs one line, and writes what it printed, the error message if it
    /// failed, and the next prompt.
    ///
    /// Errors only abort the rest of the line; the VM is ready for the next
    /// one either way. The error is returned for the caller's benefit.
    pub fn process_line(&mut self, line: &str, out: &mut Vec<u8>) -> Result<(), Error> {
        Self::run_line(&mut self.forth, &self.settings, Ok(line), out)
    }

    /// A line the editor had to reject is reported like any other failed
    /// line, without running any of it.
    fn run_line(
        forth: &mut Forth<T>,
        settings: &ReplSettings,
        line: Result<&str, InputError>,
        out: &mut Vec<u8>,
    ) -> Result<(), Error> {
        trace!(?line, "line");
        forth.output.clear();
        let res = match line.and_then(|line| forth.input.fill(line)) {
            Ok(()) => forth.process_line(),
            Err(e) => Err(e.into()),
        };

        let printed = forth.output.as_bytes();
        out.extend_from_slice(printed);
        if !printed.is_empty() && !printed.ends_with(b"\n") {
            out.push(b'\n');
        }
        forth.output.clear();

        if let Err(e) = &res {
            push_line(out, &e.to_string());
        }
        push_line(out, &settings.prompt);
        res
    }

    /// Feeds one byte from a raw transport through the line editor.
    ///
    /// Returns the outcome of the line when the byte completed one.
    pub fn push_byte(&mut self, byte: u8, out: &mut Vec<u8>) -> Option<Result<(), Error>> {
        match self.editor.push_byte(byte) {
            Keystroke::Pushed(b) => {
                if self.settings.echo {
                    out.push(b);
                }
                None
            }
            Keystroke::Erased => {
                if self.settings.echo {
                    out.extend_from_slice(b"\x08 \x08");
                }
                None
            }
            Keystroke::Complete => {
                if self.settings.echo {
                    out.push(b'\n');
                }
                Some(Self::run_line(
                    &mut self.forth,
                    &self.settings,
                    self.editor.line(),
                    out,
                ))
            }
            Keystroke::Ignored | Keystroke::Rejected(_) => None,
        }
    }

    /// Runs whatever is left in the line editor, for a transport that
    /// closed in the middle of a line.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Option<Result<(), Error>> {
        if !self.editor.is_pending() {
            return None;
        }
        let res = Self::run_line(&mut self.forth, &self.settings, self.editor.line(), out);
        self.editor.clear();
        Some(res)
    }

    pub fn release(self) -> Forth<T> {
        self.forth
    }
}

fn push_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.push(b'\n');
}
