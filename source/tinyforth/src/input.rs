use alloc::string::String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    TooLong,
    NonAscii,
}

/// Holds the line currently being interpreted, and hands it out one
/// whitespace-delimited word at a time.
pub struct WordStrBuf {
    buf: String,
    capacity: usize,
    cur: usize,
    cur_word: Option<(usize, usize)>,
}

impl WordStrBuf {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
            cur: 0,
            cur_word: None,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replaces the contents of the buffer with a new line, and rewinds to
    /// its start.
    ///
    /// Trailing line terminators are not counted against the capacity.
    pub fn fill(&mut self, input: &str) -> Result<(), InputError> {
        let input = input.trim_end_matches(['\r', '\n']);
        if input.len() > self.capacity {
            return Err(InputError::TooLong);
        }
        if !input.is_ascii() {
            return Err(InputError::NonAscii);
        }
        self.buf.clear();
        self.buf.push_str(input);
        self.cur = 0;
        self.cur_word = None;
        Ok(())
    }

    /// Empties the buffer, discarding any words that were not consumed yet.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.cur = 0;
        self.cur_word = None;
    }

    /// Moves to the next word. After the last word, [`Self::cur_word`]
    /// returns `None`.
    pub fn advance(&mut self) {
        self.cur_word = None;
        let bytes = self.buf.as_bytes();

        // Find the start, skipping any ASCII whitespace
        let start = match bytes[self.cur..]
            .iter()
            .position(|b| !b.is_ascii_whitespace())
        {
            Some(off) => self.cur + off,
            None => {
                self.cur = bytes.len();
                return;
            }
        };
        // Find the end, either the first ASCII whitespace, or the end of the buffer
        // This is ONE PAST the last character
        let end = bytes[start..]
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .map_or(bytes.len(), |off| start + off);

        self.cur = end;
        self.cur_word = Some((start, end));
    }

    pub fn cur_word(&self) -> Option<&str> {
        self.cur_word.map(|(start, end)| &self.buf[start..end])
    }

    /// The part of the line that has not been consumed yet.
    pub fn remaining(&self) -> &str {
        &self.buf[self.cur..]
    }
}

/// What the [`LineEditor`] did with a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// The byte was appended to the line.
    Pushed(u8),
    /// The last byte of the line was erased.
    Erased,
    /// The line is complete, see [`LineEditor::line`].
    Complete,
    /// The byte was dropped: a control character, a backspace on an empty
    /// line, or the LF of a CR LF pair.
    Ignored,
    /// The byte didn't fit, or wasn't ASCII. The line will be rejected
    /// with the given error when it completes.
    Rejected(InputError),
}

/// Assembles lines from a raw byte transport, such as a serial port or a
/// terminal in raw mode.
pub struct LineEditor {
    line: String,
    capacity: usize,
    complete: bool,
    after_cr: bool,
    error: Option<InputError>,
}

impl LineEditor {
    const BACKSPACE: u8 = 0x08;
    const DELETE: u8 = 0x7F;

    pub fn new(capacity: usize) -> Self {
        Self {
            line: String::with_capacity(capacity),
            capacity,
            complete: false,
            after_cr: false,
            error: None,
        }
    }

    pub fn push_byte(&mut self, byte: u8) -> Keystroke {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');
        if byte == b'\n' && after_cr {
            return Keystroke::Ignored;
        }
        if self.complete {
            self.line.clear();
            self.complete = false;
            self.error = None;
        }

        match byte {
            b'\r' | b'\n' => {
                self.complete = true;
                Keystroke::Complete
            }
            Self::BACKSPACE | Self::DELETE => match self.line.pop() {
                Some(_) => Keystroke::Erased,
                None => Keystroke::Ignored,
            },
            b'\t' | b' '..=b'~' if self.line.len() < self.capacity => {
                self.line.push(char::from(byte));
                Keystroke::Pushed(byte)
            }
            b'\t' | b' '..=b'~' => self.reject(InputError::TooLong),
            0x80..=0xFF => self.reject(InputError::NonAscii),
            _ => Keystroke::Ignored,
        }
    }

    // The first problem on a line is the one reported
    fn reject(&mut self, error: InputError) -> Keystroke {
        let error = *self.error.get_or_insert(error);
        Keystroke::Rejected(error)
    }

    /// The line assembled so far, or the completed line right after
    /// [`Keystroke::Complete`].
    ///
    /// Fails if a byte of the line had to be dropped, since what's left is
    /// not what was typed.
    pub fn line(&self) -> Result<&str, InputError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(&self.line),
        }
    }

    /// Whether there is an unfinished line.
    pub fn is_pending(&self) -> bool {
        !self.complete && (!self.line.is_empty() || self.error.is_some())
    }

    pub fn clear(&mut self) {
        self.line.clear();
        self.complete = false;
        self.after_cr = false;
        self.error = None;
    }
}
