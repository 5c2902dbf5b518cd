use alloc::vec::Vec;

/// Collects everything a line prints, up to a fixed capacity.
pub struct OutputBuf {
    buf: Vec<u8>,
    capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    OutputFull,
}

impl OutputBuf {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push_bstr(&mut self, bstr: &[u8]) -> Result<(), OutputError> {
        if self.buf.len() + bstr.len() > self.capacity {
            return Err(OutputError::OutputFull);
        }
        self.buf.extend_from_slice(bstr);
        Ok(())
    }

    pub fn push_str(&mut self, stir: &str) -> Result<(), OutputError> {
        self.push_bstr(stir.as_bytes())
    }

    /// Starts a new printed item: if the output so far doesn't end in
    /// whitespace, a single space is pushed to separate the two.
    pub fn separate(&mut self) -> Result<(), OutputError> {
        match self.buf.last() {
            Some(b) if !b.is_ascii_whitespace() => self.push_bstr(b" "),
            _ => Ok(()),
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The output as text. `EMIT` can produce arbitrary bytes; only the
    /// leading valid UTF-8 is returned.
    pub fn as_str(&self) -> &str {
        match core::str::from_utf8(&self.buf) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.buf[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl core::fmt::Write for OutputBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.push_str(s).map_err(|_| core::fmt::Error)
    }
}
