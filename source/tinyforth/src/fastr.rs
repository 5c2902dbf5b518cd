use core::fmt;
use core::hash::Hasher as _;
use hash32::{FnvHasher, Hasher};

/// Longest word name that can be stored in the dictionary.
pub const MAX_NAME_LEN: usize = 31;

/// A "fast" word name.
///
/// Names are stored inline, normalized to uppercase, together with a
/// [`LenHash`] so that most mismatches are rejected by comparing a single
/// `u32`.
#[derive(Clone, Copy)]
pub struct FaStr {
    buf: [u8; MAX_NAME_LEN],
    len_hash: LenHash,
}

impl FaStr {
    /// Builds a name from a token, uppercasing it.
    ///
    /// Returns `None` if the token is empty, longer than [`MAX_NAME_LEN`]
    /// bytes, or not ASCII.
    pub fn new(stir: &str) -> Option<Self> {
        let bytes = stir.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_NAME_LEN || !bytes.is_ascii() {
            return None;
        }
        let mut buf = [0u8; MAX_NAME_LEN];
        for (dst, src) in buf.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        let len_hash = LenHash::from_bstr(&buf[..bytes.len()]);
        Some(Self { buf, len_hash })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len_hash.len()]
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from ASCII.
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn raw(&self) -> u32 {
        self.len_hash.inner
    }
}

impl PartialEq for FaStr {
    fn eq(&self, other: &Self) -> bool {
        // First, check the hash
        if self.len_hash.eq_ignore_bits(&other.len_hash) {
            // The hash matches, but there might be collisions. Do the strcmp
            // to make sure
            self.as_bytes().eq(other.as_bytes())
        } else {
            // If the hash doesn't match, it's definitely not equal.
            false
        }
    }
}

impl Eq for FaStr {}

impl fmt::Debug for FaStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for FaStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LenHash {
    // 29..32: 3-bit bitfield
    // 24..29: 5-bit len (0..31)
    // 00..24: 24-bit FnvHash
    inner: u32,
}

impl LenHash {
    const HASH_MASK: u32 = 0x00FF_FFFF;
    const BITS_MASK: u32 = 0xE000_0000;
    const LEN_MASK: u32 = 0x1F00_0000;

    /// Creates a new LenHash, considering UP TO 31 ascii characters.
    pub fn from_bstr(s: &[u8]) -> Self {
        let mut hasher = FnvHasher::default();
        let len = s.len().min(MAX_NAME_LEN);
        hasher.write(&s[..len]);
        let hash = hasher.finish32();
        let inner = ((len as u32) << 24) | (hash & Self::HASH_MASK);
        Self { inner }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let len_u32 = (self.inner & Self::LEN_MASK) >> 24;
        len_u32 as usize
    }

    pub fn eq_ignore_bits(&self, other: &Self) -> bool {
        (self.inner & !Self::BITS_MASK) == (other.inner & !Self::BITS_MASK)
    }
}

/// Builds a [`FaStr`] at compile time. Used for the builtin word table.
///
/// Panics (at compile time) if the name is empty or too long.
pub const fn comptime_fastr(s: &'static str) -> FaStr {
    let bytes = s.as_bytes();
    let len = bytes.len();
    assert!(len != 0);
    assert!(len <= MAX_NAME_LEN);

    let mut buf = [0u8; MAX_NAME_LEN];
    let mut hash = BASIS;
    let mut i = 0;
    while i < len {
        let upper = bytes[i].to_ascii_uppercase();
        buf[i] = upper;
        hash ^= upper as u32;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    FaStr {
        buf,
        len_hash: LenHash {
            inner: ((len as u32) << 24) | (hash & LenHash::HASH_MASK),
        },
    }
}

const BASIS: u32 = 0x811c_9dc5;
const PRIME: u32 = 0x0100_0193;
