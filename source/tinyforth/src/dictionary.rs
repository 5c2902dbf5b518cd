use alloc::{collections::BTreeSet, vec::Vec};
use core::fmt;

use crate::{fastr::FaStr, Cell, WordFunc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryError {
    /// No room for another entry.
    Full,
    /// No room in the code space for another compiled cell.
    CodeSpaceFull,
    /// An `EntryId` or code offset that doesn't belong to this dictionary.
    InvalidEntry,
}

/// Stable handle to a dictionary entry. Entries are never removed, so an
/// `EntryId` stays valid for the lifetime of the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryId(u16);

impl EntryId {
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// One compiled cell of a colon definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Execute the given entry.
    Call(EntryId),
    /// Push the value.
    Literal(Cell),
}

pub enum EntryKind<T: 'static> {
    /// Native code.
    Primitive(WordFunc<T>),
    /// Pushes the value.
    Constant(Cell),
    /// Pushes the address of the variable's cell.
    Variable(Cell),
    /// A colon definition, `len` cells of the code space starting at `start`.
    Colon { start: u16, len: u16 },
}

impl<T: 'static> Clone for EntryKind<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for EntryKind<T> {}

impl<T: 'static> fmt::Debug for EntryKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Primitive(_) => f.write_str("Primitive"),
            EntryKind::Constant(val) => f.debug_tuple("Constant").field(val).finish(),
            EntryKind::Variable(addr) => f.debug_tuple("Variable").field(addr).finish(),
            EntryKind::Colon { start, len } => f
                .debug_struct("Colon")
                .field("start", start)
                .field("len", len)
                .finish(),
        }
    }
}

// Starting FORTH: page 220
pub struct DictionaryEntry<T: 'static> {
    pub name: FaStr,
    pub kind: EntryKind<T>,
}

/// An entry of a static builtin table, see [`Forth::FULL_BUILTINS`].
///
/// [`Forth::FULL_BUILTINS`]: crate::Forth::FULL_BUILTINS
pub struct BuiltinEntry<T: 'static> {
    pub name: FaStr,
    pub func: WordFunc<T>,
}

/// The dictionary: an append-only table of entries, plus the code space
/// that holds the bodies of colon definitions.
pub struct Dictionary<T: 'static> {
    entries: Vec<DictionaryEntry<T>>,
    code: Vec<Code>,
    max_entries: usize,
    max_code: usize,
}

impl<T: 'static> Dictionary<T> {
    pub fn new(max_entries: usize, max_code: usize) -> Self {
        // Handles and code offsets are u16s.
        let max_entries = max_entries.min(usize::from(u16::MAX));
        let max_code = max_code.min(usize::from(u16::MAX));
        Self {
            entries: Vec::with_capacity(max_entries),
            code: Vec::new(),
            max_entries,
            max_code,
        }
    }

    /// Appends an entry. An existing entry with the same name stays in the
    /// table, but is shadowed from now on.
    pub fn push(&mut self, name: FaStr, kind: EntryKind<T>) -> Result<EntryId, DictionaryError> {
        self.ensure_room()?;
        let id = u16::try_from(self.entries.len()).map_err(|_| DictionaryError::Full)?;
        self.entries.push(DictionaryEntry { name, kind });
        Ok(EntryId(id))
    }

    /// Checks that one more entry would fit.
    #[inline]
    pub fn ensure_room(&self) -> Result<(), DictionaryError> {
        if self.entries.len() >= self.max_entries {
            return Err(DictionaryError::Full);
        }
        Ok(())
    }

    /// Finds the newest entry with the given name.
    pub fn find(&self, name: &FaStr) -> Option<EntryId> {
        self.entries
            .iter()
            .rposition(|de| &de.name == name)
            .map(|idx| EntryId(idx as u16))
    }

    pub fn get(&self, id: EntryId) -> Option<&DictionaryEntry<T>> {
        self.entries.get(id.index())
    }

    pub fn kind(&self, id: EntryId) -> Option<EntryKind<T>> {
        self.get(id).map(|de| de.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every entry, shadowed ones included, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &DictionaryEntry<T>> + '_ {
        self.entries.iter()
    }

    /// Iterates over the names that can still be looked up, in definition
    /// order. A redefined name shows up once, where it was last defined.
    pub fn live_names(&self) -> impl Iterator<Item = &FaStr> + '_ {
        // Newest first, keeping the first sighting of each name
        let mut seen = BTreeSet::new();
        let mut live = self
            .entries
            .iter()
            .rev()
            .filter(|de| seen.insert(de.name.as_str()))
            .map(|de| &de.name)
            .collect::<Vec<_>>();
        live.reverse();
        live.into_iter()
    }

    /// Offset of the next cell to be compiled.
    pub fn here(&self) -> u16 {
        // `max_code` is clamped to `u16::MAX`.
        self.code.len() as u16
    }

    pub fn push_code(&mut self, code: Code) -> Result<(), DictionaryError> {
        if self.code.len() >= self.max_code {
            return Err(DictionaryError::CodeSpaceFull);
        }
        self.code.push(code);
        Ok(())
    }

    /// Drops every compiled cell at or after `start`. Used to discard an
    /// abandoned definition.
    pub fn truncate_code(&mut self, start: u16) {
        self.code.truncate(usize::from(start));
    }

    pub fn code_at(&self, offset: u16) -> Option<Code> {
        self.code.get(usize::from(offset)).copied()
    }

    /// The compiled body of a colon definition.
    pub fn body(&self, id: EntryId) -> Option<&[Code]> {
        match self.kind(id)? {
            EntryKind::Colon { start, len } => {
                let start = usize::from(start);
                self.code.get(start..start + usize::from(len))
            }
            _ => None,
        }
    }

    pub fn code_used(&self) -> usize {
        self.code.len()
    }
}

#[cfg(test)]
pub mod test {
    use super::{Code, Dictionary, DictionaryError, EntryKind};
    use crate::fastr::FaStr;

    fn name(s: &str) -> FaStr {
        FaStr::new(s).unwrap()
    }

    #[test]
    fn shadowing() {
        let mut dict = Dictionary::<()>::new(8, 8);
        let first = dict.push(name("x"), EntryKind::Constant(1)).unwrap();
        let _other = dict.push(name("y"), EntryKind::Constant(2)).unwrap();
        assert_eq!(dict.find(&name("X")), Some(first));

        let second = dict.push(name("X"), EntryKind::Constant(3)).unwrap();
        assert_eq!(dict.find(&name("x")), Some(second));
        assert!(matches!(dict.kind(second), Some(EntryKind::Constant(3))));
        // The old entry is still there, just unreachable by name
        assert!(matches!(dict.kind(first), Some(EntryKind::Constant(1))));
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.entries().count(), 3);

        let live = dict.live_names().map(FaStr::as_str).collect::<Vec<_>>();
        assert_eq!(live, ["Y", "X"]);

        dict.push(name("y"), EntryKind::Constant(4)).unwrap();
        dict.push(name("z"), EntryKind::Constant(5)).unwrap();
        dict.push(name("x"), EntryKind::Constant(6)).unwrap();
        let live = dict.live_names().map(FaStr::as_str).collect::<Vec<_>>();
        assert_eq!(live, ["Y", "Z", "X"]);

        assert_eq!(dict.find(&name("w")), None);
    }

    #[test]
    fn full() {
        let mut dict = Dictionary::<()>::new(2, 2);
        dict.push(name("a"), EntryKind::Variable(0)).unwrap();
        dict.push(name("b"), EntryKind::Variable(1)).unwrap();
        assert_eq!(dict.ensure_room(), Err(DictionaryError::Full));
        assert_eq!(
            dict.push(name("c"), EntryKind::Variable(2)).unwrap_err(),
            DictionaryError::Full
        );

        dict.push_code(Code::Literal(1)).unwrap();
        dict.push_code(Code::Literal(2)).unwrap();
        assert_eq!(
            dict.push_code(Code::Literal(3)),
            Err(DictionaryError::CodeSpaceFull)
        );
    }

    #[test]
    fn code_space() {
        let mut dict = Dictionary::<()>::new(8, 16);
        let lit = dict.push(name("one"), EntryKind::Constant(1)).unwrap();

        let start = dict.here();
        dict.push_code(Code::Call(lit)).unwrap();
        dict.push_code(Code::Literal(2)).unwrap();
        let len = dict.here() - start;
        let colon = dict.push(name("three"), EntryKind::Colon { start, len }).unwrap();
        assert_eq!(
            dict.body(colon),
            Some(&[Code::Call(lit), Code::Literal(2)][..])
        );
        assert_eq!(dict.body(lit), None);

        // An abandoned definition leaves no trace in the code space
        let abandoned = dict.here();
        dict.push_code(Code::Literal(99)).unwrap();
        dict.truncate_code(abandoned);
        assert_eq!(dict.code_used(), 2);
        assert_eq!(dict.code_at(1), Some(Code::Literal(2)));
        assert_eq!(dict.code_at(2), None);
    }
}
