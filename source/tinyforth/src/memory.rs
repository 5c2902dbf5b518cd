use alloc::vec::Vec;

use crate::Cell;

/// Flat, cell-addressed memory.
///
/// Every address below the capacity reads as zero until it is written.
/// Backing storage is only grown as far as the highest address written so
/// far, so a generous capacity costs nothing until it's used.
pub struct Memory {
    cells: Vec<Cell>,
    capacity: usize,
    next_var: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    InvalidFetchAddress(Cell),
    InvalidStoreAddress(Cell),
    /// No addresses are left for `VARIABLE`.
    Full,
}

impl Memory {
    /// `variable_base` is the first address handed out by [`Memory::allot`].
    pub fn new(capacity: usize, variable_base: usize) -> Self {
        Self {
            cells: Vec::new(),
            capacity,
            next_var: variable_base,
        }
    }

    fn index(&self, addr: Cell) -> Option<usize> {
        let idx = usize::try_from(addr).ok()?;
        (idx < self.capacity).then_some(idx)
    }

    pub fn fetch(&self, addr: Cell) -> Result<Cell, MemoryError> {
        let idx = self
            .index(addr)
            .ok_or(MemoryError::InvalidFetchAddress(addr))?;
        Ok(self.cells.get(idx).copied().unwrap_or(0))
    }

    pub fn store(&mut self, addr: Cell, value: Cell) -> Result<(), MemoryError> {
        let idx = self
            .index(addr)
            .ok_or(MemoryError::InvalidStoreAddress(addr))?;
        if idx >= self.cells.len() {
            self.cells.resize(idx + 1, 0);
        }
        self.cells[idx] = value;
        Ok(())
    }

    /// Reserves a fresh cell for a variable. Addresses are never reused.
    pub fn allot(&mut self) -> Result<Cell, MemoryError> {
        if self.next_var >= self.capacity {
            return Err(MemoryError::Full);
        }
        let addr = Cell::try_from(self.next_var).map_err(|_| MemoryError::Full)?;
        self.next_var += 1;
        Ok(addr)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cells actually backed by storage.
    pub fn used(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
pub mod test {
    use super::{Memory, MemoryError};

    #[test]
    fn fetch_store() {
        let mut mem = Memory::new(1024, 512);
        assert_eq!(mem.fetch(300), Ok(0));
        assert_eq!(mem.used(), 0);

        mem.store(100, 42).unwrap();
        assert_eq!(mem.fetch(100), Ok(42));
        mem.store(100, 43).unwrap();
        assert_eq!(mem.fetch(100), Ok(43));
        assert_eq!(mem.fetch(99), Ok(0));
        assert_eq!(mem.used(), 101);

        mem.store(1023, 7).unwrap();
        assert_eq!(mem.fetch(1023), Ok(7));
    }

    #[test]
    fn bad_addresses() {
        let mut mem = Memory::new(16, 8);
        assert_eq!(mem.fetch(-5), Err(MemoryError::InvalidFetchAddress(-5)));
        assert_eq!(mem.store(-1, 123), Err(MemoryError::InvalidStoreAddress(-1)));
        assert_eq!(mem.fetch(16), Err(MemoryError::InvalidFetchAddress(16)));
        assert_eq!(mem.store(16, 1), Err(MemoryError::InvalidStoreAddress(16)));
        assert_eq!(mem.used(), 0);
    }

    #[test]
    fn allot() {
        let mut mem = Memory::new(4, 1);
        assert_eq!(mem.allot(), Ok(1));
        assert_eq!(mem.allot(), Ok(2));
        assert_eq!(mem.allot(), Ok(3));
        assert_eq!(mem.allot(), Err(MemoryError::Full));
        assert_eq!(mem.allot(), Err(MemoryError::Full));
        assert_eq!(mem.capacity(), 4);
    }
}
