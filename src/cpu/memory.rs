//! LS-8 memory subsystem.
//!
//! A flat array of byte cells. The program is loaded at address 0 and the
//! stack grows downward from [`STACK_BASE`](crate::cpu::registers::STACK_BASE)
//! through the same cells; nothing separates the two regions.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells in the LS-8.
pub const MEMORY_SIZE: usize = 128;

/// LS-8 memory: 128 byte cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Number of addressable cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; memory is allocated once at its full size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read the cell at `addr`.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange(addr))
    }

    /// Write `value` to the cell at `addr`.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let cell = self.cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange(addr))?;
        *cell = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program into memory starting at `start_addr`.
    ///
    /// Nothing is written if the program does not fit.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        let available = MEMORY_SIZE.saturating_sub(start_addr);
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start_addr..start_addr + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    /// Borrow the raw cells.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory address {0} out of range")]
    AddressOutOfRange(usize),

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();

        mem.write(10, 42).unwrap();
        assert_eq!(mem.read(10).unwrap(), 42);
        assert_eq!(mem.read(11).unwrap(), 0);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.read(0).is_ok());
        assert!(mem.read(MEMORY_SIZE - 1).is_ok());

        assert_eq!(
            mem.read(MEMORY_SIZE),
            Err(MemoryError::AddressOutOfRange(MEMORY_SIZE))
        );
        assert_eq!(
            mem.write(MEMORY_SIZE + 5, 1),
            Err(MemoryError::AddressOutOfRange(MEMORY_SIZE + 5))
        );
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0).unwrap(), 1);
        assert_eq!(mem.read(1).unwrap(), 2);
        assert_eq!(mem.read(2).unwrap(), 3);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();
        let program = vec![0xAA; MEMORY_SIZE + 1];

        assert_eq!(
            mem.load_program(0, &program),
            Err(MemoryError::ProgramTooLarge { size: MEMORY_SIZE + 1, available: MEMORY_SIZE })
        );
        // Nothing was written
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear_and_dump() {
        let mut mem = Memory::new();
        mem.load_program(4, &[9, 8]).unwrap();

        assert_eq!(mem.dump(3, 4), vec![(3, 0), (4, 9), (5, 8), (6, 0)]);
        assert_eq!(mem.dump(MEMORY_SIZE - 1, 10).len(), 1);

        mem.clear();
        assert_eq!(mem.read(4).unwrap(), 0);
    }
}
