//! Register files exposed by the responder

use core::cell::RefCell;

use critical_section::Mutex;

/// Errors from register file access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Register index past the end of the file
    OutOfBounds,
}

/// Byte-wide register file
///
/// Writes to read-only registers are accepted and ignored.
pub trait RegisterFile {
    /// Read register `index`
    fn read_register(&self, index: u8) -> Result<u8, RegisterError>;

    /// Write register `index`
    fn write_register(&mut self, index: u8, value: u8) -> Result<(), RegisterError>;
}

impl<const N: usize> RegisterFile for [u8; N] {
    fn read_register(&self, index: u8) -> Result<u8, RegisterError> {
        self.get(index as usize)
            .copied()
            .ok_or(RegisterError::OutOfBounds)
    }

    fn write_register(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self
            .get_mut(index as usize)
            .ok_or(RegisterError::OutOfBounds)?;
        *slot = value;
        Ok(())
    }
}

/// Register file shared between the responder interrupt and normal code
///
/// Every access runs in a critical section, so multi-byte values read with
/// [`SharedRegisterFile::with`] are never torn by a concurrent write.
pub struct SharedRegisterFile<R> {
    inner: Mutex<RefCell<R>>,
}

impl<R> SharedRegisterFile<R> {
    /// Wrap a register file
    pub const fn new(regs: R) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(regs)),
        }
    }

    /// Run `f` with exclusive access to the register file
    pub fn with<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

impl<R: RegisterFile> RegisterFile for &SharedRegisterFile<R> {
    fn read_register(&self, index: u8) -> Result<u8, RegisterError> {
        self.with(|regs| regs.read_register(index))
    }

    fn write_register(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        self.with(|regs| regs.write_register(index, value))
    }
}
