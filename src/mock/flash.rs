use std::{rc::Rc, vec::Vec};

use core::cell::Cell;

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash, check_erase, check_read, check_write,
};

use crate::{
    flash::{FlashBackend, Sector},
    mock::{BOOTLOADER, Depth, FLASH_SIZE, OLD_IMAGE},
};

/// NOR flash: erase sets bytes to 0xFF, programming can only clear bits.
pub struct MockFlash {
    data: Vec<u8>,
    erases: Vec<(u32, u32)>,
    writes: usize,
    fail_writes_after: Option<usize>,
    depth: Depth,
    unguarded: usize,
}

impl MockFlash {
    pub fn new() -> Self {
        Self::guarded_by(Rc::new(Cell::new(0)))
    }

    /// Flash that counts operations made while `depth` is zero.
    pub fn guarded_by(depth: Depth) -> Self {
        let mut data = std::vec![OLD_IMAGE; FLASH_SIZE as usize];
        data[..0x100].fill(BOOTLOADER);

        Self {
            data,
            erases: Vec::new(),
            writes: 0,
            fail_writes_after: None,
            depth,
            unguarded: 0,
        }
    }

    /// Erased `(from, to)` offset ranges, in order.
    pub fn erases(&self) -> &Vec<(u32, u32)> {
        &self.erases
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn unguarded(&self) -> usize {
        self.unguarded
    }

    /// Let `count` more writes succeed, then fail every write.
    pub fn fail_writes_after(&mut self, count: usize) {
        self.fail_writes_after = Some(self.writes + count);
    }

    fn track(&mut self) {
        if self.depth.get() == 0 {
            self.unguarded += 1;
        }
    }
}

impl ErrorType for MockFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 0x100;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.track();
        self.data[from as usize..to as usize].fill(0xFF);
        self.erases.push((from, to));
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        if self.fail_writes_after.is_some_and(|limit| self.writes >= limit) {
            return Err(NorFlashErrorKind::Other);
        }
        self.track();

        let start = offset as usize;
        for (cell, byte) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= byte;
        }
        self.writes += 1;
        Ok(())
    }
}

/// Backend whose driver refuses everything.
pub struct BusyBackend;

impl FlashBackend for BusyBackend {
    type Error = ();

    fn unlock(&mut self) -> Result<(), Self::Error> {
        Err(())
    }

    fn lock(&mut self) {}

    fn erase(&mut self, _sectors: &[Sector]) -> Result<(), Self::Error> {
        Err(())
    }

    fn program_word(&mut self, _address: u32, _word: u32) -> Result<(), Self::Error> {
        Err(())
    }

    fn read(&mut self, _address: u32, _buf: &mut [u8]) -> Result<(), Self::Error> {
        Err(())
    }
}
