//! [`FlashBackend`] for any blocking `embedded-storage` NOR flash driver.

use embedded_storage::nor_flash::NorFlash;

use crate::flash::{FlashBackend, Sector};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NorBackendError<E> {
    /// Erase or program attempted without a prior unlock.
    Locked,
    /// Address below the base of the driver's window.
    OutOfBounds,
    Flash(E),
}

/// Maps absolute addresses onto the offsets of a [`NorFlash`] driver whose offset 0 sits at
/// `base`. Unlocking is tracked here; most HALs unlock internally around each operation.
pub struct NorBackend<F> {
    flash: F,
    base: u32,
    unlocked: bool,
}

impl<F: NorFlash> NorBackend<F> {
    pub fn new(flash: F, base: u32) -> Self {
        Self {
            flash,
            base,
            unlocked: false,
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn release(self) -> F {
        self.flash
    }

    fn offset(&self, address: u32) -> Result<u32, NorBackendError<F::Error>> {
        address
            .checked_sub(self.base)
            .ok_or(NorBackendError::OutOfBounds)
    }
}

impl<F: NorFlash> FlashBackend for NorBackend<F> {
    type Error = NorBackendError<F::Error>;

    fn unlock(&mut self) -> Result<(), Self::Error> {
        self.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) {
        self.unlocked = false;
    }

    fn erase(&mut self, sectors: &[Sector]) -> Result<(), Self::Error> {
        if !self.unlocked {
            return Err(NorBackendError::Locked);
        }
        let (Some(first), Some(last)) = (sectors.first(), sectors.last()) else {
            return Ok(());
        };

        let from = self.offset(first.start)?;
        let to = last
            .end()
            .checked_sub(self.base as u64)
            .and_then(|end| u32::try_from(end).ok())
            .ok_or(NorBackendError::OutOfBounds)?;

        self.flash.erase(from, to).map_err(NorBackendError::Flash)
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<(), Self::Error> {
        if !self.unlocked {
            return Err(NorBackendError::Locked);
        }
        let offset = self.offset(address)?;

        self.flash
            .write(offset, &word.to_le_bytes())
            .map_err(NorBackendError::Flash)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.offset(address)?;
        self.flash.read(offset, buf).map_err(NorBackendError::Flash)
    }
}
