//! The memory transfer address (MTA) cursor.

use crate::{Error, region::MemoryMap};

/// Address and extension that UPLOAD, DOWNLOAD and the flash commands operate on.
///
/// The address is either 0 (never set) or was accepted by the validator when it was set.
/// [`Mta::advance`] does not re-validate: each access checks its own full span instead.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mta {
    address: u32,
    extension: u8,
}

impl Mta {
    pub const fn new() -> Self {
        Self {
            address: 0,
            extension: 0,
        }
    }

    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Stored alongside the address, not interpreted: there is a single flat address space.
    pub const fn extension(&self) -> u8 {
        self.extension
    }

    /// Point the cursor at `address`, leaving it untouched if no region holds that address.
    pub fn set(&mut self, map: &MemoryMap, address: u32, extension: u8) -> Result<(), Error> {
        if map.region_of(address).is_none() {
            return Err(Error::OutOfRange);
        }

        self.address = address;
        self.extension = extension;
        Ok(())
    }

    pub fn advance(&mut self, length: u32) {
        self.address = self.address.wrapping_add(length);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
