//! Validated reads and writes through the MTA cursor.

use crate::{
    Error,
    critical::{self, CriticalSection},
    engine::Engine,
    flash::FlashBackend,
    region::RegionKind,
};

/// Byte-addressable memory behind one of the configured regions.
///
/// Addresses handed to an implementation have already been validated against its region.
pub trait Memory {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error>;

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error>;
}

/// RAM accessed in place through raw pointers.
pub struct RawRam {
    _private: (),
}

impl RawRam {
    /// # Safety
    ///
    /// Every address of the RAM region given to the engine must be valid for reads and writes
    /// for as long as the engine lives. Host writes into that region are taken at face value.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Memory for RawRam {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        let src = address as usize as *const u8;
        // SAFETY: the caller of `RawRam::new` vouched for every validated RAM address.
        unsafe { core::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) };
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        let dst = address as usize as *mut u8;
        // SAFETY: as above.
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) };
        Ok(())
    }
}

impl<R: Memory, F: FlashBackend, C: CriticalSection> Engine<'_, R, F, C> {
    /// Which region the access `[cursor, cursor + length)` falls in.
    ///
    /// The whole span is checked, not just the cursor, so a cursor that was walked past the
    /// end of its region by earlier accesses is caught here.
    fn access_kind(&self, length: u32) -> Result<RegionKind, Error> {
        let address = self.mta.address();
        let kind = if length == 0 {
            self.map.region_of(address)
        } else {
            self.map.span_kind(address, length)
        };

        kind.ok_or(Error::OutOfRange)
    }

    /// UPLOAD: fill `buf` from the cursor and advance it.
    pub fn upload(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let length = u32::try_from(buf.len()).map_err(|_| Error::OutOfRange)?;
        let kind = self.access_kind(length)?;
        if buf.is_empty() {
            return Ok(());
        }

        let address = self.mta.address();
        critical::with(&mut self.cs, || match kind {
            RegionKind::Ram => self.ram.read(address, buf),
            RegionKind::Flash => self.flash.read(address, buf),
        })?;

        self.mta.advance(length);
        Ok(())
    }

    /// DOWNLOAD: write `data` at the cursor and advance it.
    ///
    /// Flash addresses are programmed through the backend and refused while it is locked.
    pub fn download(&mut self, data: &[u8]) -> Result<(), Error> {
        let length = u32::try_from(data.len()).map_err(|_| Error::OutOfRange)?;
        let kind = self.access_kind(length)?;
        if data.is_empty() {
            return Ok(());
        }

        let address = self.mta.address();
        critical::with(&mut self.cs, || match kind {
            RegionKind::Ram => self.ram.write(address, data),
            RegionKind::Flash => self.flash.write(address, data),
        })?;

        self.mta.advance(length);
        Ok(())
    }
}
