//! In-place flash reprogramming: unlock, sector erase, word programming and relock.
//!
//! Each step is atomic on its own; the host sequences them, erasing once and then programming
//! in chunks bounded by the frame size.

use serde::{Deserialize, Serialize};

use crate::{Error, memory::Memory, region::MemoryRegion};

pub mod nor;

/// Minimum programmable unit of the backend, in bytes.
pub const WORD_SIZE: usize = 4;

/// What flash reads as after an erase.
pub const ERASED_BYTE: u8 = 0xFF;

/// Vendor flash driver primitives.
///
/// Calls are synchronous and bounded; any busy-waiting happens inside the implementation.
pub trait FlashBackend {
    type Error;

    fn unlock(&mut self) -> Result<(), Self::Error>;

    fn lock(&mut self);

    /// Erase a contiguous run of sectors.
    fn erase(&mut self, sectors: &[Sector]) -> Result<(), Self::Error>;

    /// Program one little-endian word at `address`.
    fn program_word(&mut self, address: u32, word: u32) -> Result<(), Self::Error>;

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// One erase unit of the device flash.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sector {
    pub index: u8,
    pub start: u32,
    pub size: u32,
}

impl Sector {
    pub const fn new(index: u8, start: u32, size: u32) -> Self {
        Self { index, start, size }
    }

    pub const fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }
}

/// Device specific sector layout, ordered by address and without gaps.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectorMap<'a> {
    sectors: &'a [Sector],
}

const KIB: u32 = 1024;

const STM32F407_SECTORS: [Sector; 12] = [
    Sector::new(0, 0x0800_0000, 16 * KIB),
    Sector::new(1, 0x0800_4000, 16 * KIB),
    Sector::new(2, 0x0800_8000, 16 * KIB),
    Sector::new(3, 0x0800_C000, 16 * KIB),
    Sector::new(4, 0x0801_0000, 64 * KIB),
    Sector::new(5, 0x0802_0000, 128 * KIB),
    Sector::new(6, 0x0804_0000, 128 * KIB),
    Sector::new(7, 0x0806_0000, 128 * KIB),
    Sector::new(8, 0x0808_0000, 128 * KIB),
    Sector::new(9, 0x080A_0000, 128 * KIB),
    Sector::new(10, 0x080C_0000, 128 * KIB),
    Sector::new(11, 0x080E_0000, 128 * KIB),
];

impl SectorMap<'static> {
    pub const STM32F407: SectorMap<'static> = SectorMap::new(&STM32F407_SECTORS);
}

impl<'a> SectorMap<'a> {
    pub const fn new(sectors: &'a [Sector]) -> Self {
        Self { sectors }
    }

    pub fn sectors(&self) -> &'a [Sector] {
        self.sectors
    }

    /// The minimal run of sectors covering `[address, address + length)`.
    pub fn covering(&self, address: u32, length: u32) -> Option<&'a [Sector]> {
        if length == 0 {
            return None;
        }
        let last_address = address.checked_add(length - 1)?;

        let first = self
            .sectors
            .iter()
            .position(|s| s.start <= address && (address as u64) < s.end())?;
        let last = self.sectors[first..]
            .iter()
            .position(|s| s.start <= last_address && (last_address as u64) < s.end())?;

        Some(&self.sectors[first..=first + last])
    }
}

/// Progress of a reprogramming session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashState {
    Locked,
    Unlocked,
    Erased,
    Programmed,
}

/// The flash reprogramming state machine around a [`FlashBackend`].
pub struct Reprogrammer<'a, F> {
    backend: F,
    region: MemoryRegion,
    sectors: SectorMap<'a>,
    state: FlashState,
}

impl<'a, F: FlashBackend> Reprogrammer<'a, F> {
    /// `region` is the application flash; nothing outside it is ever erased or programmed.
    pub fn new(backend: F, region: MemoryRegion, sectors: SectorMap<'a>) -> Self {
        Self {
            backend,
            region,
            sectors,
            state: FlashState::Locked,
        }
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    pub fn backend(&self) -> &F {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut F {
        &mut self.backend
    }

    /// PROGRAM_START.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.backend.unlock().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("flash unlock failed");
            return Err(Error::CommandBusy);
        }

        if self.state == FlashState::Locked {
            self.state = FlashState::Unlocked;
        }
        Ok(())
    }

    /// PROGRAM_CLEAR: erase every sector touched by `[address, address + length)`.
    ///
    /// The covering sectors must lie inside the application region, otherwise an unaligned
    /// request could take the bootloader's sector with it.
    pub fn clear(&mut self, address: u32, length: u32) -> Result<(), Error> {
        if !self.region.contains_span(address, length) {
            return Err(Error::OutOfRange);
        }

        let sectors = self
            .sectors
            .covering(address, length)
            .ok_or(Error::OutOfRange)?;
        let (first, last) = match sectors {
            [first, .., last] => (first, last),
            [only] => (only, only),
            [] => return Err(Error::OutOfRange),
        };
        if first.start < self.region.start || last.end() > self.region.end() {
            return Err(Error::OutOfRange);
        }

        if self.state == FlashState::Locked {
            return Err(Error::CommandBusy);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("erasing sectors {}..={}", first.index, last.index);

        if self.backend.erase(sectors).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("flash erase failed");
            return Err(Error::CommandBusy);
        }

        self.state = FlashState::Erased;
        Ok(())
    }

    /// PROGRAM: write `data` at `address` one word at a time.
    ///
    /// Words are aligned to [`WORD_SIZE`]. Leading and trailing bytes of a partial word are
    /// padded with [`ERASED_BYTE`], which leaves whatever is already programmed there as it is,
    /// so consecutive chunks may end and start mid-word. The first failing word aborts the whole
    /// request.
    pub fn program(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        let length = u32::try_from(data.len()).map_err(|_| Error::OutOfRange)?;
        if !self.region.contains_span(address, length) {
            return Err(Error::OutOfRange);
        }

        if self.state == FlashState::Locked {
            return Err(Error::CommandBusy);
        }

        let lead = address as usize % WORD_SIZE;
        let aligned = address - lead as u32;
        let words = (lead + data.len()).div_ceil(WORD_SIZE);

        for index in 0..words {
            let mut word = [ERASED_BYTE; WORD_SIZE];
            for (slot, byte) in word.iter_mut().enumerate() {
                let position = index * WORD_SIZE + slot;
                if let Some(value) = position.checked_sub(lead).and_then(|p| data.get(p)) {
                    *byte = *value;
                }
            }

            let word_address = aligned + (index * WORD_SIZE) as u32;
            if self
                .backend
                .program_word(word_address, u32::from_le_bytes(word))
                .is_err()
            {
                #[cfg(feature = "defmt")]
                defmt::warn!("flash program failed at {=u32:#x}", word_address);
                return Err(Error::CommandBusy);
            }
        }

        self.state = FlashState::Programmed;
        Ok(())
    }

    /// PROGRAM_RESET: relock before the device restarts.
    pub fn reset(&mut self) {
        self.backend.lock();
        self.state = FlashState::Locked;
    }
}

/// Flash seen as plain memory: reads go through the backend, writes are programmed and are
/// refused while locked.
impl<F: FlashBackend> Memory for Reprogrammer<'_, F> {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.backend
            .read(address, buf)
            .map_err(|_| Error::OutOfRange)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        if self.state == FlashState::Locked {
            return Err(Error::WriteProtected);
        }
        self.program(address, data)
    }
}
