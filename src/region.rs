//! Device memory layout and the address validator.
//!
//! There is no MMU to lean on, so every memory access the engine performs is first checked
//! against the two regions configured here: the application flash and the RAM.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A contiguous range of the linear address space.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryRegion {
    pub start: u32,
    pub length: u32,
}

impl MemoryRegion {
    pub const fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// One past the last address, widened so a region ending at 4 GiB is representable.
    pub const fn end(&self) -> u64 {
        self.start as u64 + self.length as u64
    }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && (address as u64) < self.end()
    }

    /// Whether `[address, address + length)` lies entirely inside this region.
    ///
    /// Empty spans are never contained.
    pub const fn contains_span(&self, address: u32, length: u32) -> bool {
        length > 0 && address >= self.start && address as u64 + length as u64 <= self.end()
    }

    const fn overlaps(&self, other: &MemoryRegion) -> bool {
        (self.start as u64) < other.end() && (other.start as u64) < self.end()
    }
}

/// Which of the two configured regions an address belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionKind {
    Flash,
    Ram,
}

/// Reason a [`MemoryMap`] was rejected.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MapError {
    EmptyRegion,
    WrapsAddressSpace,
    Overlap,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::EmptyRegion => f.write_str("memory region has zero length"),
            MapError::WrapsAddressSpace => f.write_str("memory region wraps the address space"),
            MapError::Overlap => f.write_str("flash and RAM regions overlap"),
        }
    }
}

/// The application flash and RAM regions of a device.
///
/// The flash region must start above the bootloader, so that nothing reachable from the host
/// can touch the code that is currently executing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(try_from = "RawMemoryMap")]
pub struct MemoryMap {
    flash: MemoryRegion,
    ram: MemoryRegion,
}

#[derive(Deserialize)]
struct RawMemoryMap {
    flash: MemoryRegion,
    ram: MemoryRegion,
}

impl TryFrom<RawMemoryMap> for MemoryMap {
    type Error = MapError;

    fn try_from(raw: RawMemoryMap) -> Result<Self, Self::Error> {
        MemoryMap::new(raw.flash, raw.ram)
    }
}

impl MemoryMap {
    /// STM32F407: 1 MiB flash with the first two 16K sectors holding the bootloader, 128K SRAM.
    pub const STM32F407: MemoryMap = MemoryMap {
        flash: MemoryRegion::new(0x0800_8000, 0x000F_8000),
        ram: MemoryRegion::new(0x2000_0000, 128 * 1024),
    };

    pub fn new(flash: MemoryRegion, ram: MemoryRegion) -> Result<Self, MapError> {
        for region in [&flash, &ram] {
            if region.length == 0 {
                return Err(MapError::EmptyRegion);
            }
            if region.end() > u32::MAX as u64 + 1 {
                return Err(MapError::WrapsAddressSpace);
            }
        }

        if flash.overlaps(&ram) {
            return Err(MapError::Overlap);
        }

        Ok(Self { flash, ram })
    }

    pub const fn flash(&self) -> MemoryRegion {
        self.flash
    }

    pub const fn ram(&self) -> MemoryRegion {
        self.ram
    }

    /// Bare address check: which region, if any, holds `address`.
    pub fn region_of(&self, address: u32) -> Option<RegionKind> {
        if self.flash.contains(address) {
            Some(RegionKind::Flash)
        } else if self.ram.contains(address) {
            Some(RegionKind::Ram)
        } else {
            None
        }
    }

    /// Which region holds the whole span `[address, address + length)`.
    ///
    /// Spans straddling both regions, or a region edge, belong to neither.
    pub fn span_kind(&self, address: u32, length: u32) -> Option<RegionKind> {
        if self.flash.contains_span(address, length) {
            Some(RegionKind::Flash)
        } else if self.ram.contains_span(address, length) {
            Some(RegionKind::Ram)
        } else {
            None
        }
    }

    /// The address validator: true iff the span lies entirely within exactly one region.
    pub fn validate(&self, address: u32, length: u32) -> bool {
        self.span_kind(address, length).is_some()
    }
}
