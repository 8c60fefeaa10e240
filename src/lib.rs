//! Slave-side engine for a small XCP-style measurement, calibration and flash-programming protocol.
//!
//! A host issues fixed 8-byte command frames over a peripheral link. The [`Engine`] decodes each
//! frame, reads or writes device memory through the memory transfer address (MTA) cursor and
//! drives the erase, program and reset sequence used to reflash the application in place.
//!
//! The transport itself (SPI with DMA or otherwise), the vendor flash driver and the startup code
//! are not part of this crate. They plug in through [`FlashBackend`], [`Memory`],
//! [`CriticalSection`] and [`Reset`].
#![no_std]

pub mod critical;
pub mod engine;
pub mod flash;
pub mod memory;
pub mod mta;
pub mod protocol;
pub mod region;
pub mod reset;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

pub use critical::CriticalSection;
pub use engine::{Config, Engine, Outcome, SessionState};
pub use flash::{FlashBackend, FlashState, Reprogrammer, Sector, SectorMap};
pub use memory::Memory;
pub use mta::Mta;
pub use region::{MemoryMap, MemoryRegion, RegionKind};
pub use reset::Reset;

/// Failure of a single command, reported to the host in the error frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Address or length outside the configured regions or the frame capacity.
    OutOfRange,
    /// The flash backend refused or failed an unlock, erase or program.
    CommandBusy,
    /// Write to flash while the backend is still locked.
    WriteProtected,
    /// Unrecognized command identifier.
    CommandUnknown,
}
