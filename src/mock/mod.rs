//! In-memory stand-ins for the device: a small flash with a bootloader sector, a RAM window and a
//! critical section that records its nesting depth.

pub mod flash;
pub mod ram;

use core::cell::Cell;
use std::rc::Rc;

use crate::{
    CriticalSection, Engine,
    engine::Config,
    flash::{FlashBackend, Sector, SectorMap, nor::NorBackend},
    region::{MemoryMap, MemoryRegion},
};

pub use flash::{BusyBackend, MockFlash};
pub use ram::MockRam;

pub const FLASH_BASE: u32 = 0x0800_0000;
pub const FLASH_SIZE: u32 = 0x700;

/// Everything above the bootloader sector.
pub const APP_FLASH: MemoryRegion = MemoryRegion::new(0x0800_0100, 0x600);
pub const RAM: MemoryRegion = MemoryRegion::new(0x2000_0000, 0x100);

/// Contents of the bootloader sector.
pub const BOOTLOADER: u8 = 0xB0;
/// Contents of the application area before any erase.
pub const OLD_IMAGE: u8 = 0x5A;

const SECTOR_TABLE: [Sector; 4] = [
    Sector::new(0, 0x0800_0000, 0x100),
    Sector::new(1, 0x0800_0100, 0x100),
    Sector::new(2, 0x0800_0200, 0x100),
    Sector::new(3, 0x0800_0300, 0x400),
];

pub const SECTORS: SectorMap<'static> = SectorMap::new(&SECTOR_TABLE);

pub type TestEngine = Engine<'static, MockRam, NorBackend<MockFlash>, MockCriticalSection>;

pub type Depth = Rc<Cell<usize>>;

pub struct MockCriticalSection {
    depth: Depth,
}

impl MockCriticalSection {
    pub fn new() -> Self {
        Self {
            depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn depth(&self) -> Depth {
        self.depth.clone()
    }
}

impl CriticalSection for MockCriticalSection {
    /// Whether this acquire was the outermost one.
    type RestoreState = bool;

    fn acquire(&mut self) -> bool {
        self.depth.set(self.depth.get() + 1);
        self.depth.get() == 1
    }

    fn release(&mut self, _restore: bool) {
        self.depth.set(self.depth.get() - 1);
    }
}

pub fn config(flash: MemoryRegion) -> Config<'static> {
    Config {
        map: MemoryMap::new(flash, RAM).unwrap(),
        sectors: SECTORS,
    }
}

pub fn flash_backend() -> NorBackend<MockFlash> {
    NorBackend::new(MockFlash::new(), FLASH_BASE)
}

pub fn engine() -> TestEngine {
    engine_with_flash_start(APP_FLASH.start)
}

/// Engine whose application region starts at `start` and runs to the end of the mock flash.
pub fn engine_with_flash_start(start: u32) -> TestEngine {
    let cs = MockCriticalSection::new();
    let flash = NorBackend::new(MockFlash::guarded_by(cs.depth()), FLASH_BASE);
    engine_with(start, flash, cs)
}

pub fn engine_with<F: FlashBackend>(
    start: u32,
    flash: F,
    cs: MockCriticalSection,
) -> Engine<'static, MockRam, F, MockCriticalSection> {
    let region = MemoryRegion::new(start, FLASH_BASE + FLASH_SIZE - start);
    Engine::new(config(region), MockRam::new(cs.depth()), flash, cs)
}
