use crate::{
    Error,
    memory::Memory,
    mock::{Depth, RAM},
};

pub struct MockRam {
    data: [u8; RAM.length as usize],
    depth: Depth,
    accesses: usize,
    unguarded: usize,
}

impl MockRam {
    pub fn new(depth: Depth) -> Self {
        Self {
            data: [0; RAM.length as usize],
            depth,
            accesses: 0,
            unguarded: 0,
        }
    }

    pub fn accesses(&self) -> usize {
        self.accesses
    }

    /// Accesses made outside a critical section.
    pub fn unguarded(&self) -> usize {
        self.unguarded
    }

    fn window(&mut self, address: u32, len: usize) -> Result<&mut [u8], Error> {
        self.accesses += 1;
        if self.depth.get() == 0 {
            self.unguarded += 1;
        }

        let start = address.checked_sub(RAM.start).ok_or(Error::OutOfRange)? as usize;
        self.data
            .get_mut(start..start + len)
            .ok_or(Error::OutOfRange)
    }
}

impl Memory for MockRam {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        buf.copy_from_slice(self.window(address, buf.len())?);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        self.window(address, data.len())?.copy_from_slice(data);
        Ok(())
    }
}
