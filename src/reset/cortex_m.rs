use crate::reset::Reset;

/// System reset through the SCB, after a short busy-wait so the transport can clock out the
/// final response.
pub struct SystemReset {
    pub delay_cycles: u32,
}

impl SystemReset {
    pub const DEFAULT_DELAY_CYCLES: u32 = 40_000;

    pub const fn new() -> Self {
        Self {
            delay_cycles: Self::DEFAULT_DELAY_CYCLES,
        }
    }
}

impl Reset for SystemReset {
    fn restart(&mut self) -> ! {
        cortex_m::asm::delay(self.delay_cycles);
        cortex_m::peripheral::SCB::sys_reset()
    }
}
