use crate::engine::Outcome;

#[cfg(feature = "cortex_m")]
pub mod cortex_m;

/// Restart mechanism used to apply freshly programmed flash.
///
/// The engine never restarts by itself; PROGRAM_RESET yields [`Outcome::Restart`] and the
/// transport loop calls into this once the response has been queued.
pub trait Reset {
    /// Wait for the last response to leave the link, then restart the device.
    fn restart(&mut self) -> !;
}

/// Finish a transport cycle, restarting if the dispatch asked for it.
pub fn complete(outcome: Outcome, reset: &mut impl Reset) {
    if outcome == Outcome::Restart {
        reset.restart();
    }
}
