//! The command dispatcher and the engine context it runs on.
//!
//! All state that the protocol mutates lives in one [`Engine`], constructed once at startup and
//! driven by the transport through [`Engine::on_frame_received`]. Exactly one command is in
//! flight at a time: a dispatch disarms the engine, and only [`Engine::rearm`] lets the next
//! frame in.

use crate::{
    Error,
    critical::{self, CriticalSection},
    flash::{FlashBackend, Reprogrammer, SectorMap},
    memory::Memory,
    mta::Mta,
    protocol::{self, Command, ErrorCode, MAX_CTO, MAX_DTO, Request, Response},
    region::MemoryMap,
};

/// Device layout handed to [`Engine::new`].
#[derive(Clone, Copy, Debug)]
pub struct Config<'a> {
    pub map: MemoryMap,
    pub sectors: SectorMap<'a>,
}

impl Config<'static> {
    pub const STM32F407: Config<'static> = Config {
        map: MemoryMap::STM32F407,
        sectors: SectorMap::STM32F407,
    };
}

/// Host session flag. Observable only; no command is gated on it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionState {
    pub connected: bool,
}

/// What the transport should do after a dispatch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Send the response buffer.
    Respond,
    /// No-op frame; the response buffer was left untouched.
    Ignored,
    /// Send the response buffer, then hand over to [`crate::Reset::restart`].
    Restart,
}

pub struct Engine<'a, R, F, C> {
    pub(crate) map: MemoryMap,
    pub(crate) mta: Mta,
    pub(crate) ram: R,
    pub(crate) flash: Reprogrammer<'a, F>,
    pub(crate) cs: C,
    session: SessionState,
    armed: bool,
}

impl<'a, R: Memory, F: FlashBackend, C: CriticalSection> Engine<'a, R, F, C> {
    pub fn new(config: Config<'a>, ram: R, flash: F, cs: C) -> Self {
        Self {
            map: config.map,
            mta: Mta::new(),
            ram,
            flash: Reprogrammer::new(flash, config.map.flash(), config.sectors),
            cs,
            session: SessionState::default(),
            armed: true,
        }
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn mta(&self) -> Mta {
        self.mta
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn ram(&self) -> &R {
        &self.ram
    }

    pub fn flash(&self) -> &Reprogrammer<'a, F> {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut Reprogrammer<'a, F> {
        &mut self.flash
    }

    pub fn set_mta(&mut self, address: u32, extension: u8) -> Result<(), Error> {
        self.mta.set(&self.map, address, extension)
    }

    /// Whether the transport may start the next transfer.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Allow the next frame in, once the previous response is on its way.
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    /// Transport entry point: dispatch `request` unless a previous response is still pending.
    ///
    /// Returns `None`, without touching `response`, when the engine is not armed.
    pub fn on_frame_received(
        &mut self,
        request: &Request,
        response: &mut Response,
    ) -> Option<Outcome> {
        if !self.armed {
            #[cfg(feature = "defmt")]
            defmt::warn!("frame while busy, dropped");
            return None;
        }

        self.armed = false;
        Some(self.dispatch(request, response))
    }

    /// Interpret one request frame and build its response.
    pub fn dispatch(&mut self, request: &Request, response: &mut Response) -> Outcome {
        let pid = request[0];
        if pid == protocol::PID_NOOP {
            return Outcome::Ignored;
        }

        response.fill(0);

        let Ok(command) = Command::try_from(pid) else {
            #[cfg(feature = "defmt")]
            defmt::debug!("unknown command {=u8:#x}", pid);
            protocol::write_error(response, Error::CommandUnknown.into());
            return Outcome::Respond;
        };

        response[0] = protocol::PID_RES;

        match self.handle(command, request, response) {
            Ok(outcome) => outcome,
            Err(error) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("{} rejected: {}", command, error);
                protocol::write_error(response, error.into());
                Outcome::Respond
            }
        }
    }

    fn handle(
        &mut self,
        command: Command,
        request: &Request,
        response: &mut Response,
    ) -> Result<Outcome, Error> {
        match command {
            Command::Connect => {
                self.session.connected = true;
                #[cfg(feature = "defmt")]
                defmt::info!("host connected");

                response[1..7].copy_from_slice(&[
                    protocol::RESOURCES,
                    MAX_CTO as u8,
                    0x00,
                    MAX_DTO as u8,
                    protocol::PROTOCOL_VERSION,
                    protocol::TRANSPORT_VERSION,
                ]);
            }
            Command::Disconnect => {
                self.session.connected = false;
                self.mta.reset();
                #[cfg(feature = "defmt")]
                defmt::info!("host disconnected");
            }
            // Session and protection status stay zero: no DAQ, no seed and key.
            Command::GetStatus => {}
            Command::Synch => protocol::write_error(response, ErrorCode::CmdSynch),
            Command::SetMta => {
                let address = protocol::read_u32(request, 4);
                self.set_mta(address, request[3])?;
            }
            Command::Upload => {
                let length = request[1] as usize;
                let buf = response.get_mut(1..1 + length).ok_or(Error::OutOfRange)?;
                self.upload(buf)?;
            }
            Command::Download => {
                let length = request[1] as usize;
                let data = request.get(2..2 + length).ok_or(Error::OutOfRange)?;
                self.download(data)?;
            }
            Command::ProgramStart => self.flash.start()?,
            Command::ProgramClear => {
                let length = protocol::read_u32(request, 4);
                let address = self.mta.address();
                critical::with(&mut self.cs, || self.flash.clear(address, length))?;
            }
            Command::Program => {
                let length = request[1] as usize;
                let data = request.get(2..2 + length).ok_or(Error::OutOfRange)?;
                let address = self.mta.address();
                critical::with(&mut self.cs, || self.flash.program(address, data))?;
                self.mta.advance(length as u32);
            }
            Command::ProgramReset => {
                self.flash.reset();
                #[cfg(feature = "defmt")]
                defmt::info!("restart requested");
                return Ok(Outcome::Restart);
            }
        }

        Ok(Outcome::Respond)
    }
}
