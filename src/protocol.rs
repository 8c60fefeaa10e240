//! Wire format: packet identifiers, error codes and frame helpers.
//!
//! Requests and responses are both a fixed 8 bytes. Byte 0 of a request is the command PID;
//! byte 0 of a response is [`PID_RES`] or [`PID_ERR`], the latter followed by an [`ErrorCode`].

use crate::Error;

/// Command transfer object size.
pub const MAX_CTO: usize = 8;
/// Data transfer object size.
pub const MAX_DTO: usize = 8;

pub type Request = [u8; MAX_CTO];
pub type Response = [u8; MAX_DTO];

/// Positive response.
pub const PID_RES: u8 = 0xFF;
/// Error response.
pub const PID_ERR: u8 = 0xFE;
/// Fill byte the master clocks out while polling; dispatch ignores it.
pub const PID_NOOP: u8 = 0xAA;

/// Resource mask reported by CONNECT.
pub const RESOURCES: u8 = 0x30;
pub const PROTOCOL_VERSION: u8 = 0x01;
pub const TRANSPORT_VERSION: u8 = 0x01;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Connect = 0xFF,
    Disconnect = 0xFE,
    GetStatus = 0xFD,
    Synch = 0xFC,
    /// Set the memory transfer address.
    SetMta = 0xF6,
    /// Read up to `MAX_DTO - 1` bytes at the MTA.
    Upload = 0xF5,
    /// Write up to `MAX_CTO - 2` bytes at the MTA.
    Download = 0xF0,
    /// Unlock flash for reprogramming.
    ProgramStart = 0xD2,
    /// Erase the sectors under `[MTA, MTA + length)`.
    ProgramClear = 0xD1,
    /// Program up to `MAX_CTO - 2` bytes at the MTA.
    Program = 0xD0,
    /// Lock flash and restart the device.
    ProgramReset = 0xCF,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(pid: u8) -> Result<Self, Self::Error> {
        Ok(match pid {
            0xFF => Command::Connect,
            0xFE => Command::Disconnect,
            0xFD => Command::GetStatus,
            0xFC => Command::Synch,
            0xF6 => Command::SetMta,
            0xF5 => Command::Upload,
            0xF0 => Command::Download,
            0xD2 => Command::ProgramStart,
            0xD1 => Command::ProgramClear,
            0xD0 => Command::Program,
            0xCF => Command::ProgramReset,
            other => return Err(other),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    /// Answer to SYNCH.
    CmdSynch = 0x00,
    CmdBusy = 0x10,
    CmdUnknown = 0x20,
    /// Not produced here; oversized lengths are reported as [`ErrorCode::OutOfRange`].
    CmdSyntax = 0x21,
    OutOfRange = 0x22,
    WriteProtected = 0x23,
}

impl From<Error> for ErrorCode {
    fn from(error: Error) -> Self {
        match error {
            Error::OutOfRange => ErrorCode::OutOfRange,
            Error::CommandBusy => ErrorCode::CmdBusy,
            Error::WriteProtected => ErrorCode::WriteProtected,
            Error::CommandUnknown => ErrorCode::CmdUnknown,
        }
    }
}

/// Replace `response` with an error frame; any payload written so far is discarded.
pub fn write_error(response: &mut Response, code: ErrorCode) {
    response.fill(0);
    response[0] = PID_ERR;
    response[1] = code as u8;
}

/// Little-endian `u32` at `request[offset..offset + 4]`.
pub(crate) fn read_u32(request: &Request, offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&request[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}
