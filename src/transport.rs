//! Serial framing and the proxy command set.
//!
//! Every exchange is a fixed 4-byte request frame followed by a one-byte
//! acknowledgment and a command-defined payload. There is no escaping and no
//! length prefix; payload sizes are implied by the command. The link is
//! strictly half-duplex request/response, so the transport keeps no state
//! between commands.

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::regs::{DebugConfig, DebugStatus};

/// Proxy command bytes.
pub mod cmd {
    pub const ENTER: u8 = 0x01;
    pub const EXIT: u8 = 0x02;
    pub const CHIP_ID: u8 = 0x03;
    pub const STATUS: u8 = 0x04;
    pub const PC: u8 = 0x05;
    pub const STEP: u8 = 0x06;
    pub const EXEC_1: u8 = 0x07;
    pub const EXEC_2: u8 = 0x08;
    pub const EXEC_3: u8 = 0x09;
    pub const BURST_WRITE: u8 = 0x0A;
    pub const RD_CFG: u8 = 0x0B;
    pub const WR_CFG: u8 = 0x0C;
    pub const PING: u8 = 0xF0;
}

/// Positive acknowledgment.
pub const ANS_OK: u8 = 0x01;
/// Negative acknowledgment; one proxy error-code byte follows.
pub const ANS_ERROR: u8 = 0x02;

/// Largest payload a single burst write may carry (the DBGDATA window).
pub const BURST_MAX: usize = 2048;

/// Read timeout applied to the serial port at open.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns the wire and speaks the framed command protocol over it.
#[derive(Debug)]
pub struct Transport<W> {
    wire: W,
}

impl<W: Read + Write> Transport<W> {
    pub fn new(wire: W) -> Self {
        Self { wire }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.wire.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Big-endian on the wire.
    fn read_u16(&mut self) -> Result<u16> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_ack(&mut self) -> Result<()> {
        match self.read_byte()? {
            ANS_OK => Ok(()),
            ANS_ERROR => Err(Error::Proxy {
                code: self.read_byte()?,
            }),
            byte => Err(Error::BadAck { byte }),
        }
    }

    /// Send one zero-padded command frame and consume the acknowledgment.
    fn command(&mut self, cmd: u8, params: [u8; 3]) -> Result<()> {
        let frame = [cmd, params[0], params[1], params[2]];
        self.wire.write_all(&frame)?;
        self.wire.flush()?;
        self.read_ack()
    }

    pub fn ping(&mut self) -> Result<()> {
        self.command(cmd::PING, [0; 3])
    }

    /// Put the target CPU into debug mode.
    pub fn enter(&mut self) -> Result<()> {
        self.command(cmd::ENTER, [0; 3])
    }

    /// Leave debug mode, resuming the CPU.
    pub fn exit(&mut self) -> Result<()> {
        self.command(cmd::EXIT, [0; 3])
    }

    pub fn chip_id(&mut self) -> Result<u16> {
        self.command(cmd::CHIP_ID, [0; 3])?;
        self.read_u16()
    }

    pub fn status(&mut self) -> Result<DebugStatus> {
        self.command(cmd::STATUS, [0; 3])?;
        Ok(DebugStatus::from_bits_retain(self.read_byte()?))
    }

    pub fn pc(&mut self) -> Result<u16> {
        self.command(cmd::PC, [0; 3])?;
        self.read_u16()
    }

    /// Single-step one instruction; returns the accumulator.
    pub fn step(&mut self) -> Result<u8> {
        self.command(cmd::STEP, [0; 3])?;
        self.read_byte()
    }

    /// Execute a one-byte instruction on the target; returns the accumulator.
    pub fn exec1(&mut self, op: u8) -> Result<u8> {
        self.command(cmd::EXEC_1, [op, 0, 0])?;
        self.read_byte()
    }

    pub fn exec2(&mut self, op: u8, b1: u8) -> Result<u8> {
        self.command(cmd::EXEC_2, [op, b1, 0])?;
        self.read_byte()
    }

    pub fn exec3(&mut self, op: u8, b1: u8, b2: u8) -> Result<u8> {
        self.command(cmd::EXEC_3, [op, b1, b2])?;
        self.read_byte()
    }

    /// Execute an instruction carrying a 16-bit immediate, high byte first.
    pub fn exec_imm16(&mut self, op: u8, imm: u16) -> Result<u8> {
        let [hi, lo] = imm.to_be_bytes();
        self.exec3(op, hi, lo)
    }

    pub fn read_config(&mut self) -> Result<DebugConfig> {
        self.command(cmd::RD_CFG, [0; 3])?;
        Ok(DebugConfig::from_bits_retain(self.read_byte()?))
    }

    pub fn write_config(&mut self, config: DebugConfig) -> Result<DebugStatus> {
        self.command(cmd::WR_CFG, [config.bits(), 0, 0])?;
        Ok(DebugStatus::from_bits_retain(self.read_byte()?))
    }

    /// Stream `data` into DBGDATA in one burst.
    ///
    /// The frame carries the length; after its ACK the payload is streamed
    /// raw, then a second ACK and the debug-status byte follow. The bounds
    /// check runs before anything touches the wire.
    pub fn burst_write(&mut self, data: &[u8]) -> Result<DebugStatus> {
        let len = data.len();
        if len == 0 || len > BURST_MAX {
            return Err(Error::BurstTooLarge { len });
        }
        let [hi, lo] = (len as u16).to_be_bytes();
        self.command(cmd::BURST_WRITE, [hi, lo, 0])?;
        self.wire.write_all(data)?;
        self.wire.flush()?;
        self.read_ack()?;
        Ok(DebugStatus::from_bits_retain(self.read_byte()?))
    }
}
