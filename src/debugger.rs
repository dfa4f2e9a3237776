//! The debug session and the 8051 instruction synthesis built on it.
//!
//! The proxy only knows how to push one-, two- and three-byte instructions
//! through the chip's debug interface. Memory and register access is
//! synthesized here from a handful of opcodes fed through that primitive.

use std::io::{Read, Write};

use serialport::SerialPort;
use tracing::debug;

use crate::chipinfo::ChipInfo;
use crate::error::{Error, Result};
use crate::regs::{sfr, DebugConfig, DebugStatus};
use crate::transport::{Transport, READ_TIMEOUT};

/// The 8051 opcodes the driver feeds through the debug interface.
pub(crate) mod op {
    /// `MOV DPTR,#imm16`
    pub const MOV_DPTR_IMM16: u8 = 0x90;
    /// `MOVX A,@DPTR`
    pub const MOVX_A_DPTR: u8 = 0xE0;
    /// `MOV A,#imm8`
    pub const MOV_A_IMM8: u8 = 0x74;
    /// `MOVX @DPTR,A`
    pub const MOVX_DPTR_A: u8 = 0xF0;
    /// `INC DPTR`
    pub const INC_DPTR: u8 = 0xA3;
    /// `MOV A,direct`
    pub const MOV_A_DIRECT: u8 = 0xE5;
    /// `MOV direct,#imm8`
    pub const MOV_DIRECT_IMM8: u8 = 0x75;
}

/// Each XDATA bank window is 32 KiB of code space.
const BANK_SPAN: u32 = 0x8000;

/// An attached debug session with a CC2540/CC2541 behind a proxy.
///
/// The session owns its transport exclusively; all operations are blocking
/// request/response and nothing here is safe to share across threads. The
/// serial port is released when the session is dropped, on every path.
#[derive(Debug)]
pub struct Debugger<W> {
    port: Transport<W>,
    chip_id: u16,
    pub(crate) chip_info: Option<ChipInfo>,
    debug_config: DebugConfig,
    debug_status: DebugStatus,
}

impl Debugger<Box<dyn SerialPort>> {
    /// Open `port` and attach to the proxy behind it.
    ///
    /// Fails if the port cannot be opened, the proxy does not answer the
    /// ping, or the chip identifies as anything but a CC2540/CC2541.
    pub fn open(port: &str) -> Result<Self> {
        let wire = serialport::new(port, 115_200)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| Error::PortOpen {
                port: port.to_owned(),
                source,
            })?;
        debug!(port, "serial port opened");
        Self::attach(wire)
    }
}

impl<W: Read + Write> Debugger<W> {
    /// Perform the attach handshake over an already-open wire.
    ///
    /// The wire must enforce its own read timeout ([`open`](Debugger::open)
    /// configures one second). On any failure the wire is dropped, closing
    /// the port.
    pub fn attach(wire: W) -> Result<Self> {
        let mut port = Transport::new(wire);
        port.ping().map_err(|_| Error::ProxyUnreachable)?;

        let chip_id = port.chip_id()?;
        if chip_id & 0xFF00 != 0x8D00 {
            return Err(Error::UnsupportedChip { id: chip_id });
        }
        let debug_config = port.read_config()?;
        debug!(chip_id = format_args!("{chip_id:#06x}"), "attached to proxy");

        Ok(Self {
            port,
            chip_id,
            chip_info: None,
            debug_config,
            debug_status: DebugStatus::empty(),
        })
    }

    /// The 16-bit chip id probed at attach; high byte 0x8D.
    pub fn chip_id(&self) -> u16 {
        self.chip_id
    }

    /// The debug configuration as last read from or written to the chip.
    pub fn debug_config(&self) -> DebugConfig {
        self.debug_config
    }

    /// The most recent debug status reported by the chip.
    pub fn debug_status(&self) -> DebugStatus {
        self.debug_status
    }

    /// Put the target CPU into debug mode.
    pub fn enter_debug(&mut self) -> Result<()> {
        self.port.enter()
    }

    /// Leave debug mode and let the CPU run.
    pub fn resume(&mut self) -> Result<()> {
        self.port.exit()
    }

    /// Current debug status; also refreshes the cached copy.
    pub fn status(&mut self) -> Result<DebugStatus> {
        let status = self.port.status()?;
        self.debug_status = status;
        Ok(status)
    }

    /// The target's program counter.
    pub fn pc(&mut self) -> Result<u16> {
        self.port.pc()
    }

    /// Single-step one instruction; returns the accumulator.
    pub fn step(&mut self) -> Result<u8> {
        self.port.step()
    }

    /// Read the debug configuration, refreshing the cached copy.
    pub fn read_config(&mut self) -> Result<DebugConfig> {
        let config = self.port.read_config()?;
        self.debug_config = config;
        Ok(config)
    }

    /// Write the debug configuration; caches it and the returned status.
    pub fn write_config(&mut self, config: DebugConfig) -> Result<DebugStatus> {
        let status = self.port.write_config(config)?;
        self.debug_config = config;
        self.debug_status = status;
        Ok(status)
    }

    /// Burst-write into DBGDATA; caches the returned status.
    pub fn burst_write(&mut self, data: &[u8]) -> Result<DebugStatus> {
        let status = self.port.burst_write(data)?;
        self.debug_status = status;
        Ok(status)
    }

    /// Read `len` bytes of XDATA starting at `offset`.
    ///
    /// Three commands per byte; this is the acknowledged slow path, fine for
    /// registers and info pages, not for bulk firmware reads.
    pub fn read_xdata(&mut self, offset: u16, len: usize) -> Result<Vec<u8>> {
        self.port.exec_imm16(op::MOV_DPTR_IMM16, offset)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len {
            data.push(self.port.exec1(op::MOVX_A_DPTR)?);
            self.port.exec1(op::INC_DPTR)?;
        }
        Ok(data)
    }

    /// Write `data` into XDATA starting at `offset`.
    pub fn write_xdata(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        self.port.exec_imm16(op::MOV_DPTR_IMM16, offset)?;
        for &byte in data {
            self.port.exec2(op::MOV_A_IMM8, byte)?;
            self.port.exec1(op::MOVX_DPTR_A)?;
            self.port.exec1(op::INC_DPTR)?;
        }
        Ok(())
    }

    /// Read `len` bytes of code space starting at `offset`.
    ///
    /// Code is reached through the XDATA bank window at 0x8000; requests
    /// that straddle a 32 KiB bank boundary are split at the boundary.
    pub fn read_code(&mut self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len);
        let mut addr = offset;
        let mut remaining = len;
        while remaining > 0 {
            let bank = (addr / BANK_SPAN) as u8;
            let local = (addr % BANK_SPAN) as u16;
            let span = remaining.min((BANK_SPAN as usize) - local as usize);
            self.select_xdata_bank(bank)?;
            data.extend_from_slice(&self.read_xdata(0x8000 + local, span)?);
            addr += span as u32;
            remaining -= span;
        }
        Ok(data)
    }

    /// Read an SFR through `MOV A,direct`.
    pub fn read_register(&mut self, reg: u8) -> Result<u8> {
        self.port.exec2(op::MOV_A_DIRECT, reg)
    }

    /// Write an SFR through `MOV direct,#imm8`.
    pub fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        self.port.exec3(op::MOV_DIRECT_IMM8, reg, value)?;
        Ok(())
    }

    /// Map `bank` into the XDATA window; upper MEMCTR bits are preserved.
    pub fn select_xdata_bank(&mut self, bank: u8) -> Result<()> {
        let memctr = self.read_register(sfr::MEMCTR)?;
        self.write_register(sfr::MEMCTR, (memctr & 0xF8) | (bank & 0x07))
    }

    /// Select the active flash bank.
    pub fn select_flash_bank(&mut self, bank: u8) -> Result<()> {
        self.write_register(sfr::FMAP, bank & 0x07)
    }
}
