//! CC2540/CC2541 register map and bit-packed debug bytes.
//!
//! Only the registers the driver actually touches are listed. SFRs are
//! reached through `MOV direct` opcodes; everything else lives in XDATA.

use std::fmt;

use bitflags::bitflags;

/// Special function registers (direct addresses 0x80..=0xFF).
pub mod sfr {
    /// Flash bank select, low three bits.
    pub const FMAP: u8 = 0x9F;
    /// Memory arbiter control; low three bits select the XDATA bank.
    pub const MEMCTR: u8 = 0xC7;
    pub const DMAIRQ: u8 = 0xD1;
    /// Descriptor base for channels 1..4, read sequentially by the controller.
    pub const DMA1CFGL: u8 = 0xD2;
    pub const DMA1CFGH: u8 = 0xD3;
    pub const DMA0CFGL: u8 = 0xD4;
    pub const DMA0CFGH: u8 = 0xD5;
    pub const DMAARM: u8 = 0xD6;
}

/// XDATA-mapped peripheral and information addresses.
pub mod xdata {
    /// Debug-interface mailbox; burst writes land here for DMA to pick up.
    pub const DBGDATA: u16 = 0x6260;
    /// Flash control register, see [`Fctl`](super::Fctl).
    pub const FCTL: u16 = 0x6270;
    /// Flash address pair; low byte first, high byte at the next address.
    pub const FADDRL: u16 = 0x6271;
    pub const FADDRH: u16 = 0x6272;
    /// Flash write data port, fed by DMA during programming.
    pub const FWDATA: u16 = 0x6273;
    /// Two chip-identification registers.
    pub const CHIP_INFO: u16 = 0x6276;
    /// IEEE address / serial number, six bytes stored least significant first.
    pub const IEEE_ADDR: u16 = 0x780E;
    /// Read-only information page, 2 KiB.
    pub const INFO_PAGE: u16 = 0x7800;
}

/// Code address of the 64-byte manufacturing block in the last flash page.
pub const BLE_INFO_ADDR: u32 = 0x1FFC0;
pub const BLE_INFO_LEN: usize = 64;

bitflags! {
    /// Debug configuration byte (RD_CFG / WR_CFG).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugConfig: u8 {
        const SOFT_POWER_MODE = 0x10;
        const TIMERS_OFF = 0x08;
        const DMA_PAUSE = 0x04;
        const TIMER_SUSPEND = 0x02;
    }
}

bitflags! {
    /// Debug status byte, returned by STATUS, STEP, WR_CFG and burst writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugStatus: u8 {
        const CHIP_ERASE_BUSY = 0x80;
        const PCON_IDLE = 0x40;
        const CPU_HALTED = 0x20;
        const PM_ACTIVE = 0x10;
        const HALT_STATUS = 0x08;
        const DEBUG_LOCKED = 0x04;
        const OSCILLATOR_STABLE = 0x02;
        const STACK_OVERFLOW = 0x01;
    }
}

bitflags! {
    /// Flash control register bits at XDATA 0x6270.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Fctl: u8 {
        const BUSY = 0x80;
        const FULL = 0x40;
        const ABORT = 0x20;
        const WRITE = 0x02;
        const ERASE = 0x01;
    }
}

impl fmt::Display for DebugConfig {
    /// One checklist line per flag, for operator front-ends.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, flag) in Self::all().iter_names() {
            let mark = if self.contains(flag) { 'X' } else { ' ' };
            writeln!(f, " [{mark}] {name}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DebugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, flag) in Self::all().iter_names() {
            let mark = if self.contains(flag) { 'X' } else { ' ' };
            writeln!(f, " [{mark}] {name}")?;
        }
        Ok(())
    }
}
