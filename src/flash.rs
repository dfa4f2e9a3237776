//! DMA-driven flash programming.
//!
//! Programming moves every chunk twice: a burst write pushes it through
//! DBGDATA while DMA channel 0 stages it into RAM, then DMA channel 1 feeds
//! it from RAM into FWDATA under the flash controller's write trigger. The
//! host's job is to keep the descriptors, the flash address register and the
//! ERASE/WRITE bits in lockstep, and to poll BUSY and DMAIRQ without
//! outrunning the hardware.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::debugger::Debugger;
use crate::dma::{trig, DmaRequest, DMA_SETTLE};
use crate::error::{Error, Result};
use crate::regs::{xdata, Fctl};
use crate::transport::BURST_MAX;

/// RAM staging address for the burst-in, flash-out double buffer.
const STAGING: u16 = 0x0000;

/// A code address decomposed into the flash controller's (page, offset) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashAddr {
    pub page: u16,
    pub offset: u16,
}

impl FlashAddr {
    pub fn from_code_addr(addr: u32, page_size: u32) -> Self {
        Self {
            page: (addr / page_size) as u16,
            offset: (addr % page_size) as u16,
        }
    }

    /// Encode as the `[FADDRL, FADDRH]` register pair.
    ///
    /// FADDRH bit 0 is computed as `(offset << 8) & 1`, which is always
    /// zero since a left shift can never populate bit 0. The dead term is
    /// kept so the register pair stays bit-compatible with the programmers
    /// this chip has always been driven by.
    pub fn encode(&self) -> [u8; 2] {
        let faddrl = (self.offset & 0xFF) as u8;
        let faddrh = ((self.page << 1) as u8) | ((((self.offset as u32) << 8) & 0x01) as u8);
        [faddrl, faddrh]
    }
}

/// Tuning for one [`write_code`](Debugger::write_code) pass.
#[derive(Debug, Clone)]
pub struct FlashOptions {
    /// Erase each page before writing into it.
    pub erase: bool,
    /// Bytes staged per burst; capped at the 2 KiB DBGDATA window.
    pub block_size: usize,
    /// Flash page size of the part.
    pub page_size: u32,
    /// Deadline for each BUSY / DMA-IRQ poll loop.
    pub poll_timeout: Duration,
    /// Checked between chunks; programming stops early once raised.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for FlashOptions {
    fn default() -> Self {
        Self {
            erase: false,
            block_size: 2048,
            page_size: 2048,
            poll_timeout: Duration::from_secs(10),
            cancel: None,
        }
    }
}

/// DMA-0: proxy bursts into DBGDATA, channel copies to RAM staging.
fn staging_channel(len: u16) -> DmaRequest {
    DmaRequest {
        src: xdata::DBGDATA,
        dst: STAGING,
        len,
        trigger: trig::DBG_BW,
        dst_inc: 1,
        priority: 1,
        ..Default::default()
    }
}

/// DMA-1: RAM staging into FWDATA under the flash write trigger.
fn write_channel(len: u16) -> DmaRequest {
    DmaRequest {
        src: STAGING,
        dst: xdata::FWDATA,
        len,
        trigger: trig::FLASH,
        src_inc: 1,
        priority: 2,
        interrupt: true,
        ..Default::default()
    }
}

impl<W: Read + Write> Debugger<W> {
    pub(crate) fn read_fctl(&mut self) -> Result<Fctl> {
        let byte = self.read_xdata(xdata::FCTL, 1)?;
        Ok(Fctl::from_bits_retain(byte[0]))
    }

    pub fn flash_busy(&mut self) -> Result<bool> {
        Ok(self.read_fctl()?.contains(Fctl::BUSY))
    }

    pub fn flash_full(&mut self) -> Result<bool> {
        Ok(self.read_fctl()?.contains(Fctl::FULL))
    }

    pub fn flash_aborted(&mut self) -> Result<bool> {
        Ok(self.read_fctl()?.contains(Fctl::ABORT))
    }

    /// Load the flash address register pair from a (page, offset) target.
    pub fn set_flash_addr(&mut self, addr: FlashAddr) -> Result<()> {
        self.write_xdata(xdata::FADDRL, &addr.encode())
    }

    fn set_fctl_bit(&mut self, bit: Fctl) -> Result<()> {
        let fctl = self.read_fctl()?;
        self.write_xdata(xdata::FCTL, &[(fctl | bit).bits()])
    }

    /// Kick off a write of the word DMA feeds into FWDATA.
    pub fn start_flash_write(&mut self) -> Result<()> {
        self.set_fctl_bit(Fctl::WRITE)
    }

    /// Kick off an erase of the page addressed by FADDRH:FADDRL.
    pub fn start_flash_erase(&mut self) -> Result<()> {
        self.set_fctl_bit(Fctl::ERASE)
    }

    /// Program `data` into code space starting at `offset`.
    ///
    /// Requires DMA to be unpaused (`pause_dma(false)`). Returns the number
    /// of bytes programmed, which is `data.len()` unless the pass was
    /// cancelled. On error the flash errors name the code address up to
    /// which programming succeeded; nothing is rolled back, and a cancelled
    /// or failed pass may leave the current page half-written.
    ///
    /// A trailing chunk shorter than `block_size` reprograms both channel
    /// descriptors with the short length; they are not restored afterwards.
    pub fn write_code(&mut self, offset: u32, data: &[u8], opts: &FlashOptions) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let block_size = opts.block_size.min(BURST_MAX);

        self.config_dma_channel(0, &staging_channel(block_size as u16))?;
        self.config_dma_channel(1, &write_channel(block_size as u16))?;

        let mut cursor = 0;
        while cursor < data.len() {
            if let Some(cancel) = &opts.cancel {
                if cancel.load(Ordering::Relaxed) {
                    debug!(written = cursor, "flash programming cancelled");
                    return Ok(cursor);
                }
            }

            let addr = offset + cursor as u32;
            let chunk = (data.len() - cursor).min(block_size);
            if chunk < block_size {
                self.config_dma_channel(0, &staging_channel(chunk as u16))?;
                self.config_dma_channel(1, &write_channel(chunk as u16))?;
            }

            // Stage the chunk into RAM through channel 0.
            self.arm_dma_channel(0)?;
            self.burst_write(&data[cursor..cursor + chunk])?;

            let faddr = FlashAddr::from_code_addr(addr, opts.page_size);
            self.set_flash_addr(faddr)?;

            if opts.erase {
                self.start_flash_erase()?;
                self.wait_flash_idle(addr, opts.poll_timeout)?;
            }

            // Move it from RAM into flash through channel 1.
            self.arm_dma_channel(1)?;
            self.start_flash_write()?;
            self.wait_dma_irq(1, addr, opts.poll_timeout)?;
            self.clear_dma_irq(1)?;

            debug!(
                addr = format_args!("{addr:#07x}"),
                len = chunk,
                page = faddr.page,
                "chunk programmed"
            );
            cursor += chunk;
        }
        Ok(cursor)
    }

    /// Poll FCTL until BUSY clears, surfacing ABORT/FULL seen along the way.
    fn wait_flash_idle(&mut self, addr: u32, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            let fctl = self.read_fctl()?;
            if fctl.contains(Fctl::ABORT) {
                return Err(Error::FlashAbort { addr });
            }
            if fctl.contains(Fctl::FULL) {
                return Err(Error::FlashFull { addr });
            }
            if !fctl.contains(Fctl::BUSY) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(Error::FlashTimeout {
                    addr,
                    waiting: "flash BUSY to clear",
                    timeout,
                });
            }
            thread::sleep(DMA_SETTLE);
        }
    }

    fn wait_dma_irq(&mut self, index: u8, addr: u32, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while !self.dma_irq_raised(index)? {
            if start.elapsed() >= timeout {
                return Err(Error::FlashTimeout {
                    addr,
                    waiting: "DMA completion",
                    timeout,
                });
            }
            thread::sleep(DMA_SETTLE);
        }
        Ok(())
    }
}
