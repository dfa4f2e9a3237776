//! DMA controller programming.
//!
//! Descriptors are materialized in target RAM and the controller is pointed
//! at them through the DMA configuration SFRs. The 8-byte layout is a
//! hardware contract; [`DmaRequest::encode`] is the single place it is
//! spelled out.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use crate::debugger::Debugger;
use crate::error::Result;
use crate::regs::{sfr, DebugConfig};

/// Default XDATA base where channel descriptors are materialized.
pub const DESC_BASE: u16 = 0x1000;

/// Settling time the controller needs after DMAARM before the next debug
/// command, and the interval between completion polls.
pub(crate) const DMA_SETTLE: Duration = Duration::from_millis(10);

/// Trigger events used by the flash programmer.
pub mod trig {
    /// Flash controller requests the next write word.
    pub const FLASH: u8 = 0x12;
    /// Debug interface burst-write lands a byte in DBGDATA.
    pub const DBG_BW: u8 = 0x1F;
}

/// One DMA channel configuration.
///
/// `Default` gives a single-beat, non-incrementing, 8-bit transfer with no
/// interrupt, matching the controller's reset expectations; callers override
/// the fields they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaRequest {
    pub src: u16,
    pub dst: u16,
    /// Transfer count, 13 bits.
    pub len: u16,
    /// VLEN[2:0], variable-length mode.
    pub vlen: u8,
    /// TRIG[4:0], the event that advances the channel.
    pub trigger: u8,
    /// 16-bit beats when set.
    pub word: bool,
    /// TMODE[1:0].
    pub transfer_mode: u8,
    /// SRCINC[1:0].
    pub src_inc: u8,
    /// DSTINC[1:0].
    pub dst_inc: u8,
    /// Raise the channel's DMAIRQ bit on completion.
    pub interrupt: bool,
    /// 8-bit beats when set; note the encoded M8 field has inverted polarity.
    pub m8: bool,
    /// PRIORITY[1:0].
    pub priority: u8,
}

impl Default for DmaRequest {
    fn default() -> Self {
        Self {
            src: 0,
            dst: 0,
            len: 1,
            vlen: 0,
            trigger: 0,
            word: false,
            transfer_mode: 0,
            src_inc: 0,
            dst_inc: 0,
            interrupt: false,
            m8: true,
            priority: 0,
        }
    }
}

impl DmaRequest {
    /// Encode into the controller's 8-byte descriptor layout.
    ///
    /// Field packing, byte by byte:
    ///
    /// ```text
    /// 0  SRCADDR[15:8]      4  VLEN[2:0] << 5 | LEN[12:8]
    /// 1  SRCADDR[7:0]       5  LEN[7:0]
    /// 2  DSTADDR[15:8]      6  WORDSIZE << 7 | TMODE << 5 | TRIG[4:0]
    /// 3  DSTADDR[7:0]       7  SRCINC << 6 | DSTINC << 4 | IRQMASK << 3
    ///                          | M8 << 2 | PRIORITY[1:0]
    /// ```
    ///
    /// The encoded M8 bit is the inverse of [`m8`](Self::m8): a set field
    /// tells the controller to use 7-bit transfers.
    pub fn encode(&self) -> [u8; 8] {
        let [src_hi, src_lo] = self.src.to_be_bytes();
        let [dst_hi, dst_lo] = self.dst.to_be_bytes();
        [
            src_hi,
            src_lo,
            dst_hi,
            dst_lo,
            (self.vlen & 0x07) << 5 | ((self.len >> 8) as u8 & 0x1F),
            self.len as u8,
            (u8::from(self.word) << 7) | ((self.transfer_mode & 0x03) << 5) | (self.trigger & 0x1F),
            ((self.src_inc & 0x03) << 6)
                | ((self.dst_inc & 0x03) << 4)
                | (u8::from(self.interrupt) << 3)
                | (u8::from(!self.m8) << 2)
                | (self.priority & 0x03),
        ]
    }
}

impl<W: Read + Write> Debugger<W> {
    /// Write `index`'s descriptor at the default base and point the
    /// controller at it.
    pub fn config_dma_channel(&mut self, index: u8, request: &DmaRequest) -> Result<()> {
        self.config_dma_channel_at(index, request, DESC_BASE)
    }

    /// Same, with an explicit descriptor base address.
    pub fn config_dma_channel_at(
        &mut self,
        index: u8,
        request: &DmaRequest,
        mem_base: u16,
    ) -> Result<()> {
        let desc_addr = mem_base + u16::from(index) * 8;
        self.write_xdata(desc_addr, &request.encode())?;

        if index == 0 {
            let [hi, lo] = desc_addr.to_be_bytes();
            self.write_register(sfr::DMA0CFGL, lo)?;
            self.write_register(sfr::DMA0CFGH, hi)?;
        } else {
            // Channels 1..4 share one register pair: the controller walks
            // their descriptors sequentially from mem_base + 8.
            let [hi, lo] = (mem_base + 8).to_be_bytes();
            self.write_register(sfr::DMA1CFGL, lo)?;
            self.write_register(sfr::DMA1CFGH, hi)?;
        }
        Ok(())
    }

    /// Arm channel `index` and give the controller time to latch the
    /// descriptor before the next debug command.
    pub fn arm_dma_channel(&mut self, index: u8) -> Result<()> {
        let armed = self.read_register(sfr::DMAARM)?;
        self.write_register(sfr::DMAARM, armed | (1 << index))?;
        thread::sleep(DMA_SETTLE);
        Ok(())
    }

    pub fn disarm_dma_channel(&mut self, index: u8) -> Result<()> {
        let armed = self.read_register(sfr::DMAARM)?;
        self.write_register(sfr::DMAARM, armed & !(1 << index))
    }

    /// Whether channel `index` has signalled completion.
    pub fn dma_irq_raised(&mut self, index: u8) -> Result<bool> {
        let pending = self.read_register(sfr::DMAIRQ)?;
        Ok(pending & (1 << index) != 0)
    }

    pub fn clear_dma_irq(&mut self, index: u8) -> Result<()> {
        let pending = self.read_register(sfr::DMAIRQ)?;
        self.write_register(sfr::DMAIRQ, pending & !(1 << index))
    }

    /// Pause or resume DMA while in debug mode.
    pub fn pause_dma(&mut self, pause: bool) -> Result<()> {
        let mut config = self.read_config()?;
        config.set(DebugConfig::DMA_PAUSE, pause);
        self.write_config(config)?;
        Ok(())
    }
}
