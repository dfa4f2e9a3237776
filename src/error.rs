use std::io;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between the host and the chip.
///
/// Transport faults surface immediately and are never retried. Flash faults
/// carry the code address up to which programming succeeded; nothing is
/// rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened.
    #[error("could not open serial port {port}")]
    PortOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// The proxy did not answer the initial ping with a valid ACK.
    #[error("no proxy answered on the serial link")]
    ProxyUnreachable,

    /// The connected chip is not a CC2540/CC2541.
    #[error("unsupported chip id {id:#06x} (expected high byte 0x8d)")]
    UnsupportedChip { id: u16 },

    /// The proxy acknowledged a command with its error response.
    #[error("proxy signalled error code {code:#04x}")]
    Proxy { code: u8 },

    /// The proxy answered with a byte that is neither ACK nor error.
    #[error("malformed acknowledgment byte {byte:#04x}")]
    BadAck { byte: u8 },

    /// The serial link failed or timed out mid-response.
    #[error("serial link i/o")]
    Io(#[from] io::Error),

    /// A burst-write payload was empty or exceeded the 2 KiB DBGDATA window.
    #[error("burst payload of {len} bytes is outside the 1..=2048 byte DBGDATA window")]
    BurstTooLarge { len: usize },

    /// The flash controller raised its FULL bit while programming.
    #[error("flash write buffer full at code address {addr:#07x}")]
    FlashFull { addr: u32 },

    /// The flash controller raised its ABORT bit while programming.
    #[error("flash operation aborted at code address {addr:#07x}")]
    FlashAbort { addr: u32 },

    /// A BUSY or DMA-IRQ poll loop exceeded its deadline.
    #[error("timed out after {timeout:?} waiting for {waiting} at code address {addr:#07x}")]
    FlashTimeout {
        addr: u32,
        waiting: &'static str,
        timeout: Duration,
    },
}
