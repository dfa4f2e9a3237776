//! Host-side debugger and flash programmer for TI CC2540/CC2541 SoCs.
//!
//! The chip sits behind a serial-attached microcontroller ("the proxy")
//! that exposes its two-wire debug interface as a small binary command
//! protocol: enter/exit debug mode, single-step, read/write the debug
//! configuration, execute one- to three-byte CPU instructions, and
//! burst-write into the DBGDATA mailbox. From those primitives this crate
//! synthesizes XDATA and code-space access, SFR reads and writes, DMA
//! descriptor programming, and a two-channel DMA flash-programming sequence
//! with optional per-page erase.
//!
//! A session is a [`Debugger`] value that owns its serial port exclusively;
//! every operation is blocking request/response. There is no internal
//! concurrency and the type is not meant to be shared across threads.
//!
//! ```no_run
//! use ccdbg::{Debugger, FlashOptions};
//!
//! # fn main() -> ccdbg::Result<()> {
//! let mut dbg = Debugger::open("/dev/ttyUSB0")?;
//! dbg.enter_debug()?;
//! println!("chip {:#06x}: {:?}", dbg.chip_id(), dbg.chip_info()?);
//!
//! dbg.pause_dma(false)?;
//! let firmware = std::fs::read("firmware.bin")?;
//! dbg.write_code(
//!     0,
//!     &firmware,
//!     &FlashOptions {
//!         erase: true,
//!         ..Default::default()
//!     },
//! )?;
//! dbg.resume()?;
//! # Ok(())
//! # }
//! ```

pub mod chipinfo;
pub mod debugger;
pub mod dma;
pub mod error;
pub mod flash;
pub mod regs;
pub mod transport;

pub use chipinfo::{BleInfo, ChipInfo};
pub use debugger::Debugger;
pub use dma::DmaRequest;
pub use error::{Error, Result};
pub use flash::{FlashAddr, FlashOptions};
pub use regs::{DebugConfig, DebugStatus, Fctl};
