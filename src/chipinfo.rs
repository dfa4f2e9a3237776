//! Decoders for the chip's identification and information regions.

use std::io::{Read, Write};

use crate::debugger::Debugger;
use crate::error::Result;
use crate::regs::{xdata, BLE_INFO_ADDR, BLE_INFO_LEN};

/// Capabilities advertised by the two chip-info registers at XDATA 0x6276.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    /// Flash size in KiB.
    pub flash_kb: u32,
    /// USB controller present.
    pub has_usb: bool,
    /// Number of SRAM banks.
    pub sram_banks: u8,
}

impl ChipInfo {
    pub fn decode(info: [u8; 2]) -> Self {
        Self {
            flash_kb: 1 << (4 + ((info[0] >> 4) & 0x07)),
            has_usb: info[0] & 0x08 != 0,
            sram_banks: (info[1] & 0x07) + 1,
        }
    }
}

/// Manufacturing fields kept in the last 64 bytes of the last flash page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleInfo {
    /// 32-byte license key, rendered as lowercase hex.
    pub license: String,
    pub hw_version: u8,
    /// Bluetooth address, `aa:bb:cc:dd:ee:ff`.
    pub bt_addr: String,
    pub lock_bits: [u8; 16],
}

impl BleInfo {
    pub fn decode(page: &[u8; BLE_INFO_LEN]) -> Self {
        let bt_addr = page[42..48]
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        let mut lock_bits = [0u8; 16];
        lock_bits.copy_from_slice(&page[48..64]);
        Self {
            license: hex_string(&page[7..39]),
            hw_version: page[39],
            bt_addr,
            lock_bits,
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl<W: Read + Write> Debugger<W> {
    /// Chip capabilities; read from the chip once, then served from cache.
    pub fn chip_info(&mut self) -> Result<ChipInfo> {
        if let Some(info) = self.chip_info {
            return Ok(info);
        }
        let raw = self.read_xdata(xdata::CHIP_INFO, 2)?;
        let info = ChipInfo::decode([raw[0], raw[1]]);
        self.chip_info = Some(info);
        Ok(info)
    }

    /// Serial number string: the six IEEE-address bytes, most significant
    /// first, as lowercase hex.
    pub fn serial(&mut self) -> Result<String> {
        let mut bytes = self.read_xdata(xdata::IEEE_ADDR, 6)?;
        bytes.reverse();
        Ok(hex_string(&bytes))
    }

    /// The read-only 2 KiB information page.
    pub fn info_page(&mut self) -> Result<Vec<u8>> {
        self.read_xdata(xdata::INFO_PAGE, 0x800)
    }

    /// Raw 64-byte manufacturing block at the top of flash.
    pub fn ble_info_page(&mut self) -> Result<[u8; BLE_INFO_LEN]> {
        let raw = self.read_code(BLE_INFO_ADDR, BLE_INFO_LEN)?;
        let mut page = [0u8; BLE_INFO_LEN];
        page.copy_from_slice(&raw);
        Ok(page)
    }

    pub fn ble_info(&mut self) -> Result<BleInfo> {
        Ok(BleInfo::decode(&self.ble_info_page()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_256k_usb_part() {
        // Flash exponent 4 (2^(4+4) = 256 KiB), USB bit set, three SRAM banks.
        let info = ChipInfo::decode([0x48, 0x02]);
        assert_eq!(info.flash_kb, 256);
        assert!(info.has_usb);
        assert_eq!(info.sram_banks, 3);
    }

    #[test]
    fn decodes_the_smallest_part_without_usb() {
        let info = ChipInfo::decode([0x00, 0x00]);
        assert_eq!(info.flash_kb, 16);
        assert!(!info.has_usb);
        assert_eq!(info.sram_banks, 1);
    }

    #[test]
    fn ble_info_slices_the_page_fields() {
        let mut page = [0u8; BLE_INFO_LEN];
        for (i, byte) in page.iter_mut().enumerate() {
            *byte = i as u8;
        }
        page[39] = 0x42;
        let info = BleInfo::decode(&page);
        assert_eq!(info.license.len(), 64);
        assert!(info.license.starts_with("0708090a"));
        assert_eq!(info.hw_version, 0x42);
        assert_eq!(info.bt_addr, "2a:2b:2c:2d:2e:2f");
        assert_eq!(info.lock_bits[0], 48);
        assert_eq!(info.lock_bits[15], 63);
    }

    #[test]
    fn hex_rendering_is_lowercase_and_zero_padded() {
        assert_eq!(hex_string(&[0x0A, 0xFF, 0x00]), "0aff00");
    }
}
