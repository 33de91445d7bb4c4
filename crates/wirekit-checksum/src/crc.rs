//! Table-driven CRC.

use crate::error::{ChecksumError, Result};
use crate::table::{self, width_mask, Table};
use crate::Checksum;

/// Parameters of a CRC in the usual Rocksoft form.
///
/// `init` is loaded into the register unreflected; `reflect_in` reverses
/// each input byte and `reflect_out` reverses the final register before
/// `xor_out` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrcParams {
    pub width: u8,
    pub poly: u64,
    pub init: u64,
    pub xor_out: u64,
    pub reflect_in: bool,
    pub reflect_out: bool,
}

impl CrcParams {
    pub const CRC_8: CrcParams = CrcParams {
        width: 8,
        poly: 0x07,
        init: 0,
        xor_out: 0,
        reflect_in: false,
        reflect_out: false,
    };

    /// CRC-16/CCITT-FALSE, the usual "CRC-CCITT".
    pub const CRC_16_CCITT: CrcParams = CrcParams {
        width: 16,
        poly: 0x1021,
        init: 0xFFFF,
        xor_out: 0,
        reflect_in: false,
        reflect_out: false,
    };

    pub const CRC_16_XMODEM: CrcParams = CrcParams {
        width: 16,
        poly: 0x1021,
        init: 0,
        xor_out: 0,
        reflect_in: false,
        reflect_out: false,
    };

    /// CRC-16/ARC, the usual "CRC-16".
    pub const CRC_16: CrcParams = CrcParams {
        width: 16,
        poly: 0x8005,
        init: 0,
        xor_out: 0,
        reflect_in: true,
        reflect_out: true,
    };

    pub const CRC_32: CrcParams = CrcParams {
        width: 32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        xor_out: 0xFFFF_FFFF,
        reflect_in: true,
        reflect_out: true,
    };

    /// CRC-32C (Castagnoli).
    pub const CRC_32C: CrcParams = CrcParams {
        width: 32,
        poly: 0x1EDC_6F41,
        init: 0xFFFF_FFFF,
        xor_out: 0xFFFF_FFFF,
        reflect_in: true,
        reflect_out: true,
    };

    /// Check that the width is supported and every value fits in it.
    pub fn validate(&self) -> Result<()> {
        if !(8..=64).contains(&self.width) {
            return Err(ChecksumError::InvalidWidth(self.width));
        }
        let mask = width_mask(self.width);
        for (name, value) in [
            ("poly", self.poly),
            ("init", self.init),
            ("xor_out", self.xor_out),
        ] {
            if value & !mask != 0 {
                return Err(ChecksumError::ValueTooWide {
                    name,
                    value,
                    width: self.width,
                });
            }
        }
        Ok(())
    }
}

fn reflect(value: u64, bits: u8) -> u64 {
    value.reverse_bits() >> (64 - u32::from(bits))
}

/// A CRC bound to its lookup table.
#[derive(Debug, Clone, Copy)]
pub struct Crc {
    params: CrcParams,
    table: &'static Table,
}

impl PartialEq for Crc {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl Eq for Crc {}

impl Crc {
    pub fn new(params: CrcParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::preset(params))
    }

    fn preset(params: CrcParams) -> Self {
        Self {
            params,
            table: table::lookup(params.width, params.poly),
        }
    }

    pub fn crc8() -> Self {
        Self::preset(CrcParams::CRC_8)
    }

    /// CRC-CCITT: 16 bit, poly 0x1021, init 0xFFFF, no reflection.
    pub fn ccitt() -> Self {
        Self::preset(CrcParams::CRC_16_CCITT)
    }

    pub fn xmodem() -> Self {
        Self::preset(CrcParams::CRC_16_XMODEM)
    }

    /// CRC-16: poly 0x8005, fully reflected.
    pub fn crc16() -> Self {
        Self::preset(CrcParams::CRC_16)
    }

    pub fn crc32() -> Self {
        Self::preset(CrcParams::CRC_32)
    }

    pub fn crc32c() -> Self {
        Self::preset(CrcParams::CRC_32C)
    }

    pub fn params(&self) -> &CrcParams {
        &self.params
    }

    /// Serialized width of the result in bytes.
    pub fn result_bytes(&self) -> usize {
        usize::from(self.params.width).div_ceil(8)
    }

    /// Initial register value for incremental use.
    pub fn start(&self) -> u64 {
        self.params.init
    }

    /// Feed `data` into `reg`.
    pub fn update(&self, mut reg: u64, data: &[u8]) -> u64 {
        let width = self.params.width;
        let shift = width - 8;
        let mask = width_mask(width);
        for &byte in data {
            let byte = if self.params.reflect_in {
                byte.reverse_bits()
            } else {
                byte
            };
            let idx = usize::from((reg >> shift) as u8 ^ byte);
            reg = (self.table[idx] ^ (reg << 8)) & mask;
        }
        reg
    }

    /// Turn a register into the final checksum value.
    pub fn finish(&self, reg: u64) -> u64 {
        let width = self.params.width;
        let reg = if self.params.reflect_out {
            reflect(reg, width)
        } else {
            reg
        };
        (reg ^ self.params.xor_out) & width_mask(width)
    }
}

impl Checksum for Crc {
    fn calc(&self, data: &[u8]) -> u64 {
        self.finish(self.update(self.start(), data))
    }
}
