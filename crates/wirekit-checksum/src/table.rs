//! CRC lookup tables.
//!
//! Tables are MSB-first (non-reflected) and keyed by `(width, poly)`.
//! The common polynomials are compile-time constants; any other table is
//! built on first use, leaked, and shared read-only for the rest of the
//! process.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use tracing::debug;

pub(crate) type Table = [u64; 256];

pub(crate) const fn width_mask(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

pub(crate) const fn build(width: u8, poly: u64) -> Table {
    let mask = width_mask(width);
    let top = 1u64 << (width - 1);
    let mut table = [0u64; 256];
    let mut idx = 0;
    while idx < 256 {
        let mut reg = (idx as u64) << (width - 8);
        let mut bit = 0;
        while bit < 8 {
            reg = if reg & top != 0 {
                (reg << 1) ^ poly
            } else {
                reg << 1
            };
            bit += 1;
        }
        table[idx] = reg & mask;
        idx += 1;
    }
    table
}

static CRC16_1021: Table = build(16, 0x1021);
static CRC16_8005: Table = build(16, 0x8005);
static CRC32_04C11DB7: Table = build(32, 0x04C1_1DB7);

static BUILT: Lazy<Mutex<HashMap<(u8, u64), &'static Table>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The table for `(width, poly)`, building it on first use.
pub(crate) fn lookup(width: u8, poly: u64) -> &'static Table {
    match (width, poly) {
        (16, 0x1021) => return &CRC16_1021,
        (16, 0x8005) => return &CRC16_8005,
        (32, 0x04C1_1DB7) => return &CRC32_04C11DB7,
        _ => {}
    }

    let mut built = BUILT.lock().unwrap_or_else(PoisonError::into_inner);
    *built.entry((width, poly)).or_insert_with(|| {
        debug!(width, poly, "building crc table");
        let table: &'static Table = Box::leak(Box::new(build(width, poly)));
        table
    })
}
