use crate::Checksum;

fn width_mask(bytes: usize) -> u64 {
    if bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (bytes * 8)) - 1
    }
}

/// Arithmetic sum of all bytes, truncated to `bytes` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicSum {
    bytes: usize,
    init: u64,
}

impl BasicSum {
    /// Panics unless `bytes` is in `1..=8`.
    pub fn new(bytes: usize) -> Self {
        assert!((1..=8).contains(&bytes), "sum width must be 1..=8 bytes");
        Self { bytes, init: 0 }
    }

    pub fn with_init(mut self, init: u64) -> Self {
        self.init = init;
        self
    }

    pub fn result_bytes(&self) -> usize {
        self.bytes
    }
}

impl Checksum for BasicSum {
    fn calc(&self, data: &[u8]) -> u64 {
        data.iter()
            .fold(self.init, |acc, &b| acc.wrapping_add(u64::from(b)))
            & width_mask(self.bytes)
    }
}

/// XOR of all bytes, truncated to `bytes` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicXor {
    bytes: usize,
    init: u64,
}

impl BasicXor {
    /// Panics unless `bytes` is in `1..=8`.
    pub fn new(bytes: usize) -> Self {
        assert!((1..=8).contains(&bytes), "xor width must be 1..=8 bytes");
        Self { bytes, init: 0 }
    }

    pub fn with_init(mut self, init: u64) -> Self {
        self.init = init;
        self
    }

    pub fn result_bytes(&self) -> usize {
        self.bytes
    }
}

impl Checksum for BasicXor {
    fn calc(&self, data: &[u8]) -> u64 {
        data.iter().fold(self.init, |acc, &b| acc ^ u64::from(b)) & width_mask(self.bytes)
    }
}
