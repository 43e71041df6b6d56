//! Fixed 6-byte circle records and the buffer that holds them.
//!
//! Layout, with the two 12-bit coordinates packed big-endian:
//!
//! ```text
//! byte0 = x[11:4]
//! byte1 = x[3:0] << 4 | y[11:8]
//! byte2 = y[7:0]
//! byte3..6 = r, g, b
//! ```

use crate::error::{MosaicError, Result};

pub const RECORD_LEN: usize = 6;
pub const MAX_COORD: u16 = 0x0FFF;

/// One sampled circle: canvas position plus the source color under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sample {
    pub x: u16,
    pub y: u16,
    pub rgb: [u8; 3],
}

impl Sample {
    pub const fn new(x: u16, y: u16, rgb: [u8; 3]) -> Self {
        Self { x, y, rgb }
    }

    /// Pack into a record.
    ///
    /// # Errors
    /// Returns [`MosaicError::EncodingRange`] if either coordinate needs more than 12 bits.
    pub fn encode(&self) -> Result<[u8; RECORD_LEN]> {
        if self.x > MAX_COORD || self.y > MAX_COORD {
            return Err(MosaicError::EncodingRange {
                x: u32::from(self.x),
                y: u32::from(self.y),
            });
        }
        let [r, g, b] = self.rgb;
        Ok([
            (self.x >> 4) as u8,
            (((self.x & 0xF) << 4) as u8) | ((self.y >> 8) & 0xF) as u8,
            (self.y & 0xFF) as u8,
            r,
            g,
            b,
        ])
    }

    pub fn decode(record: &[u8; RECORD_LEN]) -> Self {
        let x = (u16::from(record[0]) << 4) | (u16::from(record[1]) >> 4);
        let y = (u16::from(record[1] & 0xF) << 8) | u16::from(record[2]);
        Self {
            x,
            y,
            rgb: [record[3], record[4], record[5]],
        }
    }
}

/// Immutable run of encoded records in playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBuffer {
    bytes: Vec<u8>,
}

impl PackedBuffer {
    /// Encode samples in the order given.
    ///
    /// # Errors
    /// Fails with [`MosaicError::EncodingRange`] on the first out-of-range sample and
    /// with [`MosaicError::InvalidBufferLayout`] when `samples` is empty.
    pub fn encode_all(samples: &[Sample]) -> Result<Self> {
        let mut bytes = Vec::with_capacity(samples.len() * RECORD_LEN);
        for sample in samples {
            bytes.extend_from_slice(&sample.encode()?);
        }
        Self::from_bytes(bytes)
    }

    /// Wrap raw bytes, checking the record layout.
    ///
    /// # Errors
    /// Returns [`MosaicError::InvalidBufferLayout`] if `bytes` is empty or not a
    /// multiple of [`RECORD_LEN`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % RECORD_LEN != 0 {
            return Err(MosaicError::InvalidBufferLayout { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.bytes.len() / RECORD_LEN
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Decode the record at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Sample> {
        let start = index.checked_mul(RECORD_LEN)?;
        let chunk = self.bytes.get(start..start + RECORD_LEN)?;
        let record: &[u8; RECORD_LEN] = chunk.try_into().ok()?;
        Some(Sample::decode(record))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Sample> + '_ {
        self.bytes.chunks_exact(RECORD_LEN).map(|chunk| {
            let mut record = [0u8; RECORD_LEN];
            record.copy_from_slice(chunk);
            Sample::decode(&record)
        })
    }
}
