// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounds-checked reader for the fixed, big-endian binary layouts of wire messages, persisted
//! sessions and ephemeral keys.
use thiserror::Error;
use uuid::Uuid;

pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::UnexpectedEnd {
                position: self.position,
                needed: len,
            })?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, CodecError> {
        Ok(Uuid::from_bytes(self.read_array()?))
    }

    /// Reads an element count and checks that at least `count * min_item_size` bytes remain, so
    /// a forged count can not make us allocate more than the input could ever hold.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<usize, CodecError> {
        let count = self.read_u64()?;
        let count = usize::try_from(count).map_err(|_| CodecError::InvalidCount(count))?;
        let needed = count
            .checked_mul(min_item_size)
            .ok_or(CodecError::InvalidCount(count as u64))?;
        if needed > self.remaining() {
            return Err(CodecError::InvalidCount(count as u64));
        }
        Ok(count)
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Fails if any unread bytes are left.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(CodecError::TrailingBytes(trailing)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input at byte {position}, needed {needed} more bytes")]
    UnexpectedEnd { position: usize, needed: usize },

    #[error("{0} trailing bytes after end of input")]
    TrailingBytes(usize),

    #[error("element count {0} exceeds input size")]
    InvalidCount(u64),
}
