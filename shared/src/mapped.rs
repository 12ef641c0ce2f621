//! Bounded access to memory-mapped flash

use crate::Error;
use core::ops::Range;

/// The value every byte has after an erase
pub const ERASED_BYTE: u8 = 0xFF;

/// A read-only view of a memory-mapped flash region.
///
/// Flash is readable like normal memory, so reads are plain loads from the mapped bytes.
/// Every access is checked against the bounds of the region.
#[derive(Debug, Copy, Clone)]
pub struct MappedRegion<'flash> {
    base: u32,
    bytes: &'flash [u8],
}

impl<'flash> MappedRegion<'flash> {
    /// Create a view of `bytes`, which are mapped at address `base`
    pub fn new(base: u32, bytes: &'flash [u8]) -> Self {
        Self { base, bytes }
    }

    /// The address range covered by the region
    pub fn address_range(&self) -> Range<u32> {
        self.base..self.base + self.bytes.len() as u32
    }

    /// Returns true if the whole span `address..address + len` lies inside the region
    pub fn contains(&self, address: u32, len: u32) -> bool {
        self.index_range(address, len).is_some()
    }

    /// Returns the raw bytes of the span `address..address + len`
    pub fn slice(&self, address: u32, len: u32) -> Result<&'flash [u8], Error> {
        self.index_range(address, len)
            .map(|range| &self.bytes[range])
            .ok_or(Error::AddressRange { address, len })
    }

    /// Reads the native-endian halfword at `address`
    pub fn get_u16(&self, address: u32) -> Result<u16, Error> {
        let mut raw = [0; 2];
        raw.copy_from_slice(self.slice(address, 2)?);
        Ok(u16::from_ne_bytes(raw))
    }

    /// Reads the native-endian word at `address`
    pub fn get_u32(&self, address: u32) -> Result<u32, Error> {
        let mut raw = [0; 4];
        raw.copy_from_slice(self.slice(address, 4)?);
        Ok(u32::from_ne_bytes(raw))
    }

    /// Returns true if every byte of the span reads as erased
    pub fn is_erased(&self, address: u32, len: u32) -> Result<bool, Error> {
        Ok(self
            .slice(address, len)?
            .iter()
            .all(|byte| *byte == ERASED_BYTE))
    }

    fn index_range(&self, address: u32, len: u32) -> Option<Range<usize>> {
        let start = address.checked_sub(self.base)? as usize;
        let end = start.checked_add(len as usize)?;
        (end <= self.bytes.len()).then_some(start..end)
    }
}
