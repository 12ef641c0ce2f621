#![doc = include_str!("../../README.md")]
#![no_std]
#![warn(missing_docs)]

#[cfg(not(any(test, feature = "std-compat")))]
mod linker_flash_addresses;
#[cfg(not(any(test, feature = "std-compat")))]
/// Helper functions for finding the flash addresses of the memory regions more easily
pub mod flash_addresses {
    pub use crate::linker_flash_addresses::*;
}

#[cfg(any(test, feature = "std-compat"))]
mod std_compat_flash_addresses;
#[cfg(any(test, feature = "std-compat"))]
/// Helper functions for finding the flash addresses of the memory regions more easily
pub mod flash_addresses {
    pub use crate::std_compat_flash_addresses::*;
}

pub mod data;
mod error;
pub mod mapped;
pub mod report;
#[cfg(any(test, feature = "std-compat"))]
pub mod sim;

pub use data::{flash_read_data, flash_write_data, DataWidth};
pub use error::Error;
pub use mapped::MappedRegion;

/// A trait defining the common flash operations
///
/// The unlock/erase/program/lock primitives of the flash controller. The firmware implements this
/// on the real peripheral, the tests on a simulated backing store.
pub trait Flash {
    /// Enable erase and program access to the flash
    fn unlock(&mut self) -> Result<(), Error>;

    /// Disable erase and program access to the flash
    fn lock(&mut self) -> Result<(), Error>;

    /// Erase the page that starts at the given address.
    /// All bits of the page are set to 1 afterwards.
    fn erase_page(&mut self, page_address: u32) -> Result<(), Error>;

    /// Program one halfword.
    /// The target halfword must be erased, programming can only clear bits.
    fn program_half_word(&mut self, address: u32, half_word: u16) -> Result<(), Error>;

    /// Program one word as two halfwords, the low halfword at `address` and the high one at `address + 2`
    fn program_word(&mut self, address: u32, word: u32) -> Result<(), Error> {
        self.program_half_word(address, word as u16)?;
        self.program_half_word(address + 2, (word >> 16) as u16)
    }

    /// The size of an erasable page in bytes
    fn page_size(&self) -> u32;

    /// Read-only view of the memory-mapped flash
    fn mapped(&self) -> MappedRegion<'_>;
}
