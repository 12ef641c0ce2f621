//! A RAM backed [Flash] for running the flash logic off-target
//!
//! Behaves like the STM32F1 flash controller: erase and program need the flash to be unlocked,
//! halfwords can only be programmed when they are erased (or to zero), and write protected pages
//! refuse to be erased or programmed. Faulty cells can be simulated by sticking bits.

use crate::{mapped::ERASED_BYTE, Error, Flash, MappedRegion};
use core::ops::Range;

/// Simulated flash of `SIZE` bytes
pub struct SimulatedFlash<const SIZE: usize> {
    base: u32,
    page_size: u32,
    memory: [u8; SIZE],
    stuck_at_zero: [u8; SIZE],
    stuck_at_one: [u8; SIZE],
    write_protected: Range<u32>,
    locked: bool,
    fail_unlock: bool,
    erase_count: usize,
    program_count: usize,
}

impl<const SIZE: usize> SimulatedFlash<SIZE> {
    /// Creates an erased and locked flash mapped at `base`
    pub fn new(base: u32, page_size: u32) -> Self {
        assert!(
            page_size > 0 && SIZE % page_size as usize == 0,
            "The flash must consist of whole pages"
        );

        Self {
            base,
            page_size,
            memory: [ERASED_BYTE; SIZE],
            stuck_at_zero: [0; SIZE],
            stuck_at_one: [0; SIZE],
            write_protected: 0..0,
            locked: true,
            fail_unlock: false,
            erase_count: 0,
            program_count: 0,
        }
    }

    /// Returns true if the flash refuses erase and program operations
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The number of page erases performed
    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    /// The number of halfwords programmed
    pub fn program_count(&self) -> usize {
        self.program_count
    }

    /// Makes the unlock sequence fail, as if the key register were locked until reset
    pub fn fail_unlock(&mut self, fail: bool) {
        self.fail_unlock = fail;
    }

    /// Write protects all pages overlapping `range`
    pub fn write_protect(&mut self, range: Range<u32>) {
        self.write_protected = range;
    }

    /// The bits set in `mask` of the byte at `address` always read as 0
    pub fn stick_bits_at_zero(&mut self, address: u32, mask: u8) {
        let index = self.index(address).expect("Address lies outside of the flash");
        self.stuck_at_zero[index] |= mask;
        self.apply_stuck_bits(index);
    }

    /// The bits set in `mask` of the byte at `address` always read as 1
    pub fn stick_bits_at_one(&mut self, address: u32, mask: u8) {
        let index = self.index(address).expect("Address lies outside of the flash");
        self.stuck_at_one[index] |= mask;
        self.apply_stuck_bits(index);
    }

    fn index(&self, address: u32) -> Option<usize> {
        let index = address.checked_sub(self.base)? as usize;
        (index < SIZE).then_some(index)
    }

    fn is_write_protected(&self, address: u32) -> bool {
        let page_start = address - (address - self.base) % self.page_size;
        page_start < self.write_protected.end
            && self.write_protected.start < page_start + self.page_size
    }

    fn apply_stuck_bits(&mut self, index: usize) {
        self.memory[index] =
            (self.memory[index] & !self.stuck_at_zero[index]) | self.stuck_at_one[index];
    }
}

impl<const SIZE: usize> Flash for SimulatedFlash<SIZE> {
    fn unlock(&mut self) -> Result<(), Error> {
        if self.fail_unlock {
            return Err(Error::Lock);
        }
        self.locked = false;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), Error> {
        self.locked = true;
        Ok(())
    }

    fn erase_page(&mut self, page_address: u32) -> Result<(), Error> {
        if self.locked {
            return Err(Error::Lock);
        }

        let start = match self.index(page_address) {
            Some(start) if start % self.page_size as usize == 0 => start,
            _ => return Err(Error::Erase { page_address }),
        };
        if self.is_write_protected(page_address) {
            return Err(Error::Erase { page_address });
        }

        for index in start..start + self.page_size as usize {
            self.memory[index] = ERASED_BYTE;
            self.apply_stuck_bits(index);
        }
        self.erase_count += 1;

        Ok(())
    }

    fn program_half_word(&mut self, address: u32, half_word: u16) -> Result<(), Error> {
        if self.locked {
            return Err(Error::Lock);
        }

        let index = match self.index(address) {
            Some(index) if index % 2 == 0 && index + 2 <= SIZE => index,
            _ => return Err(Error::Program { address }),
        };
        if self.is_write_protected(address) {
            return Err(Error::Program { address });
        }

        let current = u16::from_ne_bytes([self.memory[index], self.memory[index + 1]]);
        // The controller only accepts zero as a value for a halfword that isn't erased
        if current != 0xFFFF && half_word != 0 {
            return Err(Error::Program { address });
        }

        for (offset, byte) in (current & half_word).to_ne_bytes().into_iter().enumerate() {
            self.memory[index + offset] = byte;
            self.apply_stuck_bits(index + offset);
        }
        self.program_count += 1;

        Ok(())
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn mapped(&self) -> MappedRegion<'_> {
        MappedRegion::new(self.base, &self.memory)
    }
}
