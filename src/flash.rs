//! Implementation of [Flash] on the STM32F1 flash controller

use flash_data::{flash_addresses::FLASH_BASE, Error, Flash, MappedRegion};
use stm32f1xx_hal::pac;

const UNLOCK_KEY1: u32 = 0x4567_0123;
const UNLOCK_KEY2: u32 = 0xCDEF_89AB;

#[cfg(not(feature = "high-density"))]
const PAGE_SIZE: u32 = 0x400; // 1KB
#[cfg(feature = "high-density")]
const PAGE_SIZE: u32 = 0x800; // 2KB

/// The firmware's implementation of the flash operations
pub struct Stm32Flash<'a> {
    pub registers: &'a pac::flash::RegisterBlock,
    /// Size of the flash in bytes
    pub size: usize,
}

impl<'a> Stm32Flash<'a> {
    /// Reads the flash size of the device from the flash size register
    pub fn device_size() -> usize {
        // This register is always readable and holds the size in KB
        let kilobytes = unsafe {
            core::ptr::read_volatile(flash_data::flash_addresses::FLASH_SIZE_REGISTER as *const u16)
        };
        kilobytes as usize * 1024
    }

    fn wait_ready(&self) {
        while self.registers.sr.read().bsy().bit_is_set() {}
    }

    /// Reads and clears the error flags of the last operation.
    /// Returns true if there was an error.
    fn take_errors(&self) -> bool {
        let sr = self.registers.sr.read();
        let failed = sr.pgerr().bit_is_set() || sr.wrprterr().bit_is_set();
        // The flags are cleared by writing 1
        self.registers
            .sr
            .write(|w| w.pgerr().set_bit().wrprterr().set_bit());
        failed
    }
}

impl<'a> Flash for Stm32Flash<'a> {
    #[allow(unused_unsafe)]
    fn unlock(&mut self) -> Result<(), Error> {
        self.wait_ready();

        if self.registers.cr.read().lock().bit_is_clear() {
            return Ok(());
        }

        // The keys must be written in this order, a wrong write locks the controller until reset
        self.registers.keyr.write(|w| unsafe { w.key().bits(UNLOCK_KEY1) });
        self.registers.keyr.write(|w| unsafe { w.key().bits(UNLOCK_KEY2) });

        match self.registers.cr.read().lock().bit_is_clear() {
            true => Ok(()),
            false => Err(Error::Lock),
        }
    }

    fn lock(&mut self) -> Result<(), Error> {
        self.wait_ready();

        self.registers.cr.modify(|_, w| w.lock().set_bit());

        match self.registers.cr.read().lock().bit_is_set() {
            true => Ok(()),
            false => Err(Error::Lock),
        }
    }

    #[allow(unused_unsafe)]
    fn erase_page(&mut self, page_address: u32) -> Result<(), Error> {
        self.wait_ready();
        self.take_errors();

        // Select page erase, set the page and start
        self.registers.cr.modify(|_, w| w.per().set_bit());
        self.registers.ar.write(|w| unsafe { w.far().bits(page_address) });
        self.registers.cr.modify(|_, w| w.strt().set_bit());

        // Wait for the erase to be done
        self.wait_ready();

        self.registers.cr.modify(|_, w| w.per().clear_bit());

        // Synchronize the changes
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        match self.take_errors() {
            true => Err(Error::Erase { page_address }),
            false => Ok(()),
        }
    }

    fn program_half_word(&mut self, address: u32, half_word: u16) -> Result<(), Error> {
        self.wait_ready();
        self.take_errors();

        self.registers.cr.modify(|_, w| w.pg().set_bit());
        // The programming is started by a halfword write to the flash address.
        // This is safe because the address was checked to be halfword aligned and inside the flash.
        unsafe {
            (address as *mut u16).write_volatile(half_word);
        }
        // Wait for the write to be done
        self.wait_ready();

        self.registers.cr.modify(|_, w| w.pg().clear_bit());

        // Synchronize the changes
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        match self.take_errors() {
            true => Err(Error::Program { address }),
            false => Ok(()),
        }
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn mapped(&self) -> MappedRegion<'_> {
        // Flash is memory mapped and readable at all times.
        // Any change to it needs `&mut self`, so the slice stays valid while it is borrowed.
        let bytes = unsafe { core::slice::from_raw_parts(FLASH_BASE as *const u8, self.size) };
        MappedRegion::new(FLASH_BASE, bytes)
    }
}
