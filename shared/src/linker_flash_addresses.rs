//! Helper functions for finding the flash addresses of the memory regions more easily
//!
//! This version gets the addresses from the linker script

use core::ops::Range;

extern "C" {
    static mut _data_page_start: u32;
    static mut _data_page_end: u32;
}

/// The address the flash is mapped at
pub const FLASH_BASE: u32 = 0x0800_0000;

/// The address of the flash size register (F_SIZE), holding the flash size in KiB
pub const FLASH_SIZE_REGISTER: u32 = 0x1FFF_F7E0;

/// The address range of the page the demo data is stored in
pub fn data_page_range() -> Range<u32> {
    unsafe {
        let start = core::ptr::addr_of!(_data_page_start) as u32;
        let end = core::ptr::addr_of!(_data_page_end) as u32;
        start..end
    }
}

/// The page range of the demo data page, as page indices counted from [FLASH_BASE]
pub fn data_page_index_range(page_size: u32) -> Range<u32> {
    let address_range = data_page_range();
    (address_range.start - FLASH_BASE) / page_size..(address_range.end - FLASH_BASE) / page_size
}
