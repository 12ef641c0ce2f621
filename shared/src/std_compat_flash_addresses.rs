//! Helper functions for finding the flash addresses of the memory regions more easily
//!
//! This version uses fixed addresses so it can be used without the linker script

use core::ops::Range;

/// The address the flash is mapped at
pub const FLASH_BASE: u32 = 0x0800_0000;

/// The address of the flash size register (F_SIZE), holding the flash size in KiB
pub const FLASH_SIZE_REGISTER: u32 = 0x1FFF_F7E0;

/// The start of the demo data page, the last 1 KiB page of the first 32 KiB
pub const DATA_PAGE_START: u32 = 0x0800_7C00;

/// The end of the demo data page
pub const DATA_PAGE_END: u32 = 0x0800_8000;

/// The address range of the page the demo data is stored in
pub fn data_page_range() -> Range<u32> {
    DATA_PAGE_START..DATA_PAGE_END
}

/// The page range of the demo data page, as page indices counted from [FLASH_BASE]
pub fn data_page_index_range(page_size: u32) -> Range<u32> {
    let address_range = data_page_range();
    (address_range.start - FLASH_BASE) / page_size..(address_range.end - FLASH_BASE) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_page_is_page_31_of_1k_pages() {
        assert_eq!(data_page_index_range(0x400), 31..32);
        assert_eq!(data_page_range().len(), 0x400);
    }
}
