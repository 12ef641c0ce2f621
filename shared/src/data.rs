//! Writing and reading sequences of halfwords or words on a single flash page

use crate::{Error, Flash};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The width of the elements of a data buffer in flash
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 16-bit elements. Values are truncated to their low halfword when written.
    HalfWord = 0,
    /// 32-bit elements
    Word = 1,
}

impl DataWidth {
    /// The number of bytes the address advances per element
    pub const fn stride(self) -> u32 {
        match self {
            DataWidth::HalfWord => 2,
            DataWidth::Word => 4,
        }
    }

    /// What an element reads as on an erased page
    pub const fn erased_value(self) -> u32 {
        match self {
            DataWidth::HalfWord => 0xFFFF,
            DataWidth::Word => 0xFFFF_FFFF,
        }
    }
}

/// A checked range of elements inside one page
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Span {
    page_address: u32,
    start: u32,
    count: usize,
    width: DataWidth,
}

impl Span {
    fn new(
        flash: &impl Flash,
        page_address: u32,
        offset: u32,
        count: usize,
        width: DataWidth,
    ) -> Result<Self, Error> {
        let page_size = flash.page_size();

        if page_address % page_size != 0 {
            return Err(Error::Alignment {
                address: page_address,
            });
        }
        // The controller programs halfwords, so anything less aligned can't be written
        if offset % 2 != 0 {
            return Err(Error::Alignment {
                address: page_address.wrapping_add(offset),
            });
        }

        let start = page_address.checked_add(offset);
        let len = u32::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(width.stride()));
        let out_of_range = Error::AddressRange {
            address: start.unwrap_or(page_address),
            len: len.unwrap_or(u32::MAX),
        };
        let (start, len) = start.zip(len).ok_or(out_of_range)?;

        let end_offset = offset.checked_add(len).ok_or(out_of_range)?;
        if end_offset > page_size || !flash.mapped().contains(page_address, page_size) {
            return Err(Error::AddressRange {
                address: start,
                len,
            });
        }

        Ok(Self {
            page_address,
            start,
            count,
            width,
        })
    }

    /// The addresses of the elements, in order
    fn addresses(&self) -> impl Iterator<Item = u32> {
        let (start, stride) = (self.start, self.width.stride());
        (0..self.count as u32).map(move |index| start + index * stride)
    }
}

/// Erases the page at `page_address` and programs `data` into it, starting at `offset` bytes into the page.
///
/// The whole page is erased, not only the bytes that are written, so anything else stored on
/// the page is lost. With [DataWidth::HalfWord] every element is truncated to its low 16 bits.
/// Every programmed element is read back and compared.
///
/// The flash is locked again before returning, also when the erase or programming failed.
/// An empty `data` slice only erases the page.
pub fn flash_write_data(
    flash: &mut impl Flash,
    page_address: u32,
    offset: u32,
    data: &[u32],
    width: DataWidth,
) -> Result<(), Error> {
    let span = Span::new(flash, page_address, offset, data.len(), width)?;

    flash.unlock()?;
    let result = erase_and_program(flash, &span, data);
    let locked = flash.lock();

    result.and(locked)
}

fn erase_and_program(flash: &mut impl Flash, span: &Span, data: &[u32]) -> Result<(), Error> {
    let page_size = flash.page_size();

    flash.erase_page(span.page_address)?;
    if !flash.mapped().is_erased(span.page_address, page_size)? {
        return Err(Error::Erase {
            page_address: span.page_address,
        });
    }

    for (&value, address) in data.iter().zip(span.addresses()) {
        let (written, read_back) = match span.width {
            DataWidth::HalfWord => {
                let half_word = value as u16;
                flash.program_half_word(address, half_word)?;
                (half_word as u32, flash.mapped().get_u16(address)? as u32)
            }
            DataWidth::Word => {
                flash.program_word(address, value)?;
                (value, flash.mapped().get_u32(address)?)
            }
        };

        if written != read_back {
            return Err(Error::Program { address });
        }
    }

    Ok(())
}

/// Reads `data.len()` elements from flash, starting at `offset` bytes into the page at `page_address`.
///
/// Flash is memory mapped, so no unlock is needed. Nothing checks that the span was written
/// before: erased cells read back as [DataWidth::erased_value].
pub fn flash_read_data(
    flash: &impl Flash,
    page_address: u32,
    offset: u32,
    data: &mut [u32],
    width: DataWidth,
) -> Result<(), Error> {
    let span = Span::new(flash, page_address, offset, data.len(), width)?;
    let mapped = flash.mapped();

    for (slot, address) in data.iter_mut().zip(span.addresses()) {
        *slot = match width {
            DataWidth::HalfWord => mapped.get_u16(address)? as u32,
            DataWidth::Word => mapped.get_u32(address)?,
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash_addresses::{data_page_range, FLASH_BASE};
    use crate::sim::SimulatedFlash;

    const PAGE_SIZE: u32 = 0x400;
    const FLASH_SIZE: usize = 64 * 1024;

    type TestFlash = SimulatedFlash<FLASH_SIZE>;

    fn flash() -> TestFlash {
        SimulatedFlash::new(FLASH_BASE, PAGE_SIZE)
    }

    #[test]
    fn demo_words_round_trip() {
        let mut flash = flash();
        let page = data_page_range().start;
        assert_eq!(page, 0x0800_7C00);

        let data = [0x1234_5678, 0x0202_0202, 0x8765_4321, 0x0404_0404];
        flash_write_data(&mut flash, page, 0, &data, DataWidth::Word).unwrap();

        let mut read_back = [0; 4];
        flash_read_data(&flash, page, 0, &mut read_back, DataWidth::Word).unwrap();
        assert_eq!(read_back, data);
    }

    #[test]
    fn half_words_round_trip_at_an_offset() {
        let mut flash = flash();
        let page = FLASH_BASE + 4 * PAGE_SIZE;

        let data = [0x0001, 0xBEEF, 0x8000, 0xFFFE, 0x0000];
        flash_write_data(&mut flash, page, 0x10, &data, DataWidth::HalfWord).unwrap();

        let mut read_back = [0; 5];
        flash_read_data(&flash, page, 0x10, &mut read_back, DataWidth::HalfWord).unwrap();
        assert_eq!(read_back, data);
    }

    #[test]
    fn half_words_are_truncated() {
        let mut flash = flash();
        let page = FLASH_BASE + 2 * PAGE_SIZE;

        flash_write_data(&mut flash, page, 0, &[0xDEAD_BEEF], DataWidth::HalfWord).unwrap();

        let mut read_back = [0; 2];
        flash_read_data(&flash, page, 0, &mut read_back, DataWidth::HalfWord).unwrap();
        assert_eq!(read_back, [0xBEEF, 0xFFFF]);
    }

    #[test]
    fn elements_advance_by_the_stride() {
        let mut flash = flash();
        let page = FLASH_BASE + 8 * PAGE_SIZE;

        flash_write_data(&mut flash, page, 4, &[0x1111, 0x2222, 0x3333], DataWidth::HalfWord)
            .unwrap();
        let mapped = flash.mapped();
        assert_eq!(mapped.get_u16(page + 4).unwrap(), 0x1111);
        assert_eq!(mapped.get_u16(page + 6).unwrap(), 0x2222);
        assert_eq!(mapped.get_u16(page + 8).unwrap(), 0x3333);
        assert_eq!(mapped.get_u16(page + 10).unwrap(), 0xFFFF);

        flash_write_data(&mut flash, page, 4, &[0xAAAA_0001, 0xBBBB_0002], DataWidth::Word)
            .unwrap();
        let mapped = flash.mapped();
        assert_eq!(mapped.get_u32(page + 4).unwrap(), 0xAAAA_0001);
        assert_eq!(mapped.get_u32(page + 8).unwrap(), 0xBBBB_0002);
        assert_eq!(mapped.get_u32(page + 12).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn a_write_erases_the_whole_page() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, 0x100, &[0xCAFE_F00D; 4], DataWidth::Word).unwrap();
        flash_write_data(&mut flash, page, 0, &[0x0102_0304], DataWidth::Word).unwrap();

        let mut read_back = [0; 4];
        flash_read_data(&flash, page, 0x100, &mut read_back, DataWidth::Word).unwrap();
        assert_eq!(read_back, [DataWidth::Word.erased_value(); 4]);
    }

    #[test]
    fn rewriting_the_same_page_succeeds() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, 0, &[0x0000_0000], DataWidth::Word).unwrap();
        flash_write_data(&mut flash, page, 0, &[0xFFFF_0000], DataWidth::Word).unwrap();

        let mut read_back = [0; 1];
        flash_read_data(&flash, page, 0, &mut read_back, DataWidth::Word).unwrap();
        assert_eq!(read_back, [0xFFFF_0000]);
    }

    #[test]
    fn an_empty_write_only_erases() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, 0, &[1, 2, 3], DataWidth::Word).unwrap();
        flash_write_data(&mut flash, page, 0, &[], DataWidth::Word).unwrap();

        assert_eq!(flash.erase_count(), 2);
        assert_eq!(flash.program_count(), 6);
        assert_eq!(flash.mapped().is_erased(page, PAGE_SIZE), Ok(true));

        let mut read_back = [0; 3];
        flash_read_data(&flash, page, 0x20, &mut read_back, DataWidth::HalfWord).unwrap();
        assert_eq!(read_back, [DataWidth::HalfWord.erased_value(); 3]);
    }

    #[test]
    fn the_write_leaves_the_flash_locked() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, 0, &[7], DataWidth::Word).unwrap();
        assert!(flash.is_locked());
    }

    #[test]
    fn the_last_element_of_a_page_fits() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, PAGE_SIZE - 4, &[0x5555_AAAA], DataWidth::Word).unwrap();

        let mut read_back = [0; 1];
        flash_read_data(&flash, page, PAGE_SIZE - 4, &mut read_back, DataWidth::Word).unwrap();
        assert_eq!(read_back, [0x5555_AAAA]);
    }

    #[test]
    fn spans_past_the_page_end_are_rejected() {
        let mut flash = flash();
        let page = data_page_range().start;

        assert_eq!(
            flash_write_data(&mut flash, page, PAGE_SIZE - 4, &[1, 2], DataWidth::Word),
            Err(Error::AddressRange {
                address: page + PAGE_SIZE - 4,
                len: 8
            })
        );
        // Nothing was touched
        assert_eq!(flash.erase_count(), 0);
        assert!(flash.is_locked());

        let mut read_back = [0; 513];
        assert_eq!(
            flash_read_data(&flash, page, 0, &mut read_back, DataWidth::HalfWord),
            Err(Error::AddressRange {
                address: page,
                len: 1026
            })
        );
    }

    #[test]
    fn pages_outside_the_flash_are_rejected() {
        let mut flash = flash();
        let page = FLASH_BASE + FLASH_SIZE as u32;

        assert_eq!(
            flash_write_data(&mut flash, page, 0, &[1], DataWidth::Word),
            Err(Error::AddressRange {
                address: page,
                len: 4
            })
        );

        let mut read_back = [0; 1];
        assert_eq!(
            flash_read_data(&flash, 0x2000_0000, 0, &mut read_back, DataWidth::Word),
            Err(Error::AddressRange {
                address: 0x2000_0000,
                len: 4
            })
        );
    }

    #[test]
    fn misaligned_addresses_are_rejected() {
        let mut flash = flash();
        let page = data_page_range().start;

        assert_eq!(
            flash_write_data(&mut flash, page + 2, 0, &[1], DataWidth::Word),
            Err(Error::Alignment { address: page + 2 })
        );
        assert_eq!(
            flash_write_data(&mut flash, page, 3, &[1], DataWidth::HalfWord),
            Err(Error::Alignment { address: page + 3 })
        );

        let mut read_back = [0; 1];
        assert_eq!(
            flash_read_data(&flash, page, 1, &mut read_back, DataWidth::Word),
            Err(Error::Alignment { address: page + 1 })
        );
    }

    #[test]
    fn a_failed_unlock_touches_nothing() {
        let mut flash = flash();
        let page = data_page_range().start;
        flash.fail_unlock(true);

        assert_eq!(
            flash_write_data(&mut flash, page, 0, &[1], DataWidth::Word),
            Err(Error::Lock)
        );
        assert_eq!(flash.erase_count(), 0);
    }

    #[test]
    fn write_protected_pages_fail_to_erase_and_are_relocked() {
        let mut flash = flash();
        let page = data_page_range().start;
        flash.write_protect(page..page + PAGE_SIZE);

        assert_eq!(
            flash_write_data(&mut flash, page, 0, &[1], DataWidth::Word),
            Err(Error::Erase { page_address: page })
        );
        assert!(flash.is_locked());
    }

    #[test]
    fn stuck_bits_fail_the_erase_verification() {
        let mut flash = flash();
        let page = data_page_range().start;
        flash.stick_bits_at_zero(page + 0x80, 0x01);

        assert_eq!(
            flash_write_data(&mut flash, page, 0, &[1], DataWidth::Word),
            Err(Error::Erase { page_address: page })
        );
        assert!(flash.is_locked());
    }

    #[test]
    fn stuck_bits_fail_the_program_verification() {
        let mut flash = flash();
        let page = data_page_range().start;
        flash.stick_bits_at_one(page + 5, 0x80);

        assert_eq!(
            flash_write_data(&mut flash, page, 0, &[0x1111_1111, 0x0000_0000], DataWidth::Word),
            Err(Error::Program { address: page + 4 })
        );
        assert!(flash.is_locked());
    }

    #[test]
    fn raw_width_tags_convert() {
        assert_eq!(DataWidth::try_from(0u8), Ok(DataWidth::HalfWord));
        assert_eq!(DataWidth::try_from(1u8), Ok(DataWidth::Word));
        assert!(DataWidth::try_from(2u8).is_err());
        assert_eq!(u8::from(DataWidth::Word), 1);
    }

    #[test]
    fn a_width_mismatch_reads_back_other_values() {
        let mut flash = flash();
        let page = data_page_range().start;

        flash_write_data(&mut flash, page, 0, &[0x1234_5678], DataWidth::Word).unwrap();

        let mut read_back = [0; 2];
        flash_read_data(&flash, page, 0, &mut read_back, DataWidth::HalfWord).unwrap();
        assert_eq!(read_back, [0x5678, 0x1234]);
    }
}
