//! Text report of a read-back data buffer

use crate::DataWidth;
use core::fmt::{self, Write};

/// Writes one line per element: `[index] @ 0xADDRESS = 0xVALUE`.
///
/// Halfwords are printed with 4 hex digits, words with 8. Lines end in `\r\n` for serial terminals.
pub fn write_report(
    out: &mut impl Write,
    page_address: u32,
    offset: u32,
    data: &[u32],
    width: DataWidth,
) -> fmt::Result {
    let mut address = page_address + offset;

    for (index, value) in data.iter().enumerate() {
        match width {
            DataWidth::HalfWord => {
                write!(out, "[{}] @ {:#010X} = {:#06X}\r\n", index, address, value)?
            }
            DataWidth::Word => {
                write!(out, "[{}] @ {:#010X} = {:#010X}\r\n", index, address, value)?
            }
        }
        address += width.stride();
    }

    Ok(())
}
