use core::fmt;

/// The error type used by this library.
///
/// The flash controller reports lock, erase and program failures. The address checks of the
/// read and write operations add their own errors on top of that.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The unlock or lock sequence did not take effect
    Lock,
    /// The page erase failed or the page did not read back as erased
    Erase {
        /// Start address of the page
        page_address: u32,
    },
    /// Programming failed or the programmed value did not read back
    Program {
        /// Address of the halfword or word that failed
        address: u32,
    },
    /// The addressed span does not fit in the page or in the flash
    AddressRange {
        /// Start address of the span
        address: u32,
        /// Length of the span in bytes
        len: u32,
    },
    /// The page address is not page aligned or the offset is not halfword aligned
    Alignment {
        /// The misaligned address
        address: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lock => write!(f, "flash lock/unlock sequence failed"),
            Error::Erase { page_address } => {
                write!(f, "erase of page {:#010X} failed", page_address)
            }
            Error::Program { address } => write!(f, "programming {:#010X} failed", address),
            Error::AddressRange { address, len } => write!(
                f,
                "span of {} bytes at {:#010X} is out of range",
                len, address
            ),
            Error::Alignment { address } => write!(f, "address {:#010X} is misaligned", address),
        }
    }
}
