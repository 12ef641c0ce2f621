#![no_main]
#![no_std]

use core::{fmt::Write, mem::MaybeUninit};

use crate::flash::Stm32Flash;
use crate::reset_reason::ResetReason;
use cortex_m_rt::entry;
use flash_data::{
    flash_addresses::{data_page_index_range, data_page_range, FLASH_BASE},
    flash_read_data, flash_write_data,
    report::write_report,
    DataWidth, Flash,
};
use nb::block;
use panic_persist::get_panic_message_utf8;
use stm32f1xx_hal::{
    pac,
    prelude::*,
    serial::{Config, Serial},
    timer::Timer,
};

mod flash;
mod reset_reason;

/// The values written to the data page at startup
const DEMO_DATA: [u32; 4] = [0x1234_5678, 0x0202_0202, 0x8765_4321, 0x0404_0404];
const DEMO_WIDTH: DataWidth = DataWidth::Word;
/// Byte offset of the demo data in the data page
const DEMO_OFFSET: u32 = 0;

/// Consecutive panic reboots after which the startup write is skipped
const MAX_PANICS: u32 = 10;

#[link_section = ".uninit"]
static mut PANIC_COUNTS: MaybeUninit<u32> = MaybeUninit::uninit();

#[macro_export]
macro_rules! uprintln {
    ($uart:expr, $($arg:tt)*) => {
        {
            use core::fmt::Write as _;
            let mut str = arrayvec::ArrayString::<256>::new();
            match write!(str, $($arg)*).and_then(|_| str.write_str("\r\n")) {
                Ok(_) => {
                    $uart.write_str(str.as_str()).ok();
                },
                Err(_) => {
                    $uart.write_str("Error: failed to print string, too long\r\n").ok();
                },
            };
        }
    };
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    let reset_reason = ResetReason::lookup(&dp.RCC);
    ResetReason::clear(&dp.RCC);

    let mut flash_parts = dp.FLASH.constrain();
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze(&mut flash_parts.acr);

    let mut afio = dp.AFIO.constrain();
    let mut gpioa = dp.GPIOA.split();

    let config = Config::default().baudrate(115200.bps());

    #[cfg(feature = "bluepill")]
    let (mut uart, mut uart_rx) = {
        let tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.crh);
        let rx = gpioa.pa10;
        Serial::new(dp.USART1, (tx, rx), &mut afio.mapr, config, &clocks).split()
    };
    #[cfg(feature = "nucleo-f103rb")]
    let (mut uart, mut uart_rx) = {
        let tx = gpioa.pa2.into_alternate_push_pull(&mut gpioa.crl);
        let rx = gpioa.pa3;
        Serial::new(dp.USART2, (tx, rx), &mut afio.mapr, config, &clocks).split()
    };

    uprintln!(
        uart,
        "\r\n--== == == == == == == == == == == == == == ==--\r\nStarting flash demo version `{}` with git hash `{}`",
        env!("CP_CARGO"),
        env!("CP_GIT")
    );
    uprintln!(uart, "Reset reason: {}", reset_reason);

    let panics = unsafe { PANIC_COUNTS.assume_init_mut() };
    if *panics > MAX_PANICS || reset_reason == ResetReason::PowerOn {
        // Random garbage from ram after a power cycle
        *panics = 0;
    }

    // Check if there was a panic message, if so, send to UART
    if let Some(msg) = get_panic_message_utf8() {
        uprintln!(uart, "Booted up from a panic:");
        uart.write_str(msg).ok();
        *panics += 1;
        uprintln!(uart, "");
    }

    uprintln!(uart, "There have been {} panics so far.", panics);

    // The HAL only keeps the ACR register of the FLASH peripheral, so we make a reference to the
    // registers ourselves
    let mut flash = Stm32Flash {
        registers: unsafe { &*pac::FLASH::ptr() },
        size: Stm32Flash::device_size(),
    };

    uprintln!(uart, "\r\nDefined memory regions:");
    uprintln!(
        uart,
        "\tflash:     {:08X?} ({} bytes, {} byte pages)",
        FLASH_BASE..FLASH_BASE + flash.size as u32,
        flash.size,
        flash.page_size()
    );
    uprintln!(
        uart,
        "\tdata page: {:08X?} ({:03?})",
        data_page_range(),
        data_page_index_range(flash.page_size())
    );

    let page_address = data_page_range().start;

    // Every boot erases the data page. When we keep panicking, we'd wear it out in a reset loop.
    if *panics > MAX_PANICS {
        uprintln!(uart, "There have been too many panics. The data page will not be written to save the flash. Send a single byte over serial to reset the panic counter.");
        block!(uart_rx.read()).ok();
        *panics = 0;
    } else {
        uprintln!(
            uart,
            "Writing {} values at {:#010X}",
            DEMO_DATA.len(),
            page_address + DEMO_OFFSET
        );
        match flash_write_data(&mut flash, page_address, DEMO_OFFSET, &DEMO_DATA, DEMO_WIDTH) {
            Ok(()) => uprintln!(uart, "Write done"),
            Err(e) => uprintln!(uart, "Write failed: {}", e),
        }
    }

    // Report the page content once per second
    let mut timer = Timer::syst(cp.SYST, &clocks).counter_hz();
    timer.start(1.Hz()).unwrap();

    let mut read_back = [0; DEMO_DATA.len()];
    loop {
        match flash_read_data(&flash, page_address, DEMO_OFFSET, &mut read_back, DEMO_WIDTH) {
            Ok(()) => {
                uprintln!(uart, "Read back:");
                write_report(&mut uart, page_address, DEMO_OFFSET, &read_back, DEMO_WIDTH).ok();
            }
            Err(e) => uprintln!(uart, "Read failed: {}", e),
        }

        block!(timer.wait()).unwrap();
    }
}

#[cortex_m_rt::exception]
unsafe fn HardFault(frame: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("{:?}", frame);
}
