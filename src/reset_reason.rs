use stm32f1xx_hal::pac;

/// Reason why the device was reset.
#[derive(Debug, PartialEq)]
pub enum ResetReason {
    PowerOn,
    ResetPin,
    Software,
    IndependentWatchdog,
    WindowWatchdog,
    LowPower,
    None,
}

impl ResetReason {
    pub fn lookup(rcc: &pac::rcc::RegisterBlock) -> Self {
        let reason = rcc.csr.read();
        // Every reset drives the reset pin low, so the pin flag is only the reason if nothing else is set
        if reason.porrstf().bit_is_set() {
            return ResetReason::PowerOn;
        }
        if reason.iwdgrstf().bit_is_set() {
            return ResetReason::IndependentWatchdog;
        }
        if reason.wwdgrstf().bit_is_set() {
            return ResetReason::WindowWatchdog;
        }
        if reason.sftrstf().bit_is_set() {
            return ResetReason::Software;
        }
        if reason.lpwrrstf().bit_is_set() {
            return ResetReason::LowPower;
        }
        if reason.pinrstf().bit_is_set() {
            return ResetReason::ResetPin;
        }
        ResetReason::None
    }

    pub fn clear(rcc: &pac::rcc::RegisterBlock) {
        rcc.csr.modify(|_, w| w.rmvf().set_bit())
    }
}

impl core::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}
