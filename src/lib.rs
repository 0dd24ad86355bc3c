//! CMSIS-Driver style peripheral drivers for i.MX RT processors
//!
//! `imxrt-cmsis-drivers` exposes the Ethernet MAC, FlexCAN, USDHC (MCI) and
//! USB (device and EHCI host glue) peripherals of the i.MX RT 105x / 10xx
//! family through the operation sets that CMSIS-Driver middleware expects.
//! Each operation set is a trait, and each peripheral instance is a value
//! that owns its run-time state.
//!
//! The drivers don't program descriptor rings, mailboxes or ADMA tables
//! themselves. That work belongs to a vendor layer, modeled per peripheral
//! by a `Hal` trait. A driver validates requests, keeps the CMSIS state
//! machine, and turns vendor completion events into CMSIS events:
//!
//! - [`emac`] Ethernet MAC.
//! - [`flexcan`] FlexCAN, with RX FIFO and mailbox object virtualization.
//! - [`mci`] SD / MMC host controller.
//! - [`usb`] USB device driver, EHCI host glue, and the OTG role registry.
//!
//! # Interrupts
//!
//! Every driver has an `on_interrupt()` method. Call it from the peripheral's
//! interrupt handler. It drains the events of the vendor layer, updates the
//! driver state, and invokes the registered callbacks from that context.
//! Share a driver between the handler and your application the usual way,
//! with a `cortex_m::interrupt::Mutex<RefCell<_>>`.
//!
//! Drivers mask and unmask their vectors through [`Interrupts`]. [`Nvic`] is
//! the implementation backed by the Cortex-M NVIC.

#![no_std]

#[macro_use]
mod log;

mod vcell;

pub mod emac;
pub mod flexcan;
pub mod mci;
pub mod ral;
pub mod usb;

#[cfg(test)]
mod testing;

use core::fmt;

/// Packs a major / minor pair the way CMSIS version fields do.
pub const fn major_minor(major: u8, minor: u8) -> u16 {
    ((major as u16) << 8) | minor as u16
}

/// API and driver version of a CMSIS driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    /// Version of the CMSIS-Driver API this driver implements.
    pub api: u16,
    /// Version of the driver itself.
    pub driver: u16,
}

/// Peripheral power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    /// Power off: no operation possible.
    Off,
    /// Low power mode: retain state, detect wake-up events.
    Low,
    /// Power on: full operation at maximum performance.
    Full,
}

/// Driver errors.
///
/// Use [`code()`](Error::code) to get the CMSIS execution status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Unspecified error.
    Unspecified,
    /// Driver is busy.
    Busy,
    /// Timeout occurred.
    Timeout,
    /// Operation not supported.
    Unsupported,
    /// Parameter error.
    Parameter,
    /// Bitrate can't be reached within the clock tolerance.
    InvalidBitrate,
    /// Bitrate selection not supported.
    InvalidBitrateSelect,
    /// Propagation segment out of range.
    InvalidPropSeg,
    /// Phase segment 1 out of range.
    InvalidPhaseSeg1,
    /// Phase segment 2 out of range.
    InvalidPhaseSeg2,
    /// Synchronization jump width out of range.
    InvalidSjw,
}

impl Error {
    /// Returns the CMSIS-Driver status code.
    pub const fn code(self) -> i32 {
        match self {
            Error::Unspecified => -1,
            Error::Busy => -2,
            Error::Timeout => -3,
            Error::Unsupported => -4,
            Error::Parameter => -5,
            Error::InvalidBitrate => -6,
            Error::InvalidBitrateSelect => -7,
            Error::InvalidPropSeg => -8,
            Error::InvalidPhaseSeg1 => -9,
            Error::InvalidPhaseSeg2 => -10,
            Error::InvalidSjw => -11,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Unspecified => "unspecified error",
            Error::Busy => "driver busy",
            Error::Timeout => "timeout",
            Error::Unsupported => "operation not supported",
            Error::Parameter => "invalid parameter",
            Error::InvalidBitrate => "bitrate out of clock tolerance",
            Error::InvalidBitrateSelect => "bitrate selection not supported",
            Error::InvalidPropSeg => "invalid propagation segment",
            Error::InvalidPhaseSeg1 => "invalid phase segment 1",
            Error::InvalidPhaseSeg2 => "invalid phase segment 2",
            Error::InvalidSjw => "invalid synchronization jump width",
        };
        f.write_str(msg)
    }
}

impl From<HalError> for Error {
    fn from(_: HalError) -> Self {
        Error::Unspecified
    }
}

/// Result of a driver operation.
pub type Result<T> = core::result::Result<T, Error>;

/// A vendor layer call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalError;

/// An NVIC interrupt number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Irq(pub u16);

impl Irq {
    pub const CAN1: Irq = Irq(36);
    pub const CAN2: Irq = Irq(37);
    pub const USDHC1: Irq = Irq(110);
    pub const USDHC2: Irq = Irq(111);
    pub const USB_OTG2: Irq = Irq(112);
    pub const USB_OTG1: Irq = Irq(113);
    pub const ENET: Irq = Irq(114);
}

// Safety: the numbers above are the device's vector numbers. Users
// constructing their own are responsible for their validity.
unsafe impl cortex_m::interrupt::InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

/// Masks and unmasks peripheral interrupt vectors.
pub trait Interrupts {
    /// Unmask the vector.
    fn enable(&mut self, irq: Irq);
    /// Mask the vector.
    fn disable(&mut self, irq: Irq);
    /// Clear a pending request for the vector.
    fn clear_pending(&mut self, irq: Irq);
}

/// [`Interrupts`] backed by the Cortex-M NVIC.
#[derive(Debug)]
pub struct Nvic(());

impl Nvic {
    /// Let drivers unmask their own vectors.
    ///
    /// # Safety
    ///
    /// Unmasking an interrupt can break mask-based critical sections.
    /// Make sure that the vectors used by the drivers don't take part
    /// in one.
    pub unsafe fn new() -> Self {
        Nvic(())
    }
}

impl Interrupts for Nvic {
    fn enable(&mut self, irq: Irq) {
        // Safety: acknowledged when the Nvic was created.
        unsafe { cortex_m::peripheral::NVIC::unmask(irq) }
    }
    fn disable(&mut self, irq: Irq) {
        cortex_m::peripheral::NVIC::mask(irq);
    }
    fn clear_pending(&mut self, irq: Irq) {
        cortex_m::peripheral::NVIC::unpend(irq);
    }
}

#[cfg(test)]
mod tests {
    use super::{major_minor, Error};

    #[test]
    fn status_codes() {
        assert_eq!(Error::Unspecified.code(), -1);
        assert_eq!(Error::Busy.code(), -2);
        assert_eq!(Error::Parameter.code(), -5);
        assert_eq!(Error::InvalidBitrate.code(), -6);
        assert_eq!(Error::InvalidSjw.code(), -11);
    }

    #[test]
    fn version_packing() {
        assert_eq!(major_minor(2, 3), 0x0203);
        assert_eq!(major_minor(1, 9), 0x0109);
    }
}
