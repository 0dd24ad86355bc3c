//! USB device driver, EHCI host glue, and controller roles
//!
//! Each USB OTG controller has one interrupt vector, shared by whichever
//! role owns the controller. The device driver and the host glue claim a
//! role in a [`UsbRoles`] registry when they initialize; the vector handler
//! asks the registry where to go:
//!
//! ```no_run
//! use imxrt_cmsis_drivers::usb::{Controller, UsbRoles};
//!
//! static ROLES: UsbRoles = UsbRoles::new();
//!
//! fn usb_otg1() {
//!     ROLES.dispatch(
//!         Controller::Usb1,
//!         || { /* host.on_interrupt() */ },
//!         || { /* device.on_interrupt() */ },
//!     );
//! }
//! ```

pub mod device;
pub mod host;

use core::sync::atomic::{AtomicU8, Ordering};

use crate::{ral, Error, HalError, Irq};

/// A USB OTG controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    Usb1,
    Usb2,
}

impl Controller {
    /// Zero-based position of the controller.
    const fn offset(self) -> usize {
        match self {
            Controller::Usb1 => 0,
            Controller::Usb2 => 1,
        }
    }

    /// The controller's interrupt vector.
    pub const fn irq(self) -> Irq {
        match self {
            Controller::Usb1 => Irq::USB_OTG1,
            Controller::Usb2 => Irq::USB_OTG2,
        }
    }

    /// Address of the controller's core registers.
    pub const fn usb(self) -> *const ral::usb::RegisterBlock {
        match self {
            Controller::Usb1 => ral::usb::USB1,
            Controller::Usb2 => ral::usb::USB2,
        }
    }

    /// Address of the controller's PHY registers.
    pub const fn usbphy(self) -> *const ral::usbphy::RegisterBlock {
        match self {
            Controller::Usb1 => ral::usbphy::USBPHY1,
            Controller::Usb2 => ral::usbphy::USBPHY2,
        }
    }
}

/// Converts the one-based CMSIS controller index.
impl TryFrom<u8> for Controller {
    type Error = Error;
    fn try_from(index: u8) -> Result<Self, Error> {
        match index {
            1 => Ok(Controller::Usb1),
            2 => Ok(Controller::Usb2),
            _ => Err(Error::Parameter),
        }
    }
}

/// The role of a USB controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    None = 0,
    Device = 1,
    Host = 2,
}

impl Role {
    fn from_u8(role: u8) -> Self {
        match role {
            1 => Role::Device,
            2 => Role::Host,
            _ => Role::None,
        }
    }
}

/// Per-controller roles.
///
/// Place this in a `static`. Drivers and interrupt handlers share it by
/// reference.
pub struct UsbRoles([AtomicU8; 2]);

impl UsbRoles {
    pub const fn new() -> Self {
        UsbRoles([AtomicU8::new(Role::None as u8), AtomicU8::new(Role::None as u8)])
    }

    pub fn set(&self, controller: Controller, role: Role) {
        self.0[controller.offset()].store(role as u8, Ordering::SeqCst);
    }

    pub fn get(&self, controller: Controller) -> Role {
        Role::from_u8(self.0[controller.offset()].load(Ordering::SeqCst))
    }

    /// Run the handler of the controller's current role.
    ///
    /// Does nothing if the controller has no role.
    pub fn dispatch(&self, controller: Controller, host: impl FnOnce(), device: impl FnOnce()) {
        match self.get(controller) {
            Role::Host => host(),
            Role::Device => device(),
            Role::None => {}
        }
    }
}

impl Default for UsbRoles {
    fn default() -> Self {
        Self::new()
    }
}

/// USB clock control, provided by the clock layer.
pub trait Clocks {
    /// Enable the 480 MHz PHY PLL of the controller.
    fn enable_phy_pll(&mut self, controller: Controller) -> Result<(), HalError>;
    fn disable_phy_pll(&mut self, controller: Controller);
    /// Ungate the controller's clock.
    fn enable_usb_clock(&mut self, controller: Controller) -> Result<(), HalError>;
}


#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::{Controller, Role, UsbRoles};
    use crate::{Error, Irq};

    #[test]
    fn controller_index() {
        assert_eq!(Controller::try_from(1), Ok(Controller::Usb1));
        assert_eq!(Controller::try_from(2), Ok(Controller::Usb2));
        assert_eq!(Controller::try_from(0), Err(Error::Parameter));
        assert_eq!(Controller::try_from(3), Err(Error::Parameter));
        assert_eq!(Controller::Usb1.irq(), Irq::USB_OTG1);
        assert_eq!(Controller::Usb2.irq(), Irq::USB_OTG2);
    }

    #[test]
    fn roles() {
        let roles = UsbRoles::new();
        assert_eq!(roles.get(Controller::Usb1), Role::None);

        roles.set(Controller::Usb2, Role::Host);
        assert_eq!(roles.get(Controller::Usb2), Role::Host);
        assert_eq!(roles.get(Controller::Usb1), Role::None);

        let ran = Cell::new(None);
        roles.dispatch(
            Controller::Usb2,
            || ran.set(Some(Role::Host)),
            || ran.set(Some(Role::Device)),
        );
        assert_eq!(ran.take(), Some(Role::Host));

        roles.set(Controller::Usb2, Role::Device);
        roles.dispatch(
            Controller::Usb2,
            || ran.set(Some(Role::Host)),
            || ran.set(Some(Role::Device)),
        );
        assert_eq!(ran.take(), Some(Role::Device));

        roles.dispatch(
            Controller::Usb1,
            || ran.set(Some(Role::Host)),
            || ran.set(Some(Role::Device)),
        );
        assert_eq!(ran.get(), None);
    }
}
