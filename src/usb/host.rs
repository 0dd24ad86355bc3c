//! EHCI host glue
//!
//! A generic EHCI host driver runs the schedule. [`EhciHost`] gives it
//! what the i.MX RT needs besides the standard EHCI registers: the role
//! claim, PHY clock and vector control, and the high-speed disconnect
//! detector of the USB PHY.

use super::{Clocks, Controller, Role, UsbRoles};
use crate::{ral, Error, Interrupts, Nvic, Result};

/// Host side of one OTG controller.
pub struct EhciHost<C, I = Nvic> {
    clocks: C,
    irq: I,
    controller: Controller,
    usb: ral::Instance<ral::usb::RegisterBlock>,
    usbphy: ral::Instance<ral::usbphy::RegisterBlock>,
    roles: &'static UsbRoles,
    handler: Option<fn()>,
}

impl<C: Clocks, I: Interrupts> EhciHost<C, I> {
    pub fn new(clocks: C, irq: I, controller: Controller, roles: &'static UsbRoles) -> Self {
        // Safety: the glue owns the controller's port status and the PHY
        // control register. The EHCI driver owns the rest.
        let (usb, usbphy) = unsafe {
            (
                ral::Instance::new(controller.usb()),
                ral::Instance::new(controller.usbphy()),
            )
        };
        EhciHost {
            clocks,
            irq,
            controller,
            usb,
            usbphy,
            roles,
            handler: None,
        }
    }

    /// Address of the EHCI capability registers, for the EHCI driver.
    pub fn ehci_base(&self) -> usize {
        self.controller.usb() as usize + 0x100
    }

    /// Register the EHCI interrupt handler, and claim the host role.
    pub fn initialize(&mut self, handler: fn()) -> Result<()> {
        self.handler = Some(handler);
        self.roles.set(self.controller, Role::Host);
        Ok(())
    }

    /// Release the host role.
    pub fn uninitialize(&mut self) -> Result<()> {
        self.roles.set(self.controller, Role::None);
        Ok(())
    }

    pub fn power_control(&mut self, on: bool) -> Result<()> {
        let irq = self.controller.irq();
        if on {
            self.clocks
                .enable_phy_pll(self.controller)
                .map_err(|_| Error::Unspecified)?;
            self.irq.enable(irq);
        } else {
            self.irq.disable(irq);
            self.irq.clear_pending(irq);
            self.clocks.disable_phy_pll(self.controller);
        }
        Ok(())
    }

    /// Handle the controller's interrupt, then call the EHCI handler.
    ///
    /// The PHY has to look for high-speed disconnects only while a
    /// high-speed device is connected and the port isn't suspended or
    /// resuming.
    pub fn on_interrupt(&mut self) {
        if ral::read_reg!(ral::usb, self.usb, USBSTS, PCI == 1) {
            let (ccs, fpr, susp, pspd) =
                ral::read_reg!(ral::usb, self.usb, PORTSC1, CCS, FPR, SUSP, PSPD);
            let detect = susp == 0
                && ccs == 1
                && pspd == ral::usb::PORTSC1::PSPD::RW::HIGH
                && fpr == 0;
            trace!("EHCI port change, disconnect detector {}", detect);
            ral::modify_reg!(ral::usbphy, self.usbphy, CTRL, ENHOSTDISCONDETECT: detect as u32);
        }
        if let Some(handler) = self.handler {
            handler();
        }
    }
}
