//! USB core registers

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u32; 81],
    /// USB status
    pub USBSTS: VCell<u32>,
    _reserved1: [u32; 3],
    /// Device address
    pub DEVICEADDR: VCell<u32>,
    _reserved2: [u32; 11],
    /// Port status and control
    pub PORTSC1: VCell<u32>,
}

impl RegisterBlock {
    pub const fn new() -> Self {
        RegisterBlock {
            _reserved0: [0; 81],
            USBSTS: VCell::new(0),
            _reserved1: [0; 3],
            DEVICEADDR: VCell::new(0),
            _reserved2: [0; 11],
            PORTSC1: VCell::new(0),
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x188) as usize];

/// USB1 (OTG1) core register block address.
pub const USB1: *const RegisterBlock = 0x402E_0000 as *const _;
/// USB2 (OTG2) core register block address.
pub const USB2: *const RegisterBlock = 0x402E_0200 as *const _;

pub mod USBSTS {
    /// Port change detect
    pub mod PCI {
        pub const offset: u32 = 2;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod DEVICEADDR {
    /// Device address advance
    pub mod USBADRA {
        pub const offset: u32 = 24;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Device address
    pub mod USBADR {
        pub const offset: u32 = 25;
        pub const mask: u32 = 0x7F << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod PORTSC1 {
    /// Current connect status
    pub mod CCS {
        pub const offset: u32 = 0;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Force port resume
    pub mod FPR {
        pub const offset: u32 = 6;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Suspend
    pub mod SUSP {
        pub const offset: u32 = 7;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Port speed
    pub mod PSPD {
        pub const offset: u32 = 26;
        pub const mask: u32 = 0x3 << offset;
        pub mod RW {
            pub const FULL: u32 = 0;
            pub const LOW: u32 = 1;
            pub const HIGH: u32 = 2;
        }
        pub mod R {}
        pub mod W {}
    }
}

#[cfg(test)]
mod tests {
    use super::RegisterBlock;
    use crate::ral;

    #[test]
    fn device_address() {
        let usb = RegisterBlock::new();
        ral::write_reg!(super, &usb, DEVICEADDR, USBADR: 0x7F);
        assert_eq!(usb.DEVICEADDR.read(), 0xFE00_0000);
        assert_eq!(ral::read_reg!(super, &usb, DEVICEADDR, USBADRA), 0);
    }

    #[test]
    fn port_speed() {
        let usb = RegisterBlock::new();
        usb.PORTSC1.write((2 << 26) | 1);
        assert!(ral::read_reg!(super, &usb, PORTSC1, PSPD == HIGH));
        assert_eq!(ral::read_reg!(super, &usb, PORTSC1, CCS), 1);
    }
}
