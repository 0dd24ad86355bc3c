//! USB PHY registers

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u32; 12],
    /// General purpose control
    pub CTRL: VCell<u32>,
}

impl RegisterBlock {
    pub const fn new() -> Self {
        RegisterBlock {
            _reserved0: [0; 12],
            CTRL: VCell::new(0),
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x34) as usize];

/// USBPHY1 register block address.
pub const USBPHY1: *const RegisterBlock = 0x400D_9000 as *const _;
/// USBPHY2 register block address.
pub const USBPHY2: *const RegisterBlock = 0x400D_A000 as *const _;

pub mod CTRL {
    /// Enable the high-speed disconnect detector
    pub mod ENHOSTDISCONDETECT {
        pub const offset: u32 = 1;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}
