//! Ultra secured digital host controller (USDHC) registers

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u32; 11],
    /// System control
    pub SYS_CTRL: VCell<u32>,
    _reserved1: [u32; 2],
    /// Interrupt signal enable
    pub INT_SIGNAL_EN: VCell<u32>,
    _reserved2: [u32; 33],
    /// Vendor specific
    pub VEND_SPEC: VCell<u32>,
}

impl RegisterBlock {
    pub const fn new() -> Self {
        RegisterBlock {
            _reserved0: [0; 11],
            SYS_CTRL: VCell::new(0),
            _reserved1: [0; 2],
            INT_SIGNAL_EN: VCell::new(0),
            _reserved2: [0; 33],
            VEND_SPEC: VCell::new(0),
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0xC4) as usize];

/// USDHC1 register block address.
pub const USDHC1: *const RegisterBlock = 0x402C_0000 as *const _;
/// USDHC2 register block address.
pub const USDHC2: *const RegisterBlock = 0x402C_4000 as *const _;

pub mod SYS_CTRL {
    /// Clock gates, written as a group: IPG, HCLK, PER and SD clock.
    pub mod CLOCK_GATES {
        pub const offset: u32 = 0;
        pub const mask: u32 = 0xF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Data timeout counter value
    pub mod DTOCV {
        pub const offset: u32 = 16;
        pub const mask: u32 = 0xF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Software reset for data line
    pub mod RSTD {
        pub const offset: u32 = 26;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod VEND_SPEC {
    /// Force SD clock on
    pub mod FRC_SDCLK_ON {
        pub const offset: u32 = 8;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}
