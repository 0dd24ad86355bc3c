//! Clock controller module (CCM)
//!
//! Only the CAN clock root selection is described.

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u32; 8],
    pub CSCMR2: VCell<u32>,
}

impl RegisterBlock {
    pub const fn new() -> Self {
        RegisterBlock {
            _reserved0: [0; 8],
            CSCMR2: VCell::new(0),
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x24) as usize];

/// CCM register block address.
pub const CCM: *const RegisterBlock = 0x400F_C000 as *const _;

pub mod CSCMR2 {
    /// Divider for the CAN clock root
    pub mod CAN_CLK_PODF {
        pub const offset: u32 = 2;
        pub const mask: u32 = 0x3F << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Selector for the CAN clock root
    pub mod CAN_CLK_SEL {
        pub const offset: u32 = 8;
        pub const mask: u32 = 0x3 << offset;
        pub mod RW {
            /// PLL3 (USB1 PLL) divided by 8
            pub const PLL3_DIV8: u32 = 0;
            /// 24 MHz oscillator
            pub const OSC: u32 = 1;
            /// PLL3 (USB1 PLL) divided by 6
            pub const PLL3_DIV6: u32 = 2;
            /// Clock off
            pub const OFF: u32 = 3;
        }
        pub mod R {}
        pub mod W {}
    }
}
