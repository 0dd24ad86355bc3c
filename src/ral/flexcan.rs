//! FlexCAN registers

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

/// Number of message buffers, and of individual mask registers.
pub const MAILBOXES: usize = 64;

#[repr(C)]
pub struct RegisterBlock {
    /// Module configuration
    pub MCR: VCell<u32>,
    /// Control 1
    pub CTRL1: VCell<u32>,
    _reserved0: [u32; 6],
    /// Error and status 1
    pub ESR1: VCell<u32>,
    _reserved1: [u32; 535],
    /// Rx individual masks
    pub RXIMR: [VCell<u32>; MAILBOXES],
}

impl RegisterBlock {
    pub const fn new() -> Self {
        const ZERO: VCell<u32> = VCell::new(0);
        RegisterBlock {
            MCR: VCell::new(0),
            CTRL1: VCell::new(0),
            _reserved0: [0; 6],
            ESR1: VCell::new(0),
            _reserved1: [0; 535],
            RXIMR: [ZERO; MAILBOXES],
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x980) as usize];

/// CAN1 register block address.
pub const CAN1: *const RegisterBlock = 0x401D_0000 as *const _;
/// CAN2 register block address.
pub const CAN2: *const RegisterBlock = 0x401D_4000 as *const _;

pub mod MCR {
    /// Self reception disable
    pub mod SRXDIS {
        pub const offset: u32 = 17;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod CTRL1 {
    /// Listen-only mode
    pub mod LOM {
        pub const offset: u32 = 3;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Loop back mode
    pub mod LPB {
        pub const offset: u32 = 12;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod ESR1 {
    /// Bus off interrupt
    pub mod BOFFINT {
        pub const offset: u32 = 2;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Fault confinement state
    pub mod FLTCONF {
        pub const offset: u32 = 4;
        pub const mask: u32 = 0x3 << offset;
        pub mod RW {
            pub const ERROR_ACTIVE: u32 = 0;
            pub const ERROR_PASSIVE: u32 = 1;
        }
        pub mod R {}
        pub mod W {}
    }
    /// Rx error warning
    pub mod RXWRN {
        pub const offset: u32 = 8;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Tx error warning
    pub mod TXWRN {
        pub const offset: u32 = 9;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Stuffing error
    pub mod STFERR {
        pub const offset: u32 = 10;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Form error
    pub mod FRMERR {
        pub const offset: u32 = 11;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// CRC error
    pub mod CRCERR {
        pub const offset: u32 = 12;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Acknowledge error
    pub mod ACKERR {
        pub const offset: u32 = 13;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Bit0 error
    pub mod BIT0ERR {
        pub const offset: u32 = 14;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    /// Bit1 error
    pub mod BIT1ERR {
        pub const offset: u32 = 15;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}
