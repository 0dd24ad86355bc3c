//! Ethernet MAC (ENET) registers
//!
//! The group address hash registers are written directly: the vendor
//! layer only knows how to add a single multicast group.

#![allow(non_snake_case, non_upper_case_globals)]

use crate::vcell::VCell;

#[repr(C)]
pub struct RegisterBlock {
    _reserved0: [u32; 72],
    /// Descriptor group upper address
    pub GAUR: VCell<u32>,
    /// Descriptor group lower address
    pub GALR: VCell<u32>,
}

impl RegisterBlock {
    pub const fn new() -> Self {
        RegisterBlock {
            _reserved0: [0; 72],
            GAUR: VCell::new(0),
            GALR: VCell::new(0),
        }
    }
}

const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x128) as usize];

/// ENET register block address.
pub const ENET: *const RegisterBlock = 0x402D_8000 as *const _;
