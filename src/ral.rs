//! Register access for the peripherals driven by this crate
//!
//! The register blocks only describe the registers that the drivers touch
//! directly. Everything else in a peripheral is programmed by the vendor
//! layer. Fields follow the RAL conventions, so the `ral-registers` macros
//! work on them:
//!
//! ```no_run
//! use imxrt_cmsis_drivers::ral::{self, flexcan, Instance};
//!
//! let can1 = unsafe { Instance::new(flexcan::CAN1) };
//! let fault_confinement = ral::read_reg!(ral::flexcan, can1, ESR1, FLTCONF);
//! # let _ = fault_confinement;
//! ```

pub use ral_registers::{modify_reg, read_reg, write_reg};

pub mod ccm;
pub mod enet;
pub mod flexcan;
pub mod usb;
pub mod usbphy;
pub mod usdhc;

/// A handle to a register block.
pub struct Instance<RB: 'static> {
    block: &'static RB,
}

impl<RB> Instance<RB> {
    /// Create a handle to the register block at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a valid register block for the rest of the
    /// program. The caller hands the block to this handle; no other
    /// handle may drive the same registers.
    pub unsafe fn new(ptr: *const RB) -> Self {
        Instance { block: &*ptr }
    }

    /// Returns the address of the register block.
    pub fn as_ptr(&self) -> *const RB {
        self.block
    }
}

impl<RB> core::ops::Deref for Instance<RB> {
    type Target = RB;
    fn deref(&self) -> &RB {
        self.block
    }
}

// Safety: owned handle to memory-mapped registers.
unsafe impl<RB> Send for Instance<RB> {}
