//! Test doubles shared by the driver tests

extern crate std;

use std::vec::Vec;

use crate::{Interrupts, Irq};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqOp {
    Enable(Irq),
    Disable(Irq),
    ClearPending(Irq),
}

/// Records every request to the interrupt controller.
#[derive(Default)]
pub struct MockInterrupts {
    pub ops: Vec<IrqOp>,
}

impl MockInterrupts {
    pub fn is_enabled(&self, irq: Irq) -> bool {
        self.ops
            .iter()
            .rev()
            .find_map(|op| match *op {
                IrqOp::Enable(i) if i == irq => Some(true),
                IrqOp::Disable(i) if i == irq => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Interrupts for MockInterrupts {
    fn enable(&mut self, irq: Irq) {
        self.ops.push(IrqOp::Enable(irq));
    }
    fn disable(&mut self, irq: Irq) {
        self.ops.push(IrqOp::Disable(irq));
    }
    fn clear_pending(&mut self, irq: Irq) {
        self.ops.push(IrqOp::ClearPending(irq));
    }
}

/// Allocates a register block that lives for the rest of the test run.
pub fn leak<RB>(block: RB) -> crate::ral::Instance<RB> {
    let block: &'static RB = std::boxed::Box::leak(std::boxed::Box::new(block));
    // Safety: leaked allocation, never freed, owned by the test.
    unsafe { crate::ral::Instance::new(block) }
}
