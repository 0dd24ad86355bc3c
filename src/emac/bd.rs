//! Legacy ENET buffer descriptors, and the static buffer pool
//!
//! The vendor layer walks the rings once they're handed over with a
//! [`BufferConfig`]. The driver only touches the descriptors to flush them.

#![allow(non_snake_case)]
#![allow(clippy::declare_interior_mutable_const)] // Const items only seed arrays.

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::vcell::VCell;

/// Size of each frame buffer, and of the transmit fragment buffer.
pub const BUFFER_SIZE: usize = 1536;

/// RX: the buffer is free for the DMA engine.
pub const RX_EMPTY: u16 = 1 << 15;
/// RX and TX: the last descriptor of the ring.
pub const WRAP: u16 = 1 << 13;
/// TX: the buffer is ready for the DMA engine.
pub const TX_READY: u16 = 1 << 15;

/// A legacy (non-enhanced) buffer descriptor.
#[repr(C)]
pub struct Descriptor {
    pub LENGTH: VCell<u16>,
    pub CONTROL: VCell<u16>,
    pub BUFFER: VCell<u32>,
}

const _: [(); 1] = [(); (core::mem::size_of::<Descriptor>() == 8) as usize];

impl Descriptor {
    const fn new() -> Self {
        Descriptor {
            LENGTH: VCell::new(0),
            CONTROL: VCell::new(0),
            BUFFER: VCell::new(0),
        }
    }

    fn set_control(&self, bits: u16) {
        self.CONTROL.write(self.CONTROL.read() | bits);
    }

    fn clear_control(&self, bits: u16) {
        self.CONTROL.write(self.CONTROL.read() & !bits);
    }
}

#[repr(C, align(64))]
struct Ring<const N: usize>([Descriptor; N]);

impl<const N: usize> Ring<N> {
    const fn new() -> Self {
        const DESCRIPTOR: Descriptor = Descriptor::new();
        Ring([DESCRIPTOR; N])
    }
}

#[repr(C, align(64))]
struct FrameBuffer(UnsafeCell<[u8; BUFFER_SIZE]>);

impl FrameBuffer {
    const fn new() -> Self {
        FrameBuffer(UnsafeCell::new([0; BUFFER_SIZE]))
    }
}

/// Descriptor rings and frame buffers for the Ethernet MAC.
///
/// Allocate one `static` object, and [`take()`](Buffers::take) it when you
/// construct the driver. The defaults provide four receive buffers and two
/// transmit buffers.
///
/// ```
/// use imxrt_cmsis_drivers::emac::Buffers;
///
/// static BUFFERS: Buffers = Buffers::new();
/// static BIGGER: Buffers<8, 4> = Buffers::new();
/// ```
///
/// The DMA engine reads the descriptors behind the CPU's back. Place the
/// object in non-cacheable memory (DTCM, or an MPU region configured as
/// non-cacheable).
pub struct Buffers<const RX: usize = 4, const TX: usize = 2> {
    rx_ring: Ring<RX>,
    tx_ring: Ring<TX>,
    rx_buffers: [FrameBuffer; RX],
    tx_buffers: [FrameBuffer; TX],
    taken: AtomicBool,
}

unsafe impl<const RX: usize, const TX: usize> Sync for Buffers<RX, TX> {}

impl<const RX: usize, const TX: usize> Default for Buffers<RX, TX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const RX: usize, const TX: usize> Buffers<RX, TX> {
    const RINGS_ARE_NOT_EMPTY: () = assert!(RX > 0 && TX > 0);

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)] // Force evaluation.
        let _: () = Self::RINGS_ARE_NOT_EMPTY;
        const BUFFER: FrameBuffer = FrameBuffer::new();
        Self {
            rx_ring: Ring::new(),
            tx_ring: Ring::new(),
            rx_buffers: [BUFFER; RX],
            tx_buffers: [BUFFER; TX],
            taken: AtomicBool::new(false),
        }
    }

    /// Bind every descriptor to its buffer, and hand out the rings.
    ///
    /// Receive descriptors are marked empty, transmit descriptors are
    /// owned by software. The last descriptor of each ring wraps.
    ///
    /// Returns `None` if the buffers were already taken.
    pub fn take(&'static self) -> Option<Rings> {
        if self.taken.swap(true, Ordering::SeqCst) {
            return None;
        }

        for (descriptor, buffer) in self.rx_ring.0.iter().zip(self.rx_buffers.iter()) {
            descriptor.BUFFER.write(buffer.0.get() as usize as u32);
            descriptor.LENGTH.write(0);
            descriptor.CONTROL.write(RX_EMPTY);
        }
        for (descriptor, buffer) in self.tx_ring.0.iter().zip(self.tx_buffers.iter()) {
            descriptor.BUFFER.write(buffer.0.get() as usize as u32);
            descriptor.LENGTH.write(0);
            descriptor.CONTROL.write(0);
        }

        // The DMA engine needs to wrap around to the first descriptor.
        if let Some(descriptor) = self.rx_ring.0.last() {
            descriptor.set_control(WRAP);
        }
        if let Some(descriptor) = self.tx_ring.0.last() {
            descriptor.set_control(WRAP);
        }

        Some(Rings {
            rx: &self.rx_ring.0,
            tx: &self.tx_ring.0,
            rx_buffers: self.rx_buffers.as_ptr().cast_mut().cast(),
            tx_buffers: self.tx_buffers.as_ptr().cast_mut().cast(),
        })
    }
}

/// Where the vendor layer finds the rings and their buffers.
#[derive(Clone, Copy, Debug)]
pub struct BufferConfig {
    pub rx_ring: *const Descriptor,
    pub rx_count: usize,
    pub rx_buffers: *mut u8,
    pub tx_ring: *const Descriptor,
    pub tx_count: usize,
    pub tx_buffers: *mut u8,
    pub buffer_size: usize,
}

/// The descriptor rings of a taken [`Buffers`] pool.
pub struct Rings {
    rx: &'static [Descriptor],
    tx: &'static [Descriptor],
    rx_buffers: *mut u8,
    tx_buffers: *mut u8,
}

// Safety: the pool can only be taken once, so there's one owner.
unsafe impl Send for Rings {}

impl Rings {
    pub fn config(&self) -> BufferConfig {
        BufferConfig {
            rx_ring: self.rx.as_ptr(),
            rx_count: self.rx.len(),
            rx_buffers: self.rx_buffers,
            tx_ring: self.tx.as_ptr(),
            tx_count: self.tx.len(),
            tx_buffers: self.tx_buffers,
            buffer_size: BUFFER_SIZE,
        }
    }

    /// Give every receive descriptor back to the DMA engine.
    pub fn flush_rx(&self) {
        self.rx.iter().for_each(|descriptor| descriptor.set_control(RX_EMPTY));
    }

    /// Take every transmit descriptor away from the DMA engine.
    pub fn flush_tx(&self) {
        self.tx.iter().for_each(|descriptor| descriptor.clear_control(TX_READY));
    }

    pub fn rx(&self) -> &[Descriptor] {
        self.rx
    }

    pub fn tx(&self) -> &[Descriptor] {
        self.tx
    }
}
