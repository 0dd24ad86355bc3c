//! Ethernet MAC driver
//!
//! [`Emac`] implements [`EthernetMac`] on top of an ENET vendor layer,
//! described by [`Hal`]. The vendor layer owns the descriptor rings once
//! they're handed over; the driver keeps the power state, the transmit
//! fragment buffer, and turns vendor events into [`Event`]s.
//!
//! # Example
//!
//! ```no_run
//! use imxrt_cmsis_drivers::{emac, ral, Nvic, PowerState};
//! use emac::EthernetMac;
//!
//! static BUFFERS: emac::Buffers = emac::Buffers::new();
//!
//! fn on_event(event: emac::Event) {
//!     // Wake the network stack...
//!     # let _ = event;
//! }
//!
//! fn start<H: emac::Hal>(hal: H) -> emac::Emac<H> {
//!     let enet = unsafe { ral::Instance::new(ral::enet::ENET) };
//!     let rings = BUFFERS.take().unwrap();
//!     let irq = unsafe { Nvic::new() };
//!
//!     let mut mac = emac::Emac::new(hal, irq, enet, rings, emac::Config::new());
//!     mac.initialize(Some(on_event)).unwrap();
//!     mac.power_control(PowerState::Full).unwrap();
//!     mac
//! }
//! ```

mod bd;

pub use bd::{BufferConfig, Buffers, Descriptor, Rings, BUFFER_SIZE};

use crate::{
    major_minor, ral, Error, HalError, Interrupts, Irq, Nvic, PowerState, Result, Version,
};

/// A 48-bit Ethernet MAC address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

bitflags::bitflags! {
    /// Events signaled to the application callback.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Event : u32 {
        const RX_FRAME = 1 << 0;
        const TX_FRAME = 1 << 1;
        const WAKEUP = 1 << 2;
        const TIMER_ALARM = 1 << 3;
    }

    /// Flags for [`send_frame()`](EthernetMac::send_frame).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TxFlags : u32 {
        /// More fragments follow.
        const FRAGMENT = 1 << 0;
        const EVENT = 1 << 1;
        const TIMESTAMP = 1 << 2;
    }

    /// ENET interrupt sources, as found in EIR / EIMR.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Interrupt : u32 {
        const TX_FRAME = 1 << 27;
        const RX_FRAME = 1 << 25;
        const MII = 1 << 23;
        const WAKEUP = 1 << 17;
    }

    /// MAC special configuration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SpecialConfig : u32 {
        const RX_BROADCAST_REJECT = 1 << 3;
        const STORE_AND_FWD_DISABLE = 1 << 5;
        const PROMISCUOUS = 1 << 7;
        const MII_LOOP = 1 << 8;
    }

    /// Receive accelerator configuration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RxAccel : u8 {
        const IP_CHECK = 1 << 1;
        const PROTO_CHECK = 1 << 2;
        const MAC_CHECK = 1 << 6;
    }

    /// Transmit accelerator configuration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TxAccel : u8 {
        const IP_CHECK = 1 << 3;
        const PROTO_CHECK = 1 << 4;
    }

    /// Checksums computed by the hardware.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChecksumOffload : u8 {
        const IP4 = 1 << 0;
        const IP6 = 1 << 1;
        const UDP = 1 << 2;
        const TCP = 1 << 3;
        const ICMP = 1 << 4;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Flags : u8 {
        const INIT = 1 << 0;
        const POWER = 1 << 1;
    }
}

/// Media independent interface between MAC and PHY.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaInterface {
    Mii,
    Rmii,
}

/// MII link speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speed {
    M10,
    M100,
}

/// MII duplex mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

/// MAC configuration handed to the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacConfig {
    pub special: SpecialConfig,
    pub interrupts: Interrupt,
    pub rx_max_frame_len: u16,
    pub media_interface: MediaInterface,
    pub speed: Speed,
    pub duplex: Duplex,
    pub rx_accel: RxAccel,
    pub tx_accel: TxAccel,
}

impl MacConfig {
    /// The configuration used when the MAC powers up.
    fn power_up(config: &Config) -> Self {
        MacConfig {
            special: if config.checksum_offload {
                SpecialConfig::empty()
            } else {
                SpecialConfig::STORE_AND_FWD_DISABLE
            },
            interrupts: Interrupt::TX_FRAME | Interrupt::RX_FRAME | Interrupt::WAKEUP,
            rx_max_frame_len: BUFFER_SIZE as u16,
            media_interface: config.media_interface,
            speed: Speed::M100,
            duplex: Duplex::Full,
            rx_accel: RxAccel::empty(),
            tx_accel: TxAccel::empty(),
        }
    }
}

/// Board and build options for the Ethernet MAC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Let the hardware compute and check IP / protocol checksums.
    ///
    /// Checksum offload needs store and forward mode.
    pub checksum_offload: bool,
    /// MII when all four data lines are routed, otherwise RMII.
    pub media_interface: MediaInterface,
    /// Number of status polls before a PHY access gives up.
    pub phy_timeout_loops: u32,
}

impl Config {
    pub const fn new() -> Self {
        Config {
            checksum_offload: true,
            media_interface: MediaInterface::Rmii,
            phy_timeout_loops: 600_000_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// What the driver supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub checksum_offload_rx: ChecksumOffload,
    pub checksum_offload_tx: ChecksumOffload,
    pub media_interface: MediaInterface,
    /// The driver provides its own MAC address.
    pub mac_address: bool,
    pub event_rx_frame: bool,
    pub event_tx_frame: bool,
    pub event_wakeup: bool,
    pub precision_timer: bool,
}

/// Descriptor ring selection for [`Control::Flush`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushTarget {
    Rx,
    Tx,
}

/// Requests for [`control()`](EthernetMac::control).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Apply a link configuration, encoded as CMSIS configuration bits.
    Configure(u32),
    TransmitEnable(bool),
    ReceiveEnable(bool),
    Flush(FlushTarget),
    Sleep(bool),
    VlanFilter(u32),
}

/// CMSIS `ARM_ETH_MAC_CONFIGURE` argument fields.
pub mod configure {
    pub const SPEED_MASK: u32 = 0x3;
    pub const SPEED_10M: u32 = 0;
    pub const SPEED_100M: u32 = 1;
    pub const SPEED_1G: u32 = 2;
    pub const DUPLEX_FULL: u32 = 1 << 2;
    pub const LOOPBACK: u32 = 1 << 4;
    pub const CHECKSUM_OFFLOAD_RX: u32 = 1 << 5;
    pub const CHECKSUM_OFFLOAD_TX: u32 = 1 << 6;
    pub const ADDRESS_BROADCAST: u32 = 1 << 7;
    pub const ADDRESS_MULTICAST: u32 = 1 << 8;
    pub const ADDRESS_ALL: u32 = 1 << 9;
}

/// Timer requests for [`control_timer()`](EthernetMac::control_timer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerControl {
    GetTime,
    SetTime,
    IncTime,
    DecTime,
    SetAlarm,
    AdjustClock,
}

/// A precision timer value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Time {
    pub ns: u32,
    pub sec: u32,
}

/// State of the next received frame, as reported by the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxFrame {
    /// No frame received.
    Empty,
    /// A good frame of this many bytes.
    Ready(u32),
    /// The next descriptor holds an errored frame.
    Error,
}

/// A vendor layer send failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    /// No free transmit descriptor.
    Busy,
    Failed,
}

/// Completion events raised by the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalEvent {
    Rx,
    Tx,
    Wakeup,
}

/// ENET vendor layer.
pub trait Hal {
    /// ENET peripheral (IPG) clock frequency.
    fn clock_hz(&self) -> u32;
    /// Initialize the MAC, and hand over the descriptor rings.
    fn init(
        &mut self,
        config: &MacConfig,
        buffers: &BufferConfig,
        address: &MacAddress,
        clock_hz: u32,
    );
    fn deinit(&mut self);

    fn mac_address(&self) -> MacAddress;
    fn set_mac_address(&mut self, address: &MacAddress);
    /// Add the address to the group hash.
    fn add_multicast_group(&mut self, address: &MacAddress);

    fn send_frame(&mut self, frame: &[u8]) -> core::result::Result<(), SendError>;
    fn rx_frame_size(&mut self) -> RxFrame;
    /// Copy out the next frame, and release its descriptor.
    ///
    /// `None` drops the frame.
    fn read_frame(&mut self, frame: Option<&mut [u8]>) -> core::result::Result<(), HalError>;
    /// Tell the DMA engine that receive descriptors are available.
    fn active_read(&mut self);

    fn enable_interrupts(&mut self, mask: Interrupt);
    fn disable_interrupts(&mut self, mask: Interrupt);
    fn clear_interrupt_status(&mut self, mask: Interrupt);
    fn interrupt_status(&self) -> Interrupt;
    fn set_sleep_mode(&mut self, enable: bool);

    fn start_smi_read(&mut self, phy: u8, reg: u8);
    fn start_smi_write(&mut self, phy: u8, reg: u8, data: u16);
    fn smi_data(&self) -> u32;

    /// Returns the next completion event, if any.
    fn poll(&mut self) -> Option<HalEvent>;
}

/// Ethernet MAC operations.
pub trait EthernetMac {
    fn version(&self) -> Version;
    fn capabilities(&self) -> Capabilities;
    /// Register the event callback. Does nothing when already initialized.
    fn initialize(&mut self, callback: Option<fn(Event)>) -> Result<()>;
    fn uninitialize(&mut self) -> Result<()>;
    fn power_control(&mut self, state: PowerState) -> Result<()>;
    fn get_mac_address(&self) -> MacAddress;
    fn set_mac_address(&mut self, address: &MacAddress) -> Result<()>;
    /// Accept multicast frames for these addresses, and only these.
    fn set_address_filter(&mut self, addresses: &[MacAddress]) -> Result<()>;
    /// Send a frame, or one fragment of a frame.
    fn send_frame(&mut self, frame: &[u8], flags: TxFlags) -> Result<()>;
    /// Read the next frame. `None` drops the frame.
    ///
    /// Returns the number of bytes read.
    fn read_frame(&mut self, frame: Option<&mut [u8]>) -> Result<usize>;
    /// Size of the next good frame, or 0 when there's none.
    fn rx_frame_size(&mut self) -> u32;
    fn rx_frame_time(&mut self) -> Result<Time>;
    fn tx_frame_time(&mut self) -> Result<Time>;
    fn control_timer(&mut self, control: TimerControl, time: &mut Time) -> Result<()>;
    fn control(&mut self, control: Control) -> Result<()>;
    fn phy_read(&mut self, phy: u8, reg: u8) -> Result<u16>;
    fn phy_write(&mut self, phy: u8, reg: u8, data: u16) -> Result<()>;
}

/// The Ethernet MAC driver.
pub struct Emac<H, I = Nvic> {
    hal: H,
    irq: I,
    enet: ral::Instance<ral::enet::RegisterBlock>,
    rings: Rings,
    config: Config,
    callback: Option<fn(Event)>,
    flags: Flags,
    address: MacAddress,
    clock_hz: u32,
    mac: MacConfig,
    tx_buffer: [u8; BUFFER_SIZE],
    tx_len: usize,
}

impl<H: Hal, I: Interrupts> Emac<H, I> {
    pub fn new(
        hal: H,
        irq: I,
        enet: ral::Instance<ral::enet::RegisterBlock>,
        rings: Rings,
        config: Config,
    ) -> Self {
        Emac {
            hal,
            irq,
            enet,
            rings,
            mac: MacConfig::power_up(&config),
            config,
            callback: None,
            flags: Flags::empty(),
            address: MacAddress::default(),
            clock_hz: 0,
            tx_buffer: [0; BUFFER_SIZE],
            tx_len: 0,
        }
    }

    /// Access the vendor layer.
    pub fn hal(&self) -> &H {
        &self.hal
    }

    fn powered(&self) -> Result<()> {
        if self.flags.contains(Flags::POWER) {
            Ok(())
        } else {
            debug!("EMAC not powered");
            Err(Error::Unspecified)
        }
    }

    fn send(&mut self, accumulated: bool, frame: &[u8]) -> Result<()> {
        let result = if accumulated {
            let result = self.hal.send_frame(&self.tx_buffer[..self.tx_len]);
            self.tx_len = 0;
            result
        } else {
            self.hal.send_frame(frame)
        };
        match result {
            Ok(()) => Ok(()),
            Err(SendError::Busy) => Err(Error::Busy),
            Err(SendError::Failed) => {
                warn!("EMAC send failed");
                Err(Error::Unspecified)
            }
        }
    }

    fn configure(&mut self, arg: u32) -> Result<()> {
        use configure::*;

        let speed = match arg & SPEED_MASK {
            SPEED_10M => Speed::M10,
            SPEED_100M => Speed::M100,
            SPEED_1G => return Err(Error::Unsupported),
            _ => return Err(Error::Unspecified),
        };
        let checksum = arg & (CHECKSUM_OFFLOAD_RX | CHECKSUM_OFFLOAD_TX);
        if checksum != 0 && !self.config.checksum_offload {
            return Err(Error::Unsupported);
        }

        let mac = &mut self.mac;
        mac.speed = speed;
        mac.duplex = if arg & DUPLEX_FULL != 0 {
            Duplex::Full
        } else {
            Duplex::Half
        };
        mac.media_interface = self.config.media_interface;
        mac.special
            .set(SpecialConfig::MII_LOOP, arg & LOOPBACK != 0);
        mac.rx_accel = if arg & CHECKSUM_OFFLOAD_RX != 0 {
            RxAccel::IP_CHECK | RxAccel::PROTO_CHECK | RxAccel::MAC_CHECK
        } else {
            RxAccel::empty()
        };
        mac.tx_accel = if arg & CHECKSUM_OFFLOAD_TX != 0 {
            TxAccel::IP_CHECK | TxAccel::PROTO_CHECK
        } else {
            TxAccel::empty()
        };
        mac.special.set(
            SpecialConfig::RX_BROADCAST_REJECT,
            arg & ADDRESS_BROADCAST == 0,
        );
        mac.special
            .set(SpecialConfig::PROMISCUOUS, arg & ADDRESS_ALL != 0);

        // Accept all multicast by filling the group hash.
        let hash = if arg & ADDRESS_MULTICAST != 0 {
            u32::MAX
        } else {
            0
        };
        ral::write_reg!(ral::enet, self.enet, GALR, hash);
        ral::write_reg!(ral::enet, self.enet, GAUR, hash);

        debug!("EMAC configure {:#X}", arg);
        self.hal.init(
            &self.mac,
            &self.rings.config(),
            &self.address,
            self.clock_hz,
        );
        // Frames flow once the application enables TX / RX.
        self.hal
            .disable_interrupts(Interrupt::RX_FRAME | Interrupt::TX_FRAME);
        Ok(())
    }

    /// Wait for the SMI frame to complete.
    fn wait_mii(&mut self) -> Result<()> {
        let mut loops = self.config.phy_timeout_loops;
        while !self.hal.interrupt_status().contains(Interrupt::MII) {
            loops = loops.saturating_sub(1);
            if loops == 0 {
                debug!("PHY access timeout");
                return Err(Error::Unspecified);
            }
        }
        Ok(())
    }

    /// Handle ENET interrupts.
    ///
    /// Call this from the ENET interrupt handler.
    pub fn on_interrupt(&mut self) {
        while let Some(event) = self.hal.poll() {
            let event = match event {
                HalEvent::Rx => Event::RX_FRAME,
                HalEvent::Tx => Event::TX_FRAME,
                HalEvent::Wakeup => Event::WAKEUP,
            };
            trace!("EMAC event {:?}", event);
            if let Some(callback) = self.callback {
                callback(event);
            }
        }
    }
}

impl<H: Hal, I: Interrupts> EthernetMac for Emac<H, I> {
    fn version(&self) -> Version {
        Version {
            api: major_minor(2, 2),
            driver: major_minor(1, 6),
        }
    }

    fn capabilities(&self) -> Capabilities {
        let checksums = if self.config.checksum_offload {
            ChecksumOffload::all()
        } else {
            ChecksumOffload::empty()
        };
        Capabilities {
            checksum_offload_rx: checksums,
            checksum_offload_tx: checksums,
            media_interface: self.config.media_interface,
            mac_address: false,
            event_rx_frame: true,
            event_tx_frame: true,
            event_wakeup: true,
            precision_timer: false,
        }
    }

    fn initialize(&mut self, callback: Option<fn(Event)>) -> Result<()> {
        if self.flags.contains(Flags::INIT) {
            return Ok(());
        }
        self.clock_hz = self.hal.clock_hz();
        self.callback = callback;
        self.flags = Flags::INIT;
        Ok(())
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.flags = Flags::empty();
        Ok(())
    }

    fn power_control(&mut self, state: PowerState) -> Result<()> {
        match state {
            PowerState::Off => {
                self.hal.deinit();
                self.irq.disable(Irq::ENET);
                self.tx_len = 0;
                self.flags = Flags::INIT;
                debug!("EMAC power off");
            }
            PowerState::Low => return Err(Error::Unsupported),
            PowerState::Full => {
                if !self.flags.contains(Flags::INIT) {
                    debug!("EMAC not initialized");
                    return Err(Error::Unspecified);
                }
                if self.flags.contains(Flags::POWER) {
                    return Ok(());
                }
                self.mac = MacConfig::power_up(&self.config);
                self.hal.init(
                    &self.mac,
                    &self.rings.config(),
                    &self.address,
                    self.clock_hz,
                );
                self.irq.enable(Irq::ENET);
                self.flags |= Flags::POWER;
                debug!("EMAC power on");
            }
        }
        Ok(())
    }

    fn get_mac_address(&self) -> MacAddress {
        self.hal.mac_address()
    }

    fn set_mac_address(&mut self, address: &MacAddress) -> Result<()> {
        self.powered()?;
        self.address = *address;
        self.hal.set_mac_address(address);
        Ok(())
    }

    fn set_address_filter(&mut self, addresses: &[MacAddress]) -> Result<()> {
        self.powered()?;
        ral::write_reg!(ral::enet, self.enet, GALR, 0);
        ral::write_reg!(ral::enet, self.enet, GAUR, 0);
        for address in addresses {
            self.hal.add_multicast_group(address);
        }
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8], flags: TxFlags) -> Result<()> {
        if frame.is_empty() {
            return Err(Error::Parameter);
        }
        self.powered()?;
        if self.tx_len + frame.len() > self.tx_buffer.len() {
            debug!("EMAC frame overflows the fragment buffer");
            return Err(Error::Unspecified);
        }

        let fragment = flags.contains(TxFlags::FRAGMENT);
        if self.tx_len == 0 && !fragment {
            return self.send(false, frame);
        }

        self.tx_buffer[self.tx_len..self.tx_len + frame.len()].copy_from_slice(frame);
        self.tx_len += frame.len();
        if fragment {
            Ok(())
        } else {
            self.send(true, &[])
        }
    }

    fn read_frame(&mut self, frame: Option<&mut [u8]>) -> Result<usize> {
        self.powered()?;
        let len = frame.as_ref().map_or(0, |frame| frame.len());
        self.hal.read_frame(frame)?;
        Ok(len)
    }

    fn rx_frame_size(&mut self) -> u32 {
        if !self.flags.contains(Flags::POWER) {
            return 0;
        }
        loop {
            match self.hal.rx_frame_size() {
                RxFrame::Empty => return 0,
                RxFrame::Ready(len) => return len,
                RxFrame::Error => {
                    trace!("EMAC dropping errored frame");
                    let _ = self.hal.read_frame(None);
                }
            }
        }
    }

    fn rx_frame_time(&mut self) -> Result<Time> {
        Err(Error::Unsupported)
    }

    fn tx_frame_time(&mut self) -> Result<Time> {
        Err(Error::Unsupported)
    }

    fn control_timer(&mut self, _: TimerControl, _: &mut Time) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn control(&mut self, control: Control) -> Result<()> {
        self.powered()?;
        match control {
            Control::Configure(arg) => self.configure(arg)?,
            Control::TransmitEnable(enable) => {
                if enable {
                    self.hal.enable_interrupts(Interrupt::TX_FRAME);
                } else {
                    self.hal.disable_interrupts(Interrupt::TX_FRAME);
                }
            }
            Control::ReceiveEnable(enable) => {
                if enable {
                    self.hal.enable_interrupts(Interrupt::RX_FRAME);
                    self.hal.active_read();
                } else {
                    self.hal.disable_interrupts(Interrupt::RX_FRAME);
                }
            }
            Control::Flush(FlushTarget::Rx) => {
                self.hal.disable_interrupts(Interrupt::RX_FRAME);
                self.rings.flush_rx();
                self.hal.enable_interrupts(Interrupt::RX_FRAME);
            }
            Control::Flush(FlushTarget::Tx) => {
                self.hal.disable_interrupts(Interrupt::TX_FRAME);
                self.rings.flush_tx();
                self.hal.enable_interrupts(Interrupt::TX_FRAME);
            }
            Control::Sleep(true) => {
                self.hal.enable_interrupts(Interrupt::WAKEUP);
                self.hal.set_sleep_mode(true);
            }
            Control::Sleep(false) => {
                self.hal.disable_interrupts(Interrupt::WAKEUP);
                self.hal.set_sleep_mode(false);
            }
            Control::VlanFilter(_) => return Err(Error::Unsupported),
        }
        Ok(())
    }

    fn phy_read(&mut self, phy: u8, reg: u8) -> Result<u16> {
        self.powered()?;
        self.hal.clear_interrupt_status(Interrupt::MII);
        self.hal.start_smi_read(phy, reg);
        self.wait_mii()?;
        Ok(self.hal.smi_data() as u16)
    }

    fn phy_write(&mut self, phy: u8, reg: u8, data: u16) -> Result<()> {
        self.powered()?;
        self.hal.clear_interrupt_status(Interrupt::MII);
        self.hal.start_smi_write(phy, reg, data);
        self.wait_mii()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{cell::Cell, cell::RefCell, collections::VecDeque, vec::Vec};

    use super::*;
    use crate::testing::{self, MockInterrupts};

    #[derive(Default)]
    struct MockHal {
        inits: Vec<MacConfig>,
        sent: Vec<Vec<u8>>,
        busy: bool,
        rx: VecDeque<RxFrame>,
        dropped: usize,
        events: VecDeque<HalEvent>,
        disabled: Vec<Interrupt>,
        enabled: Vec<Interrupt>,
        groups: Vec<MacAddress>,
        /// Status polls before the SMI frame completes. `None` never completes.
        mii_after: Option<u32>,
        polls: Cell<u32>,
    }

    impl Hal for MockHal {
        fn clock_hz(&self) -> u32 {
            150_000_000
        }
        fn init(&mut self, config: &MacConfig, _: &BufferConfig, _: &MacAddress, clock_hz: u32) {
            assert_eq!(clock_hz, 150_000_000);
            self.inits.push(*config);
        }
        fn deinit(&mut self) {}
        fn mac_address(&self) -> MacAddress {
            MacAddress([0x02, 0, 0, 0, 0, 1])
        }
        fn set_mac_address(&mut self, _: &MacAddress) {}
        fn add_multicast_group(&mut self, address: &MacAddress) {
            self.groups.push(*address);
        }
        fn send_frame(&mut self, frame: &[u8]) -> core::result::Result<(), SendError> {
            if self.busy {
                return Err(SendError::Busy);
            }
            self.sent.push(frame.to_vec());
            self.events.push_back(HalEvent::Tx);
            Ok(())
        }
        fn rx_frame_size(&mut self) -> RxFrame {
            self.rx.front().copied().unwrap_or(RxFrame::Empty)
        }
        fn read_frame(&mut self, frame: Option<&mut [u8]>) -> core::result::Result<(), HalError> {
            if frame.is_none() {
                self.dropped += 1;
            }
            self.rx.pop_front().map(|_| ()).ok_or(HalError)
        }
        fn active_read(&mut self) {}
        fn enable_interrupts(&mut self, mask: Interrupt) {
            self.enabled.push(mask);
        }
        fn disable_interrupts(&mut self, mask: Interrupt) {
            self.disabled.push(mask);
        }
        fn clear_interrupt_status(&mut self, _: Interrupt) {
            self.polls.set(0);
        }
        fn interrupt_status(&self) -> Interrupt {
            let polls = self.polls.get() + 1;
            self.polls.set(polls);
            match self.mii_after {
                Some(after) if polls >= after => Interrupt::MII,
                _ => Interrupt::empty(),
            }
        }
        fn set_sleep_mode(&mut self, _: bool) {}
        fn start_smi_read(&mut self, _: u8, _: u8) {}
        fn start_smi_write(&mut self, _: u8, _: u8, _: u16) {}
        fn smi_data(&self) -> u32 {
            0x1234_7949
        }
        fn poll(&mut self) -> Option<HalEvent> {
            self.events.pop_front()
        }
    }

    std::thread_local! {
        static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
    }

    fn record(event: Event) {
        EVENTS.with(|events| events.borrow_mut().push(event));
    }

    fn events() -> Vec<Event> {
        EVENTS.with(|events| events.borrow().clone())
    }

    fn powered(hal: MockHal) -> Emac<MockHal, MockInterrupts> {
        let buffers: &'static Buffers = std::boxed::Box::leak(std::boxed::Box::new(Buffers::new()));
        let config = Config {
            phy_timeout_loops: 100,
            ..Config::new()
        };
        let mut emac = Emac::new(
            hal,
            MockInterrupts::default(),
            testing::leak(ral::enet::RegisterBlock::new()),
            buffers.take().unwrap(),
            config,
        );
        emac.initialize(Some(record)).unwrap();
        emac.power_control(PowerState::Full).unwrap();
        emac
    }

    #[test]
    fn power_sequence() {
        let mut emac = powered(MockHal::default());
        assert!(emac.irq.is_enabled(Irq::ENET));
        assert_eq!(emac.hal.inits.len(), 1);
        assert_eq!(emac.hal.inits[0].speed, Speed::M100);
        assert_eq!(emac.hal.inits[0].duplex, Duplex::Full);
        assert_eq!(emac.hal.inits[0].special, SpecialConfig::empty());

        // Already powered.
        emac.power_control(PowerState::Full).unwrap();
        assert_eq!(emac.hal.inits.len(), 1);

        assert_eq!(emac.power_control(PowerState::Low), Err(Error::Unsupported));
        emac.power_control(PowerState::Off).unwrap();
        assert!(!emac.irq.is_enabled(Irq::ENET));
        assert_eq!(
            emac.send_frame(&[0; 64], TxFlags::empty()),
            Err(Error::Unspecified)
        );
    }

    #[test]
    fn send_unfragmented_frame() {
        let mut emac = powered(MockHal::default());
        let frame: Vec<u8> = (0..1514).map(|i| i as u8).collect();

        assert_eq!(emac.send_frame(&frame, TxFlags::empty()), Ok(()));
        assert_eq!(emac.hal.sent, [frame]);

        emac.on_interrupt();
        assert_eq!(events(), [Event::TX_FRAME]);
    }

    #[test]
    fn fragments_are_concatenated() {
        let mut emac = powered(MockHal::default());

        emac.send_frame(&[1, 2, 3], TxFlags::FRAGMENT).unwrap();
        emac.send_frame(&[4, 5], TxFlags::FRAGMENT).unwrap();
        assert!(emac.hal.sent.is_empty());
        emac.send_frame(&[6], TxFlags::empty()).unwrap();
        assert_eq!(emac.hal.sent, [std::vec![1, 2, 3, 4, 5, 6]]);

        // The fragment buffer is empty again.
        emac.send_frame(&[7], TxFlags::empty()).unwrap();
        assert_eq!(emac.hal.sent[1], [7]);
    }

    #[test]
    fn fragment_overflow() {
        let mut emac = powered(MockHal::default());

        emac.send_frame(&[0xAA; 1000], TxFlags::FRAGMENT).unwrap();
        assert_eq!(
            emac.send_frame(&[0xBB; 537], TxFlags::empty()),
            Err(Error::Unspecified)
        );
        assert!(emac.hal.sent.is_empty());

        // Accumulated data survives the overflow.
        emac.send_frame(&[0xBB; 536], TxFlags::empty()).unwrap();
        assert_eq!(emac.hal.sent[0].len(), BUFFER_SIZE);
        assert_eq!(emac.hal.sent[0][999], 0xAA);
        assert_eq!(emac.hal.sent[0][1000], 0xBB);
    }

    #[test]
    fn send_busy() {
        let mut emac = powered(MockHal {
            busy: true,
            ..Default::default()
        });
        assert_eq!(emac.send_frame(&[0; 60], TxFlags::empty()), Err(Error::Busy));
        assert_eq!(emac.send_frame(&[], TxFlags::empty()), Err(Error::Parameter));
    }

    #[test]
    fn errored_frames_are_dropped() {
        let mut emac = powered(MockHal {
            rx: [RxFrame::Error, RxFrame::Error, RxFrame::Ready(64)]
                .into_iter()
                .collect(),
            ..Default::default()
        });

        assert_eq!(emac.rx_frame_size(), 64);
        assert_eq!(emac.hal.dropped, 2);

        let mut frame = [0; 64];
        assert_eq!(emac.read_frame(Some(&mut frame)), Ok(64));
        assert_eq!(emac.rx_frame_size(), 0);
        assert_eq!(emac.read_frame(None), Err(Error::Unspecified));
    }

    #[test]
    fn flush_rx() {
        let mut emac = powered(MockHal::default());
        emac.rings.rx()[0].CONTROL.write(0);

        emac.control(Control::Flush(FlushTarget::Rx)).unwrap();
        assert!(emac
            .rings
            .rx()
            .iter()
            .all(|bd| bd.CONTROL.read() & bd::RX_EMPTY != 0));
        assert_eq!(emac.hal.disabled.last(), Some(&Interrupt::RX_FRAME));
        assert_eq!(emac.hal.enabled.last(), Some(&Interrupt::RX_FRAME));
    }

    #[test]
    fn configure() {
        let mut emac = powered(MockHal::default());

        // 10M, half duplex, multicast, RX checksums.
        let arg = configure::SPEED_10M
            | configure::ADDRESS_MULTICAST
            | configure::CHECKSUM_OFFLOAD_RX;
        emac.control(Control::Configure(arg)).unwrap();

        let mac = emac.hal.inits.last().copied().unwrap();
        assert_eq!(mac.speed, Speed::M10);
        assert_eq!(mac.duplex, Duplex::Half);
        assert!(mac.special.contains(SpecialConfig::RX_BROADCAST_REJECT));
        assert!(mac.rx_accel.contains(RxAccel::MAC_CHECK));
        assert_eq!(mac.tx_accel, TxAccel::empty());
        assert_eq!(emac.enet.GALR.read(), u32::MAX);
        assert_eq!(emac.enet.GAUR.read(), u32::MAX);
        assert_eq!(
            emac.hal.disabled.last(),
            Some(&(Interrupt::RX_FRAME | Interrupt::TX_FRAME))
        );

        let inits = emac.hal.inits.len();
        assert_eq!(
            emac.control(Control::Configure(configure::SPEED_1G)),
            Err(Error::Unsupported)
        );
        assert_eq!(emac.control(Control::Configure(3)), Err(Error::Unspecified));
        assert_eq!(emac.hal.inits.len(), inits);

        emac.set_address_filter(&[MacAddress([0x01, 0, 0x5E, 0, 0, 1])])
            .unwrap();
        assert_eq!(emac.enet.GALR.read(), 0);
        assert_eq!(emac.hal.groups.len(), 1);
    }

    #[test]
    fn phy_access() {
        let mut emac = powered(MockHal {
            mii_after: Some(3),
            ..Default::default()
        });
        assert_eq!(emac.phy_read(0, 2), Ok(0x7949));
        assert_eq!(emac.phy_write(0, 0, 0x8000), Ok(()));

        emac.hal.mii_after = None;
        assert_eq!(emac.phy_read(0, 2), Err(Error::Unspecified));
    }

    #[test]
    fn unsupported_operations() {
        let mut emac = powered(MockHal::default());
        assert_eq!(emac.rx_frame_time(), Err(Error::Unsupported));
        assert_eq!(
            emac.control_timer(TimerControl::GetTime, &mut Time::default()),
            Err(Error::Unsupported)
        );
        assert_eq!(emac.control(Control::VlanFilter(1)), Err(Error::Unsupported));
        assert_eq!(emac.version().api, 0x0202);
        assert!(emac.capabilities().event_wakeup);
    }
}
