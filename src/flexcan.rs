//! FlexCAN driver
//!
//! [`Flexcan`] implements [`Can`] for one FlexCAN instance. The driver
//! presents the controller as a list of CAN objects:
//!
//! - with the receive FIFO enabled, object 0 is the FIFO. Its filters live
//!   in a software ID filter table, mirrored into the hardware.
//! - every other object is one message buffer ("mailbox").
//!
//! The FIFO occupies the first message buffers. [`Config`] derives how
//! many, and so how many mailbox objects remain.
//!
//! ```no_run
//! use imxrt_cmsis_drivers::{flexcan, ral, Irq, Nvic, PowerState};
//! use flexcan::{Can, FilterOperation, Id, ObjectConfig};
//!
//! fn start<H: flexcan::Hal>(hal: H) -> flexcan::Flexcan<H> {
//!     let can1 = unsafe { ral::Instance::new(ral::flexcan::CAN1) };
//!     let ccm = unsafe { ral::Instance::new(ral::ccm::CCM) };
//!     let config = flexcan::Config::new().with_fifo_filters(16);
//!
//!     let mut can = flexcan::Flexcan::new(hal, unsafe { Nvic::new() }, Irq::CAN1, can1, ccm, config);
//!     can.initialize(None, None).unwrap();
//!     can.power_control(PowerState::Full).unwrap();
//!     can.object_set_filter(0, FilterOperation::ExactAdd, Id::Standard(0x123), 0).unwrap();
//!     can.object_configure(0, ObjectConfig::Rx).unwrap();
//!     can
//! }
//! ```

mod filter;
mod timing;

pub use filter::{Id, MAX_FILTERS};
pub use timing::{BitSegments, Timing};

use crate::{major_minor, ral, Error, Interrupts, Irq, Nvic, PowerState, Result, Version};
use filter::FilterTable;

/// Number of message buffers.
const MAILBOXES: usize = ral::flexcan::MAILBOXES;

/// Driver options for one FlexCAN instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Use the receive FIFO as object 0.
    pub rx_fifo: bool,
    fifo_filters: u8,
    /// Accepted bit clock deviation, in 1/1024 units.
    pub clock_tolerance: u32,
    /// USB1 PLL (PLL3) frequency, used when the CAN clock derives from it.
    pub usb1_pll_hz: u32,
    /// Bitrate programmed at power up.
    pub default_bitrate: u32,
}

impl Config {
    pub const fn new() -> Self {
        Config {
            rx_fifo: true,
            fifo_filters: 64,
            clock_tolerance: 15,
            usb1_pll_hz: 480_000_000,
            default_bitrate: 1_000_000,
        }
    }

    /// Set the number of receive FIFO ID filters.
    ///
    /// # Panics
    ///
    /// Panics if `filters` is less than 8, or greater than 128.
    pub const fn with_fifo_filters(mut self, filters: u8) -> Self {
        assert!(filters >= 8 && filters as usize <= MAX_FILTERS);
        self.fifo_filters = filters;
        self
    }

    pub const fn fifo_filters(&self) -> u8 {
        self.fifo_filters
    }

    /// Message buffers used by the receive FIFO and its filter table.
    pub const fn fifo_mailboxes(&self) -> usize {
        if self.rx_fifo {
            6 + (self.fifo_filters as usize + 3) / 4
        } else {
            0
        }
    }

    const fn fifo_objects(&self) -> usize {
        self.rx_fifo as usize
    }

    /// Offset between a mailbox object and its message buffer, minus one.
    ///
    /// Also the number of FIFO filters that can have an individual mask.
    pub const fn mailbox_offset(&self) -> usize {
        if self.rx_fifo {
            self.fifo_mailboxes() - 1
        } else {
            0
        }
    }

    pub const fn mailbox_objects(&self) -> usize {
        MAILBOXES - self.fifo_mailboxes()
    }

    /// Total number of CAN objects.
    pub const fn objects(&self) -> usize {
        self.fifo_objects() + self.mailbox_objects()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub num_objects: u32,
    pub reentrant_operation: bool,
    pub fd_mode: bool,
    pub restricted_mode: bool,
    pub monitor_mode: bool,
    pub internal_loopback: bool,
    pub external_loopback: bool,
}

/// Capabilities of a single object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectCapabilities {
    pub tx: bool,
    pub rx: bool,
    pub rx_rtr_tx_data: bool,
    pub tx_rtr_rx_data: bool,
    pub multiple_filters: bool,
    pub exact_filtering: bool,
    pub range_filtering: bool,
    pub mask_filtering: bool,
    /// Number of messages the object can buffer.
    pub message_depth: u8,
}

const FIFO_CAPABILITIES: ObjectCapabilities = ObjectCapabilities {
    tx: false,
    rx: true,
    rx_rtr_tx_data: false,
    tx_rtr_rx_data: false,
    multiple_filters: true,
    exact_filtering: true,
    range_filtering: false,
    mask_filtering: true,
    message_depth: 6,
};

const MAILBOX_CAPABILITIES: ObjectCapabilities = ObjectCapabilities {
    tx: true,
    rx: true,
    rx_rtr_tx_data: false,
    tx_rtr_rx_data: false,
    multiple_filters: false,
    exact_filtering: true,
    range_filtering: false,
    mask_filtering: true,
    message_depth: 1,
};

/// Bitrate selection for [`set_bitrate()`](Can::set_bitrate).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitrateSelect {
    /// Nominal (or arbitration phase) bitrate.
    Nominal,
    /// Data phase bitrate of CAN FD.
    FdData,
}

/// Operating modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Initialization,
    Normal,
    Restricted,
    Monitor,
    LoopbackInternal,
    LoopbackExternal,
}

/// Filter operations for [`object_set_filter()`](Can::object_set_filter).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperation {
    ExactAdd,
    ExactRemove,
    RangeAdd,
    RangeRemove,
    MaskableAdd,
    MaskableRemove,
}

/// Object configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectConfig {
    Inactive,
    Rx,
    Tx,
    RxRtrTxData,
    TxRtrRxData,
}

/// Requests for [`control()`](Can::control).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Abort the pending send on this object.
    AbortSend(u32),
    Retransmission(bool),
    FdMode(bool),
    TransceiverDelay(u32),
}

/// Message properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: Id,
    /// Remote transmission request.
    pub rtr: bool,
    /// Data length code.
    pub dlc: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitState {
    #[default]
    Inactive,
    Active,
    Passive,
    BusOff,
}

/// Last error code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LastError {
    #[default]
    NoError,
    BitError,
    StuffError,
    CrcError,
    FormError,
    AckError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub unit_state: UnitState,
    pub last_error_code: LastError,
    /// Estimated from the fault confinement state.
    pub tx_error_count: u8,
    /// Estimated from the fault confinement state.
    pub rx_error_count: u8,
}

/// Unit events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitEvent {
    Active,
    Passive,
    Warning,
    BusOff,
}

bitflags::bitflags! {
    /// Object events.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObjectEvent : u32 {
        const SEND_COMPLETE = 1 << 0;
        const RECEIVE = 1 << 1;
        const RECEIVE_OVERRUN = 1 << 2;
    }
}

/// Frame identifier format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Standard,
    Extended,
}

/// Data or remote frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Remote,
}

/// A frame, as exchanged with the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Identifier, in message buffer layout: standard identifiers start
    /// at bit 18.
    pub id: u32,
    pub format: FrameFormat,
    pub kind: FrameType,
    pub length: u8,
    pub data: [u8; 8],
}

const ID_STD_SHIFT: u32 = 18;

impl Frame {
    fn new(info: &MessageInfo, data: &[u8]) -> Self {
        let (id, format) = match info.id {
            Id::Standard(id) => ((id as u32 & 0x7FF) << ID_STD_SHIFT, FrameFormat::Standard),
            Id::Extended(id) => (id & 0x1FFF_FFFF, FrameFormat::Extended),
        };
        let mut frame = Frame {
            id,
            format,
            kind: if info.rtr {
                FrameType::Remote
            } else {
                FrameType::Data
            },
            length: data.len() as u8,
            data: [0; 8],
        };
        frame.data[..data.len()].copy_from_slice(data);
        frame
    }

    fn info(&self) -> MessageInfo {
        MessageInfo {
            id: match self.format {
                FrameFormat::Standard => Id::Standard(((self.id >> ID_STD_SHIFT) & 0x7FF) as u16),
                FrameFormat::Extended => Id::Extended(self.id & 0x1FFF_FFFF),
            },
            rtr: self.kind == FrameType::Remote,
            dlc: self.length,
        }
    }
}

/// Receive message buffer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MailboxFilter {
    /// Identifier, in message buffer layout.
    pub id: u32,
    pub format: FrameFormat,
}

/// Module configuration handed to the vendor layer at power up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleConfig {
    pub bitrate: u32,
    pub max_mailboxes: u8,
    pub individual_masks: bool,
    pub timing: Timing,
}

/// A receiver: the FIFO, or a message buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Receiver {
    Fifo,
    Mailbox(usize),
}

/// Completion events raised by the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalEvent {
    /// Error and status flags, as found in ESR1.
    ErrorStatus(u32),
    RxFifoIdle,
    RxFifoOverflow,
    /// Message buffer received a frame.
    RxIdle(usize),
    RxOverflow(usize),
    /// Message buffer sent its frame.
    TxIdle(usize),
}

/// FlexCAN vendor layer.
pub trait Hal {
    fn init(&mut self, config: &ModuleConfig, clock_hz: u32);
    fn deinit(&mut self);
    fn set_timing(&mut self, timing: &Timing);
    /// Enter freeze mode, and wait for the acknowledge.
    fn enter_freeze_mode(&mut self);
    fn exit_freeze_mode(&mut self);

    /// Program the FIFO ID filter table.
    fn set_rx_fifo_config(&mut self, filters: &[u32], enable: bool);
    fn set_rx_fifo_global_mask(&mut self, mask: u32);
    fn set_rx_mb_global_mask(&mut self, mask: u32);
    /// Configure a message buffer for reception. `None` disables it.
    fn set_rx_mb_config(&mut self, mailbox: usize, filter: Option<&MailboxFilter>);
    fn set_tx_mb_config(&mut self, mailbox: usize, enable: bool);

    /// Create the transfer handle that reports [`HalEvent`]s.
    fn create_handle(&mut self);
    fn start_receive(&mut self, receiver: Receiver) -> core::result::Result<(), crate::HalError>;
    fn abort_receive(&mut self, receiver: Receiver);
    /// The last frame received by `receiver`.
    fn received(&self, receiver: Receiver) -> Frame;
    fn send(&mut self, mailbox: usize, frame: &Frame) -> core::result::Result<(), crate::HalError>;
    fn abort_send(&mut self, mailbox: usize);

    /// Returns the next completion event, if any.
    fn poll(&mut self) -> Option<HalEvent>;
}

/// CAN operations.
pub trait Can {
    fn version(&self) -> Version;
    fn capabilities(&self) -> Capabilities;
    /// Register the event callbacks. Does nothing when already initialized.
    fn initialize(
        &mut self,
        unit_event: Option<fn(UnitEvent)>,
        object_event: Option<fn(u32, ObjectEvent)>,
    ) -> Result<()>;
    fn uninitialize(&mut self) -> Result<()>;
    fn power_control(&mut self, state: PowerState) -> Result<()>;
    /// CAN clock root frequency.
    fn clock(&self) -> u32;
    fn set_bitrate(&mut self, select: BitrateSelect, bitrate: u32, segments: BitSegments)
        -> Result<()>;
    fn set_mode(&mut self, mode: Mode) -> Result<()>;
    fn object_capabilities(&self, obj: u32) -> ObjectCapabilities;
    fn object_set_filter(
        &mut self,
        obj: u32,
        operation: FilterOperation,
        id: Id,
        arg: u32,
    ) -> Result<()>;
    fn object_configure(&mut self, obj: u32, config: ObjectConfig) -> Result<()>;
    /// Returns the number of data bytes accepted.
    fn message_send(&mut self, obj: u32, info: &MessageInfo, data: &[u8]) -> Result<usize>;
    /// Returns the message properties, and the number of data bytes read.
    fn message_read(&mut self, obj: u32, data: &mut [u8]) -> Result<(MessageInfo, usize)>;
    fn control(&mut self, control: Control) -> Result<()>;
    fn status(&self) -> Status;
}

/// A FlexCAN driver.
pub struct Flexcan<H, I = Nvic> {
    hal: H,
    irq: I,
    vector: Irq,
    can: ral::Instance<ral::flexcan::RegisterBlock>,
    ccm: ral::Instance<ral::ccm::RegisterBlock>,
    config: Config,
    initialized: bool,
    powered: bool,
    unit_event: Option<fn(UnitEvent)>,
    object_event: Option<fn(u32, ObjectEvent)>,
    status: Status,
    /// One bit per object configured for transmission.
    tx: u64,
    /// One bit per object configured for reception.
    rx: u64,
    filters: FilterTable,
}

impl<H: Hal, I: Interrupts> Flexcan<H, I> {
    /// Create a driver for the FlexCAN instance `can`, served by `vector`.
    pub fn new(
        hal: H,
        irq: I,
        vector: Irq,
        can: ral::Instance<ral::flexcan::RegisterBlock>,
        ccm: ral::Instance<ral::ccm::RegisterBlock>,
        config: Config,
    ) -> Self {
        Flexcan {
            hal,
            irq,
            vector,
            can,
            ccm,
            filters: FilterTable::new(config.fifo_filters as usize),
            config,
            initialized: false,
            powered: false,
            unit_event: None,
            object_event: None,
            status: Status::default(),
            tx: 0,
            rx: 0,
        }
    }

    fn is_fifo(&self, obj: u32) -> bool {
        obj == 0 && self.config.rx_fifo
    }

    /// The message buffer behind a mailbox object.
    fn mailbox(&self, obj: u32) -> Result<usize> {
        let mailbox = obj as usize + self.config.mailbox_offset() + 1;
        if (obj as usize) < self.config.objects() && mailbox < MAILBOXES {
            Ok(mailbox)
        } else {
            Err(Error::Parameter)
        }
    }

    /// The object behind a message buffer.
    fn object(&self, mailbox: usize) -> u32 {
        let offset = self.config.mailbox_offset();
        if mailbox > offset {
            (mailbox - offset - 1) as u32
        } else {
            mailbox as u32
        }
    }

    fn receiver(&self, obj: u32) -> Result<Receiver> {
        if self.is_fifo(obj) {
            Ok(Receiver::Fifo)
        } else {
            self.mailbox(obj).map(Receiver::Mailbox)
        }
    }

    fn check_object(&self, obj: u32) -> Result<()> {
        if (obj as usize) < self.config.objects() {
            Ok(())
        } else {
            Err(Error::Parameter)
        }
    }

    fn check_powered(&self) -> Result<()> {
        if self.powered {
            Ok(())
        } else {
            debug!("CAN not powered");
            Err(Error::Unspecified)
        }
    }

    fn signal_unit(&self, event: UnitEvent) {
        if let Some(unit_event) = self.unit_event {
            unit_event(event);
        }
    }

    fn signal_object(&self, obj: u32, event: ObjectEvent) {
        if let Some(object_event) = self.object_event {
            object_event(obj, event);
        }
    }

    /// Write an individual mask. Masks can only change in freeze mode.
    fn set_individual_mask(&mut self, index: usize, mask: u32) {
        self.hal.enter_freeze_mode();
        self.can.RXIMR[index].write(mask);
        self.hal.exit_freeze_mode();
    }

    fn fifo_filter(&mut self, operation: FilterOperation, id: Id, arg: u32) -> Result<()> {
        let entry = filter::entry(id);
        let offset = self.config.mailbox_offset();
        match operation {
            FilterOperation::ExactAdd | FilterOperation::MaskableAdd => {
                let maskable = operation == FilterOperation::MaskableAdd;
                if maskable && self.filters.len() >= offset {
                    debug!("CAN no individual mask left for the FIFO filter");
                    return Err(Error::Unspecified);
                }
                let Some(index) = self.filters.push(entry) else {
                    debug!("CAN FIFO filter table full");
                    return Err(Error::Unspecified);
                };
                if maskable {
                    self.set_individual_mask(index, filter::mask(id, arg));
                }
            }
            _ => {
                let Some(index) = self.filters.remove(entry) else {
                    return Ok(());
                };
                if operation == FilterOperation::MaskableRemove && index < offset {
                    // Masks follow their entries.
                    self.hal.enter_freeze_mode();
                    for i in index..offset {
                        let next = self.can.RXIMR[i + 1].read();
                        self.can.RXIMR[i].write(next);
                    }
                    self.hal.exit_freeze_mode();
                }
            }
        }
        let enable = !self.filters.is_empty();
        self.hal.set_rx_fifo_config(self.filters.entries(), enable);
        Ok(())
    }

    fn mailbox_filter(&mut self, obj: u32, operation: FilterOperation, id: Id, arg: u32) -> Result<()> {
        let mailbox = self.mailbox(obj)?;
        match operation {
            FilterOperation::ExactAdd | FilterOperation::MaskableAdd => {
                let (filter, mask) = match id {
                    Id::Standard(id) => (
                        MailboxFilter {
                            id: (id as u32 & 0x7FF) << ID_STD_SHIFT,
                            format: FrameFormat::Standard,
                        },
                        (arg & 0x7FF) << ID_STD_SHIFT,
                    ),
                    Id::Extended(id) => (
                        MailboxFilter {
                            id: id & 0x1FFF_FFFF,
                            format: FrameFormat::Extended,
                        },
                        arg & 0x1FFF_FFFF,
                    ),
                };
                self.hal.set_rx_mb_config(mailbox, Some(&filter));
                if operation == FilterOperation::MaskableAdd {
                    self.set_individual_mask(mailbox, mask);
                }
            }
            _ => {
                if operation == FilterOperation::MaskableRemove {
                    self.set_individual_mask(mailbox, 0);
                }
                self.hal.set_rx_mb_config(mailbox, None);
            }
        }
        Ok(())
    }

    fn on_error_status(&mut self, flags: u32) {
        use ral::flexcan::ESR1::FLTCONF::RW::*;

        let esr1 = ral::read_reg!(ral::flexcan, self.can, ESR1);
        let fault_confinement = (esr1 & ral::flexcan::ESR1::FLTCONF::mask)
            >> ral::flexcan::ESR1::FLTCONF::offset;
        let last_state = self.status.unit_state;

        let (state, tx_count, rx_count) = match fault_confinement {
            ERROR_ACTIVE => {
                let warning = |mask: u32| if esr1 & mask != 0 { 96 } else { 0 };
                (
                    UnitState::Active,
                    warning(ral::flexcan::ESR1::TXWRN::mask),
                    warning(ral::flexcan::ESR1::RXWRN::mask),
                )
            }
            ERROR_PASSIVE => (UnitState::Passive, 128, 128),
            _ => (UnitState::BusOff, 255, 255),
        };

        let error = |mask: u32| esr1 & mask != 0;
        let last_error_code = {
            use ral::flexcan::ESR1::*;
            if error(BIT1ERR::mask) || error(BIT0ERR::mask) {
                LastError::BitError
            } else if error(ACKERR::mask) {
                LastError::AckError
            } else if error(CRCERR::mask) {
                LastError::CrcError
            } else if error(FRMERR::mask) {
                LastError::FormError
            } else if error(STFERR::mask) {
                LastError::StuffError
            } else {
                LastError::NoError
            }
        };

        self.status = Status {
            unit_state: state,
            last_error_code,
            tx_error_count: tx_count,
            rx_error_count: rx_count,
        };
        trace!("CAN ESR1 {:#X}", esr1);

        if flags & ral::flexcan::ESR1::BOFFINT::mask != 0 {
            self.signal_unit(UnitEvent::BusOff);
        } else if last_state != state {
            self.signal_unit(match state {
                UnitState::Active => UnitEvent::Active,
                UnitState::Passive => UnitEvent::Passive,
                _ => UnitEvent::BusOff,
            });
        }
    }

    /// Handle FlexCAN interrupts.
    ///
    /// Call this from the instance's interrupt handler.
    pub fn on_interrupt(&mut self) {
        while let Some(event) = self.hal.poll() {
            match event {
                HalEvent::ErrorStatus(flags) => self.on_error_status(flags),
                HalEvent::RxFifoIdle => self.signal_object(0, ObjectEvent::RECEIVE),
                HalEvent::RxFifoOverflow => self.signal_object(0, ObjectEvent::RECEIVE_OVERRUN),
                HalEvent::RxIdle(mailbox) => {
                    self.signal_object(self.object(mailbox), ObjectEvent::RECEIVE)
                }
                HalEvent::RxOverflow(mailbox) => {
                    self.signal_object(self.object(mailbox), ObjectEvent::RECEIVE_OVERRUN)
                }
                HalEvent::TxIdle(mailbox) => {
                    self.signal_object(self.object(mailbox), ObjectEvent::SEND_COMPLETE)
                }
            }
        }
    }
}

impl<H: Hal, I: Interrupts> Can for Flexcan<H, I> {
    fn version(&self) -> Version {
        Version {
            api: major_minor(1, 3),
            driver: major_minor(1, 9),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            num_objects: self.config.objects() as u32,
            reentrant_operation: true,
            fd_mode: false,
            restricted_mode: false,
            monitor_mode: true,
            internal_loopback: true,
            external_loopback: false,
        }
    }

    fn initialize(
        &mut self,
        unit_event: Option<fn(UnitEvent)>,
        object_event: Option<fn(u32, ObjectEvent)>,
    ) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.unit_event = unit_event;
        self.object_event = object_event;
        self.initialized = true;
        Ok(())
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }

    fn power_control(&mut self, state: PowerState) -> Result<()> {
        match state {
            PowerState::Off => {
                self.powered = false;
                self.irq.disable(self.vector);
                self.hal.deinit();
                self.tx = 0;
                self.rx = 0;
                self.status = Status::default();
                debug!("CAN power off");
            }
            PowerState::Full => {
                if !self.initialized {
                    return Err(Error::Unspecified);
                }
                if self.powered {
                    return Ok(());
                }
                self.status = Status::default();

                let clock_hz = self.clock();
                let config = ModuleConfig {
                    bitrate: self.config.default_bitrate,
                    max_mailboxes: MAILBOXES as u8,
                    individual_masks: true,
                    timing: timing::default(clock_hz, self.config.default_bitrate),
                };
                self.hal.init(&config, clock_hz);

                if self.config.rx_fifo {
                    self.filters.clear();
                    self.hal.set_rx_fifo_config(self.filters.entries(), true);
                    self.hal.set_rx_fifo_global_mask(u32::MAX);
                }
                self.hal.set_rx_mb_global_mask(u32::MAX);
                self.hal.create_handle();
                self.irq.enable(self.vector);
                self.powered = true;
                debug!("CAN power on, clock {} Hz", clock_hz);
            }
            PowerState::Low => return Err(Error::Unsupported),
        }
        Ok(())
    }

    fn clock(&self) -> u32 {
        timing::clock(&self.ccm, self.config.usb1_pll_hz)
    }

    fn set_bitrate(
        &mut self,
        select: BitrateSelect,
        bitrate: u32,
        segments: BitSegments,
    ) -> Result<()> {
        if select != BitrateSelect::Nominal {
            return Err(Error::InvalidBitrateSelect);
        }
        let timing = timing::compute(self.clock(), bitrate, &segments, self.config.clock_tolerance)?;
        self.hal.set_timing(&timing);
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let (state, event) = match mode {
            Mode::Initialization => (UnitState::Inactive, UnitEvent::BusOff),
            Mode::Normal => (UnitState::Active, UnitEvent::Active),
            Mode::Monitor | Mode::LoopbackInternal => (UnitState::Passive, UnitEvent::Passive),
            Mode::Restricted | Mode::LoopbackExternal => {
                debug!("CAN mode {:?} not supported", mode);
                return Err(Error::Parameter);
            }
        };

        self.hal.enter_freeze_mode();

        let monitor = (mode == Mode::Monitor) as u32;
        let loopback = (mode == Mode::LoopbackInternal) as u32;
        ral::modify_reg!(ral::flexcan, self.can, CTRL1, LOM: monitor, LPB: loopback);
        // Loopback needs self reception.
        ral::modify_reg!(ral::flexcan, self.can, MCR, SRXDIS: loopback ^ 1);
        self.status.unit_state = state;

        if mode != Mode::Initialization {
            self.hal.exit_freeze_mode();
        }
        self.signal_unit(event);
        Ok(())
    }

    fn object_capabilities(&self, obj: u32) -> ObjectCapabilities {
        if self.check_object(obj).is_err() {
            ObjectCapabilities::default()
        } else if self.is_fifo(obj) {
            FIFO_CAPABILITIES
        } else {
            MAILBOX_CAPABILITIES
        }
    }

    fn object_set_filter(
        &mut self,
        obj: u32,
        operation: FilterOperation,
        id: Id,
        arg: u32,
    ) -> Result<()> {
        self.check_object(obj)?;
        self.check_powered()?;
        if matches!(
            operation,
            FilterOperation::RangeAdd | FilterOperation::RangeRemove
        ) {
            return Err(Error::Unsupported);
        }

        if self.is_fifo(obj) {
            self.fifo_filter(operation, id, arg)
        } else {
            self.mailbox_filter(obj, operation, id, arg)
        }
    }

    fn object_configure(&mut self, obj: u32, config: ObjectConfig) -> Result<()> {
        self.check_object(obj)?;
        self.check_powered()?;
        let bit = 1u64 << obj;

        match config {
            ObjectConfig::Inactive => {
                let receiver = self.receiver(obj)?;
                if self.tx & bit != 0 {
                    self.hal.set_tx_mb_config(self.mailbox(obj)?, false);
                }
                if self.rx & bit != 0 {
                    self.hal.abort_receive(receiver);
                }
                self.tx &= !bit;
                self.rx &= !bit;
            }
            ObjectConfig::Tx => {
                if self.is_fifo(obj) {
                    return Err(Error::Parameter);
                }
                let mailbox = self.mailbox(obj)?;
                if self.tx & bit == 0 {
                    self.rx &= !bit;
                    self.tx |= bit;
                    self.hal.set_tx_mb_config(mailbox, true);
                }
            }
            ObjectConfig::Rx => {
                let receiver = self.receiver(obj)?;
                if self.rx & bit == 0 {
                    self.tx &= !bit;
                    self.rx |= bit;
                    if self.hal.start_receive(receiver).is_err() {
                        warn!("CAN object {} failed to start receiving", obj);
                        self.rx &= !bit;
                        return Err(Error::Unspecified);
                    }
                }
            }
            ObjectConfig::RxRtrTxData | ObjectConfig::TxRtrRxData => {
                return Err(Error::Unsupported)
            }
        }
        Ok(())
    }

    fn message_send(&mut self, obj: u32, info: &MessageInfo, data: &[u8]) -> Result<usize> {
        let mailbox = self.mailbox(obj)?;
        if self.is_fifo(obj) || data.len() > 8 {
            return Err(Error::Parameter);
        }
        self.check_powered()?;
        if self.tx & (1 << obj) == 0 {
            return Err(Error::Unspecified);
        }

        let frame = Frame::new(info, data);
        self.hal.send(mailbox, &frame)?;
        Ok(data.len())
    }

    fn message_read(&mut self, obj: u32, data: &mut [u8]) -> Result<(MessageInfo, usize)> {
        self.check_object(obj)?;
        self.check_powered()?;
        if self.rx & (1 << obj) == 0 {
            return Err(Error::Unspecified);
        }

        let receiver = self.receiver(obj)?;
        let frame = self.hal.received(receiver);
        let len = (frame.length as usize).min(8).min(data.len());
        data[..len].copy_from_slice(&frame.data[..len]);

        // Receive the next message into the same object.
        if self.hal.start_receive(receiver).is_err() {
            warn!("CAN object {} failed to restart receiving", obj);
        }
        Ok((frame.info(), len))
    }

    fn control(&mut self, control: Control) -> Result<()> {
        match control {
            Control::AbortSend(obj) => {
                let mailbox = self.mailbox(obj)?;
                if self.tx & (1 << obj) == 0 {
                    return Err(Error::Unspecified);
                }
                self.check_powered()?;
                self.hal.abort_send(mailbox);
                Ok(())
            }
            Control::Retransmission(_) | Control::FdMode(_) | Control::TransceiverDelay(_) => {
                Err(Error::Unsupported)
            }
        }
    }

    fn status(&self) -> Status {
        self.status
    }
}
