//! SD / MMC host controller driver
//!
//! [`Usdhc`] implements [`Mci`] for one USDHC instance. Data transfers take
//! two steps: [`setup_transfer()`](Mci::setup_transfer) records the blocks
//! to move, and the next [`send_command()`](Mci::send_command) that carries
//! [`CommandFlags::TRANSFER_DATA`] issues command and data as one vendor
//! transaction. Completion arrives as [`Event`]s from
//! [`on_interrupt()`](Usdhc::on_interrupt).
//!
//! ```no_run
//! use imxrt_cmsis_drivers::{mci, ral, Irq, Nvic, PowerState};
//! use mci::{CommandFlags, Control, Mci, ResponseType};
//!
//! fn start<H: mci::Hal>(hal: H) -> mci::Usdhc<H> {
//!     let usdhc1 = unsafe { ral::Instance::new(ral::usdhc::USDHC1) };
//!     let config = mci::Config {
//!         card_detect: Some(mci::Pin { active_high: false }),
//!         ..mci::Config::new(600_000_000)
//!     };
//!
//!     let mut sd = mci::Usdhc::new(hal, unsafe { Nvic::new() }, Irq::USDHC1, usdhc1, config);
//!     sd.initialize(None).unwrap();
//!     sd.power_control(PowerState::Full).unwrap();
//!     sd.control(Control::BusSpeed(400_000)).unwrap();
//!     // GO_IDLE_STATE
//!     sd.send_command(0, 0, ResponseType::None, CommandFlags::CARD_INITIALIZE).unwrap();
//!     sd
//! }
//! ```

use crate::{major_minor, ral, Error, Interrupts, Irq, Nvic, PowerState, Result, Version};

/// STOP_TRANSMISSION
const STOP_TRANSMISSION: u8 = 12;

/// Clock cycles the card gets to become active.
const CARD_ACTIVE_TIMEOUT: u32 = 1000;

/// A GPIO that reports card state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pin {
    /// The pin reads high when the condition holds.
    pub active_high: bool,
}

/// Board and clock configuration of one USDHC instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Clock that feeds the SD clock divider.
    pub core_clock_hz: u32,
    pub card_detect: Option<Pin>,
    pub write_protect: Option<Pin>,
    pub bus_width_4: bool,
    pub bus_width_8: bool,
}

impl Config {
    pub const fn new(core_clock_hz: u32) -> Self {
        Config {
            core_clock_hz,
            card_detect: None,
            write_protect: None,
            bus_width_4: true,
            bus_width_8: false,
        }
    }
}

/// Driver capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub cd_state: bool,
    pub cd_event: bool,
    pub wp_state: bool,
    pub vdd: bool,
    pub vdd_1v8: bool,
    pub vccq: bool,
    pub data_width_4: bool,
    pub data_width_8: bool,
    pub data_width_4_ddr: bool,
    pub data_width_8_ddr: bool,
    pub high_speed: bool,
    pub uhs_signaling: bool,
    pub sdio_interrupt: bool,
    pub read_wait: bool,
    pub suspend_resume: bool,
    pub mmc_interrupt: bool,
    pub mmc_boot: bool,
    pub rst_n: bool,
    pub ccs: bool,
    pub ccs_timeout: bool,
}

bitflags::bitflags! {
    /// Events signaled to the application callback.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Event : u32 {
        const CARD_INSERTED = 1 << 0;
        const CARD_REMOVED = 1 << 1;
        const COMMAND_COMPLETE = 1 << 2;
        const COMMAND_TIMEOUT = 1 << 3;
        const COMMAND_ERROR = 1 << 4;
        const TRANSFER_COMPLETE = 1 << 5;
        const TRANSFER_TIMEOUT = 1 << 6;
        const TRANSFER_ERROR = 1 << 7;
        const SDIO_INTERRUPT = 1 << 8;
        const CCS = 1 << 9;
        const CCS_TIMEOUT = 1 << 10;
    }

    /// Flags for [`send_command()`](Mci::send_command).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CommandFlags : u32 {
        /// Check the response index.
        const RESPONSE_INDEX = 1 << 2;
        /// Check the response CRC.
        const RESPONSE_CRC = 1 << 3;
        const WAIT_BUSY = 1 << 4;
        /// Move the data set up by the last `setup_transfer()`.
        const TRANSFER_DATA = 1 << 5;
        /// Send the initialization clocks first.
        const CARD_INITIALIZE = 1 << 6;
    }

    /// Flags for [`setup_transfer()`](Mci::setup_transfer). Empty reads
    /// blocks from the card.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TransferMode : u32 {
        const WRITE = 1 << 0;
        const STREAM = 1 << 1;
    }

    /// USDHC interrupt status and signal bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Interrupt : u32 {
        const CARD_INTERRUPT = 1 << 8;
        const COMMAND_TIMEOUT = 1 << 16;
        const DATA_TIMEOUT = 1 << 20;
        const ALL = 0x117F_F1FF;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Flags : u8 {
        const INIT = 1 << 0;
        const POWER = 1 << 1;
        /// Bus clock configured.
        const SETUP = 1 << 2;
        /// Command in flight.
        const CMD = 1 << 3;
        /// Data transfer set up or in flight.
        const DATA = 1 << 4;
    }
}

/// Expected command response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    None,
    Short,
    ShortBusy,
    Long,
}

/// Response received for the last command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    Short(u32),
    Long([u32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeedMode {
    Default,
    High,
    UhsSdr12,
    UhsSdr25,
    UhsSdr50,
    UhsSdr104,
    UhsDdr50,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmdMode {
    OpenDrain,
    PushPull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusWidth {
    One,
    Four,
    Eight,
    FourDdr,
    EightDdr,
}

/// Requests for [`control()`](Mci::control).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Set the bus clock, in Hz. Returns the clock reached.
    BusSpeed(u32),
    BusSpeedMode(SpeedMode),
    BusCmdMode(CmdMode),
    BusDataWidth(BusWidth),
    /// Keep the SD clock running while idle.
    ClockIdle(bool),
    /// Data timeout, in bus clock cycles.
    DataTimeout(u32),
    /// Signal the next SDIO interrupt.
    MonitorSdioInterrupt,
    ControlReset,
    ControlCcs(bool),
    DriverStrength(u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub command_active: bool,
    pub command_timeout: bool,
    pub command_error: bool,
    pub transfer_active: bool,
    pub transfer_timeout: bool,
    pub transfer_error: bool,
    pub sdio_interrupt: bool,
    pub ccs: bool,
}

/// Card signals read through the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    CardDetect,
    WriteProtect,
}

/// Vendor layer command kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Normal,
    Abort,
}

/// Vendor layer response kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    None,
    R1,
    R1b,
    R2,
    R3,
}

/// A command, as handed to the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub index: u8,
    pub argument: u32,
    pub kind: CommandKind,
    pub response: ResponseKind,
    pub data_present: bool,
}

/// Memory taking part in a data transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Buffer {
    /// Card to memory.
    Rx(*mut u32),
    /// Memory to card.
    Tx(*const u32),
}

/// A data transfer, as handed to the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Data {
    pub block_size: u32,
    pub block_count: u32,
    pub buffer: Buffer,
}

/// Controller settings applied at power up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsdhcConfig {
    /// SYS_CTRL[DTOCV]
    pub data_timeout: u8,
    pub read_watermark: u8,
    pub write_watermark: u8,
    pub read_burst: u8,
    pub write_burst: u8,
}

const POWER_UP: UsdhcConfig = UsdhcConfig {
    data_timeout: 0xF,
    read_watermark: 128,
    write_watermark: 128,
    read_burst: 16,
    write_burst: 16,
};

/// Vendor layer transfer outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    CommandSuccess,
    DataComplete,
    CommandFailed,
    DataFailed,
}

/// Completion events raised by the vendor layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalEvent {
    Transfer(TransferStatus),
    SdioInterrupt,
}

/// USDHC vendor layer.
pub trait Hal {
    fn init(&mut self, config: &UsdhcConfig);
    fn deinit(&mut self);
    fn reset_all(&mut self);
    /// Create the transfer handle that reports [`HalEvent`]s.
    fn create_handle(&mut self);
    /// Send the card initialization clocks.
    fn set_card_active(&mut self, timeout: u32);
    /// Start a transaction without waiting for it.
    fn transfer(
        &mut self,
        command: &Command,
        data: Option<&Data>,
    ) -> core::result::Result<(), crate::HalError>;
    /// Response words of the last command.
    fn response(&self) -> [u32; 4];
    /// Returns the bus clock reached.
    fn set_sd_clock(&mut self, source_hz: u32, bus_hz: u32) -> u32;
    fn set_data_bus_width(&mut self, width: BusWidth);
    fn enable_interrupt_signal(&mut self, mask: Interrupt);
    fn disable_interrupt_signal(&mut self, mask: Interrupt);
    fn clear_interrupt_status(&mut self, mask: Interrupt);
    fn interrupt_status(&self) -> Interrupt;
    /// Level of a card signal; `true` is high.
    fn read_signal(&self, signal: Signal) -> bool;

    /// Returns the next completion event, if any.
    fn poll(&mut self) -> Option<HalEvent>;
}

/// Memory card interface operations.
pub trait Mci {
    fn version(&self) -> Version;
    fn capabilities(&self) -> Capabilities;
    /// Register the event callback. Does nothing when already initialized.
    fn initialize(&mut self, callback: Option<fn(Event)>) -> Result<()>;
    fn uninitialize(&mut self) -> Result<()>;
    fn power_control(&mut self, state: PowerState) -> Result<()>;
    fn card_power(&mut self, voltage: u32) -> Result<()>;
    /// `true` when a card is detected.
    fn read_cd(&self) -> bool;
    /// `true` when the card is write protected.
    fn read_wp(&self) -> bool;
    fn send_command(
        &mut self,
        cmd: u8,
        arg: u32,
        response: ResponseType,
        flags: CommandFlags,
    ) -> Result<()>;
    /// Prepare the data blocks for the next data command.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads and writes of `block_count * block_size`
    /// bytes, and stay valid until the transfer completes or is aborted.
    unsafe fn setup_transfer(
        &mut self,
        data: *mut u8,
        block_count: u32,
        block_size: u32,
        mode: TransferMode,
    ) -> Result<()>;
    fn abort_transfer(&mut self) -> Result<()>;
    fn control(&mut self, control: Control) -> Result<u32>;
    fn status(&self) -> Status;
}

/// The USDHC driver.
pub struct Usdhc<H, I = Nvic> {
    hal: H,
    irq: I,
    vector: Irq,
    usdhc: ral::Instance<ral::usdhc::RegisterBlock>,
    config: Config,
    callback: Option<fn(Event)>,
    flags: Flags,
    status: Status,
    /// Set up by `setup_transfer()`, consumed by the next data command.
    data: Option<Data>,
    /// Data attached to the transaction in flight.
    attached: bool,
    response_type: ResponseType,
    response: Option<Response>,
}

// Safety: the data pointers belong to the transfer that the caller set up,
// and the caller keeps them valid until it completes.
unsafe impl<H: Send, I: Send> Send for Usdhc<H, I> {}

impl<H: Hal, I: Interrupts> Usdhc<H, I> {
    pub fn new(
        hal: H,
        irq: I,
        vector: Irq,
        usdhc: ral::Instance<ral::usdhc::RegisterBlock>,
        config: Config,
    ) -> Self {
        Usdhc {
            hal,
            irq,
            vector,
            usdhc,
            config,
            callback: None,
            flags: Flags::empty(),
            status: Status::default(),
            data: None,
            attached: false,
            response_type: ResponseType::None,
            response: None,
        }
    }

    /// Response of the last completed command, if it expected one.
    pub fn response(&self) -> Option<Response> {
        self.response
    }

    fn signal(&self, event: Event) {
        if let (Some(callback), false) = (self.callback, event.is_empty()) {
            callback(event);
        }
    }

    fn read_pin(&self, pin: Option<Pin>, signal: Signal) -> bool {
        match pin {
            Some(pin) if self.flags.contains(Flags::POWER) => {
                self.hal.read_signal(signal) == pin.active_high
            }
            _ => false,
        }
    }

    fn complete(&mut self) -> Event {
        let words = self.hal.response();
        self.response = match self.response_type {
            ResponseType::None => None,
            ResponseType::Long => Some(Response::Long(words)),
            _ => Some(Response::Short(words[0])),
        };

        let mut event = Event::empty();
        if self.flags.contains(Flags::CMD) {
            self.flags.remove(Flags::CMD);
            self.status.command_active = false;
            event |= Event::COMMAND_COMPLETE;
        }
        if self.attached {
            self.finish_data();
            event |= Event::TRANSFER_COMPLETE;
        }
        event
    }

    fn finish_data(&mut self) {
        self.flags.remove(Flags::DATA);
        self.status.transfer_active = false;
        self.attached = false;
        self.data = None;
    }

    fn command_failed(&mut self) -> Event {
        let mut event = Event::COMMAND_ERROR;
        self.status.command_error = true;
        if self
            .hal
            .interrupt_status()
            .contains(Interrupt::COMMAND_TIMEOUT)
        {
            self.status.command_timeout = true;
            event |= Event::COMMAND_TIMEOUT;
        }
        self.flags.remove(Flags::CMD);
        self.status.command_active = false;
        // The data phase never starts.
        if self.attached {
            self.finish_data();
        }
        event
    }

    fn data_failed(&mut self) -> Event {
        let mut event = Event::TRANSFER_ERROR;
        self.status.transfer_error = true;
        if self
            .hal
            .interrupt_status()
            .contains(Interrupt::DATA_TIMEOUT)
        {
            self.status.transfer_timeout = true;
            event |= Event::TRANSFER_TIMEOUT;
        }
        self.flags.remove(Flags::CMD);
        self.status.command_active = false;
        self.finish_data();
        event
    }

    /// Handle USDHC interrupts.
    ///
    /// Call this from the instance's interrupt handler.
    pub fn on_interrupt(&mut self) {
        while let Some(event) = self.hal.poll() {
            trace!("MCI event {:?}", event);
            let event = match event {
                HalEvent::Transfer(TransferStatus::CommandSuccess) if self.attached => continue,
                HalEvent::Transfer(TransferStatus::CommandSuccess | TransferStatus::DataComplete) => {
                    self.complete()
                }
                HalEvent::Transfer(TransferStatus::CommandFailed) => self.command_failed(),
                HalEvent::Transfer(TransferStatus::DataFailed) => self.data_failed(),
                HalEvent::SdioInterrupt => {
                    self.hal.disable_interrupt_signal(Interrupt::CARD_INTERRUPT);
                    self.hal.clear_interrupt_status(Interrupt::CARD_INTERRUPT);
                    self.status.sdio_interrupt = true;
                    Event::SDIO_INTERRUPT
                }
            };
            self.signal(event);
        }
    }
}

impl<H: Hal, I: Interrupts> Mci for Usdhc<H, I> {
    fn version(&self) -> Version {
        Version {
            api: major_minor(2, 4),
            driver: major_minor(1, 5),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            cd_state: self.config.card_detect.is_some(),
            wp_state: self.config.write_protect.is_some(),
            data_width_4: self.config.bus_width_4,
            data_width_8: self.config.bus_width_8,
            high_speed: true,
            sdio_interrupt: true,
            ..Capabilities::default()
        }
    }

    fn initialize(&mut self, callback: Option<fn(Event)>) -> Result<()> {
        if self.flags.contains(Flags::INIT) {
            return Ok(());
        }
        self.callback = callback;
        self.status = Status::default();
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
                self.irq.disable(self.vector);
                self.flags &= Flags::INIT;
                self.status = Status::default();
                self.data = None;
                self.attached = false;
                self.hal.disable_interrupt_signal(Interrupt::ALL);
                self.hal.reset_all();
                self.hal.deinit();
                debug!("MCI power off");
            }
            PowerState::Full => {
                if !self.flags.contains(Flags::POWER) {
                    self.response = None;
                    self.hal.init(&POWER_UP);
                    self.hal.create_handle();
                    self.irq.enable(self.vector);
                    self.flags |= Flags::POWER;
                    debug!("MCI power on");
                }
            }
            PowerState::Low => return Err(Error::Unsupported),
        }
        Ok(())
    }

    fn card_power(&mut self, _: u32) -> Result<()> {
        if self.flags.contains(Flags::POWER) {
            Err(Error::Unsupported)
        } else {
            Err(Error::Unspecified)
        }
    }

    fn read_cd(&self) -> bool {
        self.read_pin(self.config.card_detect, Signal::CardDetect)
    }

    fn read_wp(&self) -> bool {
        self.read_pin(self.config.write_protect, Signal::WriteProtect)
    }

    fn send_command(
        &mut self,
        cmd: u8,
        arg: u32,
        response: ResponseType,
        flags: CommandFlags,
    ) -> Result<()> {
        if !self.flags.contains(Flags::SETUP) {
            debug!("MCI bus not set up");
            return Err(Error::Unspecified);
        }
        if self.status.command_active {
            return Err(Error::Busy);
        }
        let with_data = flags.contains(CommandFlags::TRANSFER_DATA);
        if with_data && (!self.flags.contains(Flags::DATA) || self.data.is_none()) {
            debug!("MCI data command without a transfer");
            return Err(Error::Unspecified);
        }

        if flags.contains(CommandFlags::CARD_INITIALIZE) {
            self.hal.set_card_active(CARD_ACTIVE_TIMEOUT);
        }

        let command = Command {
            index: cmd,
            argument: arg,
            kind: if cmd == STOP_TRANSMISSION {
                CommandKind::Abort
            } else {
                CommandKind::Normal
            },
            response: match response {
                ResponseType::None => ResponseKind::None,
                ResponseType::Short if flags.contains(CommandFlags::RESPONSE_CRC) => {
                    ResponseKind::R1
                }
                ResponseType::Short => ResponseKind::R3,
                ResponseType::ShortBusy => ResponseKind::R1b,
                ResponseType::Long => ResponseKind::R2,
            },
            data_present: with_data,
        };

        self.flags |= Flags::CMD;
        self.response_type = response;
        self.response = None;
        self.status.command_active = true;
        self.status.command_timeout = false;
        self.status.command_error = false;
        self.status.transfer_timeout = false;
        self.status.transfer_error = false;
        self.status.ccs = false;
        self.attached = with_data;
        if with_data {
            self.status.transfer_active = true;
        }

        let data = if with_data { self.data.as_ref() } else { None };
        if self.hal.transfer(&command, data).is_err() {
            warn!("MCI transfer of CMD{} failed", cmd);
            self.flags.remove(Flags::CMD);
            self.status.command_active = false;
            if with_data {
                self.finish_data();
            }
            return Err(Error::Unspecified);
        }
        Ok(())
    }

    unsafe fn setup_transfer(
        &mut self,
        data: *mut u8,
        block_count: u32,
        block_size: u32,
        mode: TransferMode,
    ) -> Result<()> {
        if data.is_null() || block_count == 0 || block_size == 0 {
            return Err(Error::Parameter);
        }
        if !self.flags.contains(Flags::SETUP) {
            return Err(Error::Unspecified);
        }
        if self.status.transfer_active {
            return Err(Error::Busy);
        }
        if mode.contains(TransferMode::STREAM) {
            return Err(Error::Unspecified);
        }

        let buffer = if mode.contains(TransferMode::WRITE) {
            Buffer::Tx(data as *const u32)
        } else {
            Buffer::Rx(data as *mut u32)
        };
        self.data = Some(Data {
            block_size,
            block_count,
            buffer,
        });
        self.flags |= Flags::DATA;
        Ok(())
    }

    fn abort_transfer(&mut self) -> Result<()> {
        if !self.flags.contains(Flags::SETUP) {
            return Err(Error::Unspecified);
        }
        self.usdhc.INT_SIGNAL_EN.write(0);
        ral::modify_reg!(ral::usdhc, self.usdhc, SYS_CTRL, RSTD: 1);

        self.status.command_active = false;
        self.status.transfer_active = false;
        self.status.sdio_interrupt = false;
        self.status.ccs = false;
        self.flags.remove(Flags::CMD | Flags::DATA);
        self.data = None;
        self.attached = false;

        self.hal.create_handle();
        debug!("MCI transfer aborted");
        Ok(())
    }

    fn control(&mut self, control: Control) -> Result<u32> {
        if !self.flags.contains(Flags::POWER) {
            return Err(Error::Unspecified);
        }

        match control {
            Control::BusSpeed(hz) => {
                self.flags |= Flags::SETUP;
                return Ok(self.hal.set_sd_clock(self.config.core_clock_hz, hz));
            }
            Control::BusSpeedMode(SpeedMode::Default | SpeedMode::High) => {}
            Control::BusSpeedMode(_) => return Err(Error::Unsupported),
            Control::BusCmdMode(CmdMode::PushPull) => {}
            Control::BusCmdMode(CmdMode::OpenDrain) => return Err(Error::Unspecified),
            Control::BusDataWidth(width @ (BusWidth::One | BusWidth::Four | BusWidth::Eight)) => {
                self.hal.set_data_bus_width(width)
            }
            Control::BusDataWidth(_) => return Err(Error::Unsupported),
            Control::ClockIdle(true) => {
                ral::modify_reg!(ral::usdhc, self.usdhc, VEND_SPEC, FRC_SDCLK_ON: 1);
                ral::modify_reg!(ral::usdhc, self.usdhc, SYS_CTRL, CLOCK_GATES: 0xF);
            }
            Control::ClockIdle(false) => {
                ral::modify_reg!(ral::usdhc, self.usdhc, VEND_SPEC, FRC_SDCLK_ON: 0);
            }
            Control::DataTimeout(cycles) => {
                let dtocv = (cycles >> 13).min(0xE);
                ral::modify_reg!(ral::usdhc, self.usdhc, SYS_CTRL, DTOCV: dtocv);
            }
            Control::MonitorSdioInterrupt => {
                self.status.sdio_interrupt = false;
                self.hal.clear_interrupt_status(Interrupt::CARD_INTERRUPT);
                self.hal.enable_interrupt_signal(Interrupt::CARD_INTERRUPT);
            }
            Control::ControlReset | Control::ControlCcs(_) | Control::DriverStrength(_) => {
                return Err(Error::Unsupported)
            }
        }
        Ok(0)
    }

    fn status(&self) -> Status {
        self.status
    }
}
