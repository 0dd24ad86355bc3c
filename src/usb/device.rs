//! USB device driver
//!
//! [`UsbDevice`] implements [`Usbd`] on one OTG controller. The vendor
//! device stack (EHCI device controller driver) does the queue head and
//! transfer descriptor work. This driver tracks power and device state,
//! buffers SETUP packets, and counts the bytes each endpoint moved.
//!
//! ```no_run
//! use imxrt_cmsis_drivers::{usb, Nvic, PowerState};
//! use usb::{device::{self, Usbd}, Controller, UsbRoles};
//!
//! static ROLES: UsbRoles = UsbRoles::new();
//!
//! fn start<H: device::Hal, C: usb::Clocks>(hal: H, clocks: C) -> device::UsbDevice<H, C> {
//!     let mut usbd = device::UsbDevice::new(
//!         hal,
//!         clocks,
//!         unsafe { Nvic::new() },
//!         Controller::Usb1,
//!         &ROLES,
//!         device::PhyConfig::BOARD,
//!     );
//!     usbd.initialize(None, None).unwrap();
//!     usbd.power_control(PowerState::Full).unwrap();
//!     usbd.device_connect().unwrap();
//!     usbd
//! }
//! ```

use usb_device::{
    endpoint::{EndpointAddress, EndpointType},
    UsbDirection,
};

use super::{Clocks, Controller, Role, UsbRoles};
use crate::{
    major_minor, ral, Error, HalError, Interrupts, Nvic, PowerState, Result, Version,
};

/// Endpoint numbers per direction.
pub const MAX_ENDPOINTS: usize = 8;

/// Driver capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub vbus_detection: bool,
    pub event_vbus_on: bool,
    pub event_vbus_off: bool,
}

/// USB PHY trimming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhyConfig {
    xtal_hz: u32,
    d_cal: u8,
    txcal45dp: u8,
    txcal45dm: u8,
}

impl PhyConfig {
    /// Trimming of the i.MX RT1050 EVK.
    pub const BOARD: PhyConfig = PhyConfig::new(24_000_000, 0x0C, 0x06, 0x06);

    /// # Panics
    ///
    /// Panics if a calibration value doesn't fit in four bits.
    pub const fn new(xtal_hz: u32, d_cal: u8, txcal45dp: u8, txcal45dm: u8) -> Self {
        assert!(d_cal <= 0xF && txcal45dp <= 0xF && txcal45dm <= 0xF);
        PhyConfig {
            xtal_hz,
            d_cal,
            txcal45dp,
            txcal45dm,
        }
    }

    /// Frequency of the crystal that feeds the PHY PLL.
    pub const fn xtal_hz(&self) -> u32 {
        self.xtal_hz
    }
    /// Decode-to-trim current calibration.
    pub const fn d_cal(&self) -> u8 {
        self.d_cal
    }
    /// DP output resistance calibration.
    pub const fn txcal45dp(&self) -> u8 {
        self.txcal45dp
    }
    /// DM output resistance calibration.
    pub const fn txcal45dm(&self) -> u8 {
        self.txcal45dm
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Speed {
    Low,
    #[default]
    Full,
    High,
}

/// Device state, as reported by [`device_get_state()`](Usbd::device_get_state).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceState {
    /// VBUS is present.
    pub vbus: bool,
    pub speed: Speed,
    /// The device is attached and not suspended.
    pub active: bool,
}

/// Events delivered to the device callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    VbusOn,
    VbusOff,
    Reset,
    HighSpeed,
    Suspend,
    Resume,
}

/// Events delivered to the endpoint callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointEvent {
    /// SETUP packet received on the control endpoint.
    Setup,
    /// OUT transfer completed.
    Out,
    /// IN transfer completed.
    In,
}

/// Endpoint description handed to the vendor stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    pub address: EndpointAddress,
    pub kind: EndpointType,
    pub max_packet_size: u16,
    /// Terminate transfers that end on a packet boundary with a zero
    /// length packet.
    pub zlt: bool,
}

/// Events reported by the vendor device stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalEvent {
    BusReset,
    Suspend,
    Resume,
    LpmResume,
    Detach,
    Attach,
    /// SETUP packet received on endpoint 0.
    Setup([u8; 8]),
    /// A transfer finished on the endpoint.
    Transferred {
        address: EndpointAddress,
        length: u32,
    },
}

/// The vendor device stack.
pub trait Hal {
    fn phy_init(&mut self, config: &PhyConfig) -> core::result::Result<(), HalError>;
    fn phy_deinit(&mut self);
    fn init(&mut self) -> core::result::Result<(), HalError>;
    fn deinit(&mut self) -> core::result::Result<(), HalError>;
    /// Start responding on the bus.
    fn run(&mut self) -> core::result::Result<(), HalError>;
    fn stop(&mut self) -> core::result::Result<(), HalError>;
    fn set_remote_wakeup(&mut self) -> core::result::Result<(), HalError>;
    /// Move the stack into the addressed state.
    fn set_addressed_state(&mut self) -> core::result::Result<(), HalError>;
    fn init_endpoint(&mut self, config: &EndpointConfig) -> core::result::Result<(), HalError>;
    fn deinit_endpoint(&mut self, address: EndpointAddress) -> core::result::Result<(), HalError>;
    fn stall(&mut self, address: EndpointAddress) -> core::result::Result<(), HalError>;
    fn unstall(&mut self, address: EndpointAddress) -> core::result::Result<(), HalError>;
    /// Cancel the endpoint's pending transfers.
    fn cancel(&mut self, address: EndpointAddress) -> core::result::Result<(), HalError>;
    /// Queue an IN transfer of `len` bytes from `data`.
    fn send(
        &mut self,
        address: EndpointAddress,
        data: *const u8,
        len: u32,
    ) -> core::result::Result<(), HalError>;
    /// Queue an OUT transfer of up to `len` bytes into `data`.
    fn recv(
        &mut self,
        address: EndpointAddress,
        data: *mut u8,
        len: u32,
    ) -> core::result::Result<(), HalError>;
    /// Speed negotiated during the last bus reset.
    fn speed(&self) -> Speed;
    fn frame_number(&self) -> u16;
    /// Returns the next pending event.
    fn poll(&mut self) -> Option<HalEvent>;
}

/// CMSIS USB device operations.
pub trait Usbd {
    fn version(&self) -> Version;
    fn capabilities(&self) -> Capabilities;
    /// Register the callbacks and claim the device role.
    fn initialize(
        &mut self,
        device_event: Option<fn(DeviceEvent)>,
        endpoint_event: Option<fn(EndpointAddress, EndpointEvent)>,
    ) -> Result<()>;
    fn uninitialize(&mut self) -> Result<()>;
    fn power_control(&mut self, state: PowerState) -> Result<()>;
    fn device_connect(&mut self) -> Result<()>;
    fn device_disconnect(&mut self) -> Result<()>;
    fn device_get_state(&self) -> DeviceState;
    fn device_remote_wakeup(&mut self) -> Result<()>;
    fn device_set_address(&mut self, address: u8) -> Result<()>;
    /// Returns the last SETUP packet.
    ///
    /// Fails if no SETUP packet arrived since the last read.
    fn read_setup_packet(&mut self) -> Result<[u8; 8]>;
    fn endpoint_configure(
        &mut self,
        address: EndpointAddress,
        kind: EndpointType,
        max_packet_size: u16,
    ) -> Result<()>;
    fn endpoint_unconfigure(&mut self, address: EndpointAddress) -> Result<()>;
    fn endpoint_stall(&mut self, address: EndpointAddress, stall: bool) -> Result<()>;
    /// Start a transfer on the endpoint.
    ///
    /// IN endpoints send `len` bytes from `data`. OUT endpoints receive up
    /// to `len` bytes into `data`.
    ///
    /// # Safety
    ///
    /// `data` must be valid for `len` bytes, and stay valid until the
    /// transfer completes or is aborted.
    unsafe fn endpoint_transfer(
        &mut self,
        address: EndpointAddress,
        data: *mut u8,
        len: u32,
    ) -> Result<()>;
    /// Bytes moved by the endpoint's last transfer.
    fn endpoint_transfer_get_result(&self, address: EndpointAddress) -> u32;
    fn endpoint_transfer_abort(&mut self, address: EndpointAddress) -> Result<()>;
    fn get_frame_number(&self) -> u16;
}

/// Run-time state, wiped by power transitions.
#[derive(Default)]
struct RunTime {
    state: DeviceState,
    setup_received: bool,
    setup_packet: [u8; 8],
    /// Per endpoint number, OUT then IN.
    transferred: [[u32; 2]; MAX_ENDPOINTS],
}

/// The USB device driver.
pub struct UsbDevice<H, C, I = Nvic> {
    hal: H,
    clocks: C,
    irq: I,
    controller: Controller,
    usb: ral::Instance<ral::usb::RegisterBlock>,
    roles: &'static UsbRoles,
    phy: PhyConfig,
    device_event: Option<fn(DeviceEvent)>,
    endpoint_event: Option<fn(EndpointAddress, EndpointEvent)>,
    initialized: bool,
    powered: bool,
    run: RunTime,
}

fn direction(address: EndpointAddress) -> usize {
    match address.direction() {
        UsbDirection::Out => 0,
        UsbDirection::In => 1,
    }
}

impl<H: Hal, C: Clocks, I: Interrupts> UsbDevice<H, C, I> {
    /// Create a device driver for `controller`.
    pub fn new(
        hal: H,
        clocks: C,
        irq: I,
        controller: Controller,
        roles: &'static UsbRoles,
        phy: PhyConfig,
    ) -> Self {
        // Safety: the driver owns the controller's core registers.
        let usb = unsafe { ral::Instance::new(controller.usb()) };
        Self::with_registers(hal, clocks, irq, controller, usb, roles, phy)
    }

    fn with_registers(
        hal: H,
        clocks: C,
        irq: I,
        controller: Controller,
        usb: ral::Instance<ral::usb::RegisterBlock>,
        roles: &'static UsbRoles,
        phy: PhyConfig,
    ) -> Self {
        UsbDevice {
            hal,
            clocks,
            irq,
            controller,
            usb,
            roles,
            phy,
            device_event: None,
            endpoint_event: None,
            initialized: false,
            powered: false,
            run: RunTime::default(),
        }
    }

    fn signal_device(&self, event: DeviceEvent) {
        if let Some(callback) = self.device_event {
            callback(event);
        }
    }

    fn signal_endpoint(&self, address: EndpointAddress, event: EndpointEvent) {
        if let Some(callback) = self.endpoint_event {
            callback(address, event);
        }
    }

    fn check_powered(&self) -> Result<()> {
        if self.powered {
            Ok(())
        } else {
            Err(Error::Unspecified)
        }
    }

    /// Byte counter of the endpoint.
    fn counter(&mut self, address: EndpointAddress) -> Result<&mut u32> {
        self.run
            .transferred
            .get_mut(address.index())
            .map(|counters| &mut counters[direction(address)])
            .ok_or(Error::Parameter)
    }

    fn power_on(&mut self) -> Result<()> {
        self.run = RunTime::default();
        self.clocks.enable_phy_pll(self.controller)?;
        self.clocks.enable_usb_clock(self.controller)?;
        self.hal.phy_init(&self.phy)?;
        self.hal.init()?;
        self.irq.enable(self.controller.irq());
        self.powered = true;
        debug!("USBD{} power on", self.controller.offset() + 1);
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        for index in 0..MAX_ENDPOINTS {
            for dir in [UsbDirection::Out, UsbDirection::In] {
                let _ = self.endpoint_transfer_abort(EndpointAddress::from_parts(index, dir));
            }
        }
        self.irq.disable(self.controller.irq());
        self.hal.phy_deinit();
        self.hal.deinit()?;
        self.clocks.disable_phy_pll(self.controller);
        self.irq.clear_pending(self.controller.irq());
        self.powered = false;
        self.run = RunTime::default();
        debug!("USBD{} power off", self.controller.offset() + 1);
        Ok(())
    }

    fn bus_reset(&mut self) {
        for index in 0..MAX_ENDPOINTS {
            for dir in [UsbDirection::Out, UsbDirection::In] {
                let address = EndpointAddress::from_parts(index, dir);
                let _ = self.hal.unstall(address);
                self.run.transferred[index][direction(address)] = 0;
                let _ = self.hal.cancel(address);
            }
        }

        self.run.state.active = true;
        self.run.state.vbus = true;
        let speed = self.hal.speed();
        self.signal_device(DeviceEvent::Reset);
        match speed {
            Speed::Full => self.run.state.speed = Speed::Full,
            Speed::High => {
                self.run.state.speed = Speed::High;
                self.signal_device(DeviceEvent::HighSpeed);
            }
            Speed::Low => {}
        }
    }

    /// Handle USB device interrupts.
    ///
    /// Call this from the controller's interrupt handler, or through
    /// [`UsbRoles::dispatch`].
    pub fn on_interrupt(&mut self) {
        while let Some(event) = self.hal.poll() {
            trace!("USBD event {:?}", event);
            match event {
                HalEvent::BusReset => self.bus_reset(),
                HalEvent::Suspend => {
                    self.run.state.active = false;
                    self.signal_device(DeviceEvent::Suspend);
                }
                HalEvent::Resume | HalEvent::LpmResume => {
                    self.run.state.active = true;
                    self.signal_device(DeviceEvent::Resume);
                }
                HalEvent::Detach => {
                    self.run.state.active = false;
                    self.run.state.vbus = false;
                    self.signal_device(DeviceEvent::VbusOff);
                }
                HalEvent::Attach => {
                    self.run.state.vbus = true;
                    self.signal_device(DeviceEvent::VbusOn);
                }
                HalEvent::Setup(packet) => {
                    self.run.setup_packet = packet;
                    self.run.setup_received = true;
                    self.signal_endpoint(
                        EndpointAddress::from_parts(0, UsbDirection::Out),
                        EndpointEvent::Setup,
                    );
                }
                HalEvent::Transferred { address, length } => {
                    let Ok(counter) = self.counter(address) else {
                        warn!("USBD transfer on unknown endpoint {:?}", address);
                        continue;
                    };
                    *counter = length;
                    let event = match address.direction() {
                        UsbDirection::In => EndpointEvent::In,
                        UsbDirection::Out => EndpointEvent::Out,
                    };
                    self.signal_endpoint(address, event);
                }
            }
        }
    }
}

impl<H: Hal, C: Clocks, I: Interrupts> Usbd for UsbDevice<H, C, I> {
    fn version(&self) -> Version {
        Version {
            api: major_minor(2, 3),
            driver: major_minor(2, 0),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            vbus_detection: true,
            event_vbus_on: true,
            event_vbus_off: true,
        }
    }

    fn initialize(
        &mut self,
        device_event: Option<fn(DeviceEvent)>,
        endpoint_event: Option<fn(EndpointAddress, EndpointEvent)>,
    ) -> Result<()> {
        self.run = RunTime::default();
        self.powered = false;
        self.device_event = device_event;
        self.endpoint_event = endpoint_event;
        self.roles.set(self.controller, Role::Device);
        self.initialized = true;
        Ok(())
    }

    fn uninitialize(&mut self) -> Result<()> {
        if self.powered {
            let _ = self.power_off();
        }
        self.roles.set(self.controller, Role::None);
        self.device_event = None;
        self.endpoint_event = None;
        self.initialized = false;
        self.powered = false;
        self.run = RunTime::default();
        Ok(())
    }

    fn power_control(&mut self, state: PowerState) -> Result<()> {
        if !self.initialized {
            return Err(Error::Unspecified);
        }
        match state {
            PowerState::Full => self.power_on(),
            PowerState::Off => self.power_off(),
            PowerState::Low => Err(Error::Unsupported),
        }
    }

    fn device_connect(&mut self) -> Result<()> {
        self.check_powered()?;
        self.hal.run()?;
        Ok(())
    }

    fn device_disconnect(&mut self) -> Result<()> {
        self.check_powered()?;
        self.hal.stop()?;
        Ok(())
    }

    fn device_get_state(&self) -> DeviceState {
        self.run.state
    }

    fn device_remote_wakeup(&mut self) -> Result<()> {
        self.check_powered()?;
        self.hal.set_remote_wakeup()?;
        Ok(())
    }

    fn device_set_address(&mut self, address: u8) -> Result<()> {
        self.check_powered()?;
        // The address takes effect right away; the status stage of
        // SET_ADDRESS has already completed.
        ral::write_reg!(ral::usb, self.usb, DEVICEADDR, USBADR: address as u32);
        self.hal.set_addressed_state()?;
        debug!("USBD ADDRESS {}", address);
        Ok(())
    }

    fn read_setup_packet(&mut self) -> Result<[u8; 8]> {
        self.check_powered()?;
        if !self.run.setup_received {
            return Err(Error::Unspecified);
        }
        self.run.setup_received = false;
        Ok(self.run.setup_packet)
    }

    fn endpoint_configure(
        &mut self,
        address: EndpointAddress,
        kind: EndpointType,
        max_packet_size: u16,
    ) -> Result<()> {
        self.check_powered()?;
        *self.counter(address)? = 0;
        self.hal.init_endpoint(&EndpointConfig {
            address,
            kind,
            max_packet_size,
            zlt: false,
        })?;
        Ok(())
    }

    fn endpoint_unconfigure(&mut self, address: EndpointAddress) -> Result<()> {
        self.check_powered()?;
        self.counter(address)?;
        self.hal.deinit_endpoint(address)?;
        *self.counter(address)? = 0;
        Ok(())
    }

    fn endpoint_stall(&mut self, address: EndpointAddress, stall: bool) -> Result<()> {
        self.check_powered()?;
        if stall {
            self.hal.stall(address)?;
        } else {
            self.hal.unstall(address)?;
            self.hal.cancel(address)?;
        }
        Ok(())
    }

    unsafe fn endpoint_transfer(
        &mut self,
        address: EndpointAddress,
        data: *mut u8,
        len: u32,
    ) -> Result<()> {
        self.check_powered()?;
        *self.counter(address)? = 0;
        let queued = match address.direction() {
            UsbDirection::In => self.hal.send(address, data, len),
            UsbDirection::Out => self.hal.recv(address, data, len),
        };
        queued.map_err(|err| {
            warn!("USBD transfer on {:?} refused", address);
            Error::from(err)
        })
    }

    fn endpoint_transfer_get_result(&self, address: EndpointAddress) -> u32 {
        if !self.powered {
            return 0;
        }
        self.run
            .transferred
            .get(address.index())
            .map_or(0, |counters| counters[direction(address)])
    }

    fn endpoint_transfer_abort(&mut self, address: EndpointAddress) -> Result<()> {
        self.check_powered()?;
        self.counter(address)?;
        self.hal.cancel(address)?;
        Ok(())
    }

    fn get_frame_number(&self) -> u16 {
        if self.powered {
            self.hal.frame_number()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{cell::RefCell, collections::VecDeque, vec::Vec};

    use usb_device::{
        endpoint::{EndpointAddress, EndpointType},
        UsbDirection,
    };

    use super::*;
    use crate::{
        testing::{self, MockInterrupts},
        usb::testing::{ClockOp, MockClocks},
        Irq,
    };

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Op {
        PhyInit,
        PhyDeinit,
        Init,
        Deinit,
        Run,
        Stop,
        Addressed,
        InitEndpoint(EndpointAddress),
        DeinitEndpoint(EndpointAddress),
        Stall(EndpointAddress),
        Unstall(EndpointAddress),
        Cancel(EndpointAddress),
        Send(EndpointAddress, u32),
        Recv(EndpointAddress, u32),
    }

    #[derive(Default)]
    struct MockHal {
        ops: Vec<Op>,
        events: VecDeque<HalEvent>,
        speed: Speed,
        refuse: bool,
    }

    impl MockHal {
        fn stalled(&self, address: EndpointAddress) -> bool {
            self.ops
                .iter()
                .rev()
                .find_map(|op| match *op {
                    Op::Stall(a) if a == address => Some(true),
                    Op::Unstall(a) if a == address => Some(false),
                    _ => None,
                })
                .unwrap_or(false)
        }
    }

    type HalResult = core::result::Result<(), HalError>;

    impl Hal for MockHal {
        fn phy_init(&mut self, config: &PhyConfig) -> HalResult {
            assert_eq!(config.xtal_hz(), 24_000_000);
            self.ops.push(Op::PhyInit);
            Ok(())
        }
        fn phy_deinit(&mut self) {
            self.ops.push(Op::PhyDeinit);
        }
        fn init(&mut self) -> HalResult {
            self.ops.push(Op::Init);
            Ok(())
        }
        fn deinit(&mut self) -> HalResult {
            self.ops.push(Op::Deinit);
            Ok(())
        }
        fn run(&mut self) -> HalResult {
            self.ops.push(Op::Run);
            Ok(())
        }
        fn stop(&mut self) -> HalResult {
            self.ops.push(Op::Stop);
            Ok(())
        }
        fn set_remote_wakeup(&mut self) -> HalResult {
            Ok(())
        }
        fn set_addressed_state(&mut self) -> HalResult {
            self.ops.push(Op::Addressed);
            Ok(())
        }
        fn init_endpoint(&mut self, config: &EndpointConfig) -> HalResult {
            assert!(!config.zlt);
            self.ops.push(Op::InitEndpoint(config.address));
            Ok(())
        }
        fn deinit_endpoint(&mut self, address: EndpointAddress) -> HalResult {
            self.ops.push(Op::DeinitEndpoint(address));
            Ok(())
        }
        fn stall(&mut self, address: EndpointAddress) -> HalResult {
            self.ops.push(Op::Stall(address));
            Ok(())
        }
        fn unstall(&mut self, address: EndpointAddress) -> HalResult {
            self.ops.push(Op::Unstall(address));
            Ok(())
        }
        fn cancel(&mut self, address: EndpointAddress) -> HalResult {
            self.ops.push(Op::Cancel(address));
            Ok(())
        }
        fn send(&mut self, address: EndpointAddress, _: *const u8, len: u32) -> HalResult {
            if self.refuse {
                return Err(HalError);
            }
            self.ops.push(Op::Send(address, len));
            Ok(())
        }
        fn recv(&mut self, address: EndpointAddress, _: *mut u8, len: u32) -> HalResult {
            self.ops.push(Op::Recv(address, len));
            Ok(())
        }
        fn speed(&self) -> Speed {
            self.speed
        }
        fn frame_number(&self) -> u16 {
            0x123
        }
        fn poll(&mut self) -> Option<HalEvent> {
            self.events.pop_front()
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Recorded {
        Device(DeviceEvent),
        Endpoint(EndpointAddress, EndpointEvent),
    }

    std::thread_local! {
        static EVENTS: RefCell<Vec<Recorded>> = const { RefCell::new(Vec::new()) };
    }

    fn record_device(event: DeviceEvent) {
        EVENTS.with(|events| events.borrow_mut().push(Recorded::Device(event)));
    }

    fn record_endpoint(address: EndpointAddress, event: EndpointEvent) {
        EVENTS.with(|events| {
            events
                .borrow_mut()
                .push(Recorded::Endpoint(address, event))
        });
    }

    fn events() -> Vec<Recorded> {
        EVENTS.with(|events| events.borrow_mut().drain(..).collect())
    }

    fn roles() -> &'static UsbRoles {
        std::boxed::Box::leak(std::boxed::Box::new(UsbRoles::new()))
    }

    fn ep(index: usize, dir: UsbDirection) -> EndpointAddress {
        EndpointAddress::from_parts(index, dir)
    }

    fn device() -> UsbDevice<MockHal, MockClocks, MockInterrupts> {
        UsbDevice::with_registers(
            MockHal::default(),
            MockClocks::default(),
            MockInterrupts::default(),
            Controller::Usb1,
            testing::leak(ral::usb::RegisterBlock::new()),
            roles(),
            PhyConfig::BOARD,
        )
    }

    fn powered() -> UsbDevice<MockHal, MockClocks, MockInterrupts> {
        let mut usbd = device();
        usbd.initialize(Some(record_device), Some(record_endpoint))
            .unwrap();
        usbd.power_control(PowerState::Full).unwrap();
        usbd.hal.ops.clear();
        usbd
    }

    #[test]
    fn role_claim() {
        let mut usbd = device();
        assert_eq!(usbd.power_control(PowerState::Full), Err(Error::Unspecified));

        usbd.initialize(None, None).unwrap();
        assert_eq!(usbd.roles.get(Controller::Usb1), Role::Device);
        assert_eq!(usbd.roles.get(Controller::Usb2), Role::None);

        usbd.power_control(PowerState::Full).unwrap();
        usbd.uninitialize().unwrap();
        assert_eq!(usbd.roles.get(Controller::Usb1), Role::None);
        assert!(usbd.hal.ops.contains(&Op::Deinit));
        assert!(!usbd.irq.is_enabled(Irq::USB_OTG1));
    }

    #[test]
    fn power_sequence() {
        let mut usbd = device();
        usbd.initialize(Some(record_device), None).unwrap();
        usbd.power_control(PowerState::Full).unwrap();
        assert_eq!(
            usbd.clocks.ops,
            [
                ClockOp::EnablePll(Controller::Usb1),
                ClockOp::EnableUsb(Controller::Usb1)
            ]
        );
        assert_eq!(usbd.hal.ops, [Op::PhyInit, Op::Init]);
        assert!(usbd.irq.is_enabled(Irq::USB_OTG1));
        assert_eq!(usbd.power_control(PowerState::Low), Err(Error::Unsupported));

        usbd.power_control(PowerState::Off).unwrap();
        assert!(!usbd.irq.is_enabled(Irq::USB_OTG1));
        assert_eq!(
            usbd.clocks.ops.last(),
            Some(&ClockOp::DisablePll(Controller::Usb1))
        );
        // Every endpoint in both directions was cancelled.
        let cancelled = usbd
            .hal
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Cancel(_)))
            .count();
        assert_eq!(cancelled, 2 * MAX_ENDPOINTS);
        assert_eq!(usbd.device_connect(), Err(Error::Unspecified));
    }

    #[test]
    fn power_preserves_callbacks() {
        let mut usbd = powered();
        usbd.power_control(PowerState::Off).unwrap();
        usbd.power_control(PowerState::Full).unwrap();
        events();

        usbd.hal.events.push_back(HalEvent::Attach);
        usbd.on_interrupt();
        assert_eq!(events(), [Recorded::Device(DeviceEvent::VbusOn)]);
    }

    #[test]
    fn bus_reset() {
        let mut usbd = powered();
        let bulk_in = ep(1, UsbDirection::In);
        let bulk_out = ep(2, UsbDirection::Out);
        usbd.endpoint_configure(bulk_in, EndpointType::Bulk, 512)
            .unwrap();
        usbd.endpoint_configure(bulk_out, EndpointType::Bulk, 512)
            .unwrap();
        usbd.endpoint_stall(bulk_in, true).unwrap();
        usbd.endpoint_stall(ep(0, UsbDirection::Out), true).unwrap();
        usbd.hal.events.push_back(HalEvent::Transferred {
            address: bulk_out,
            length: 64,
        });
        usbd.on_interrupt();
        assert_eq!(usbd.endpoint_transfer_get_result(bulk_out), 64);
        assert!(usbd.hal.stalled(bulk_in));
        events();

        usbd.hal.speed = Speed::High;
        usbd.hal.events.push_back(HalEvent::BusReset);
        usbd.on_interrupt();

        for index in 0..MAX_ENDPOINTS {
            for dir in [UsbDirection::Out, UsbDirection::In] {
                assert!(!usbd.hal.stalled(ep(index, dir)));
                assert_eq!(usbd.endpoint_transfer_get_result(ep(index, dir)), 0);
                assert!(usbd.hal.ops.contains(&Op::Cancel(ep(index, dir))));
            }
        }
        assert_eq!(
            events(),
            [
                Recorded::Device(DeviceEvent::Reset),
                Recorded::Device(DeviceEvent::HighSpeed)
            ]
        );
        assert_eq!(
            usbd.device_get_state(),
            DeviceState {
                vbus: true,
                speed: Speed::High,
                active: true
            }
        );
    }

    #[test]
    fn full_speed_reset() {
        let mut usbd = powered();
        events();
        usbd.hal.events.push_back(HalEvent::BusReset);
        usbd.on_interrupt();
        assert_eq!(events(), [Recorded::Device(DeviceEvent::Reset)]);
        assert_eq!(usbd.device_get_state().speed, Speed::Full);
    }

    #[test]
    fn device_events() {
        let mut usbd = powered();
        events();
        usbd.hal.events.extend([
            HalEvent::Attach,
            HalEvent::Suspend,
            HalEvent::LpmResume,
            HalEvent::Detach,
        ]);
        usbd.on_interrupt();
        assert_eq!(
            events(),
            [
                Recorded::Device(DeviceEvent::VbusOn),
                Recorded::Device(DeviceEvent::Suspend),
                Recorded::Device(DeviceEvent::Resume),
                Recorded::Device(DeviceEvent::VbusOff),
            ]
        );
        let state = usbd.device_get_state();
        assert!(!state.vbus);
        assert!(!state.active);
    }

    #[test]
    fn setup_packet() {
        let mut usbd = powered();
        events();
        assert_eq!(usbd.read_setup_packet(), Err(Error::Unspecified));

        let packet = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        usbd.hal.events.push_back(HalEvent::Setup(packet));
        usbd.on_interrupt();
        assert_eq!(
            events(),
            [Recorded::Endpoint(
                ep(0, UsbDirection::Out),
                EndpointEvent::Setup
            )]
        );
        assert_eq!(usbd.read_setup_packet(), Ok(packet));
        assert_eq!(usbd.read_setup_packet(), Err(Error::Unspecified));
    }

    #[test]
    fn transfers() {
        let mut usbd = powered();
        events();
        let mut buffer = [0u8; 64];
        let bulk_in = ep(3, UsbDirection::In);
        let bulk_out = ep(3, UsbDirection::Out);

        unsafe {
            usbd.endpoint_transfer(bulk_in, buffer.as_mut_ptr(), 13)
                .unwrap();
            usbd.endpoint_transfer(bulk_out, buffer.as_mut_ptr(), 64)
                .unwrap();
        }
        assert_eq!(
            usbd.hal.ops,
            [Op::Send(bulk_in, 13), Op::Recv(bulk_out, 64)]
        );

        usbd.hal.events.extend([
            HalEvent::Transferred {
                address: bulk_in,
                length: 13,
            },
            HalEvent::Transferred {
                address: bulk_out,
                length: 7,
            },
        ]);
        usbd.on_interrupt();
        assert_eq!(
            events(),
            [
                Recorded::Endpoint(bulk_in, EndpointEvent::In),
                Recorded::Endpoint(bulk_out, EndpointEvent::Out),
            ]
        );
        assert_eq!(usbd.endpoint_transfer_get_result(bulk_in), 13);
        assert_eq!(usbd.endpoint_transfer_get_result(bulk_out), 7);

        // A new transfer starts from zero.
        unsafe {
            usbd.endpoint_transfer(bulk_out, buffer.as_mut_ptr(), 64)
                .unwrap();
        }
        assert_eq!(usbd.endpoint_transfer_get_result(bulk_out), 0);

        usbd.hal.refuse = true;
        let refused = unsafe { usbd.endpoint_transfer(bulk_in, buffer.as_mut_ptr(), 1) };
        assert_eq!(refused, Err(Error::Unspecified));
    }

    #[test]
    fn endpoint_range() {
        let mut usbd = powered();
        let mut buffer = [0u8; 8];
        let far = ep(MAX_ENDPOINTS, UsbDirection::In);
        assert_eq!(
            usbd.endpoint_configure(far, EndpointType::Interrupt, 8),
            Err(Error::Parameter)
        );
        assert_eq!(usbd.endpoint_unconfigure(far), Err(Error::Parameter));
        assert_eq!(usbd.endpoint_transfer_abort(far), Err(Error::Parameter));
        assert_eq!(
            unsafe { usbd.endpoint_transfer(far, buffer.as_mut_ptr(), 8) },
            Err(Error::Parameter)
        );
        assert_eq!(usbd.endpoint_transfer_get_result(far), 0);
        assert!(usbd.hal.ops.is_empty());

        let ep1 = ep(1, UsbDirection::In);
        usbd.endpoint_configure(ep1, EndpointType::Interrupt, 8)
            .unwrap();
        usbd.endpoint_unconfigure(ep1).unwrap();
        assert_eq!(
            usbd.hal.ops,
            [Op::InitEndpoint(ep1), Op::DeinitEndpoint(ep1)]
        );
    }

    #[test]
    fn clearing_a_stall_cancels() {
        let mut usbd = powered();
        let ep2 = ep(2, UsbDirection::Out);
        usbd.endpoint_stall(ep2, true).unwrap();
        usbd.endpoint_stall(ep2, false).unwrap();
        assert_eq!(
            usbd.hal.ops,
            [Op::Stall(ep2), Op::Unstall(ep2), Op::Cancel(ep2)]
        );
    }

    #[test]
    fn set_address() {
        let mut usbd = powered();
        usbd.device_set_address(0x2A).unwrap();
        assert_eq!(
            ral::read_reg!(ral::usb, usbd.usb, DEVICEADDR, USBADR),
            0x2A
        );
        assert_eq!(
            ral::read_reg!(ral::usb, usbd.usb, DEVICEADDR, USBADRA),
            0
        );
        assert_eq!(usbd.hal.ops, [Op::Addressed]);
    }

    #[test]
    fn unpowered() {
        let mut usbd = device();
        usbd.initialize(None, None).unwrap();
        assert_eq!(usbd.get_frame_number(), 0);
        assert_eq!(usbd.device_set_address(1), Err(Error::Unspecified));
        assert_eq!(usbd.read_setup_packet(), Err(Error::Unspecified));

        usbd.power_control(PowerState::Full).unwrap();
        assert_eq!(usbd.get_frame_number(), 0x123);
        usbd.device_connect().unwrap();
        usbd.device_disconnect().unwrap();
        assert!(usbd.hal.ops.ends_with(&[Op::Run, Op::Stop]));
    }
}
