//! High-level command set: levels, scenes, groups, queries.
//!
//! Thin sequences over [`Transport`]; every operation is one or a few
//! frames. Set-style commands route their operand through DTR0 and are sent
//! twice, as the standard requires for commands that change stored state.

use dali_protocol::commands::{gear, special};
use dali_protocol::{Address, Frame, LongAddress};

use crate::commissioning::query_long_address;
use crate::transport::{CommandError, Transport};

/// Wait after RESET before the device answers again
pub const RESET_SETTLE_MS: u32 = 300;

/// A set of short addresses, as found by a bus scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSet(u64);

impl DeviceSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a short address
    pub fn insert(&mut self, short_address: u8) {
        self.0 |= 1 << (short_address & 0x3F);
    }

    /// Check for a short address
    pub fn contains(self, short_address: u8) -> bool {
        self.0 & (1 << (short_address & 0x3F)) != 0
    }

    /// Number of devices in the set
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// True when no device was found
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the short addresses in the set
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..64).filter(move |&short| self.contains(short))
    }
}

/// Everything a device will tell us about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub long_address: LongAddress,
    pub operating_mode: u8,
    pub status: u8,
    pub dtr0: u8,
    pub dtr1: u8,
    pub dtr2: u8,
    pub actual_level: u8,
    pub max_level: u8,
    pub min_level: u8,
    pub power_on_level: u8,
    pub system_failure_level: u8,
    pub physical_min_level: u8,
    pub fade_time: u8,
    pub ext_fade_time: u8,
    /// Group membership, bit per group
    pub groups: u16,
    /// Stored level per scene; 255 = not programmed
    pub scenes: [u8; 16],
}

/// Issues gear commands over any [`Transport`]
pub struct Controller<'a, T: Transport> {
    bus: &'a mut T,
}

impl<'a, T: Transport> Controller<'a, T> {
    /// Controller over a bus handle
    pub fn new(bus: &'a mut T) -> Self {
        Self { bus }
    }

    /// Send one addressed command
    pub async fn command(&mut self, address: Address, opcode: u8) {
        let mut frame = Frame::forward(address.byte(), opcode);
        self.bus.send(&mut frame).await;
    }

    /// Send one addressed command twice (stored-state commands)
    pub async fn command_double(&mut self, address: Address, opcode: u8) {
        let mut frame = Frame::forward(address.byte(), opcode);
        self.bus.send_double(&mut frame).await;
    }

    /// Lamps off
    pub async fn off(&mut self, address: Address) {
        self.command(address, gear::OFF).await;
    }

    /// Lamps to maximum
    pub async fn on(&mut self, address: Address) {
        self.command(address, gear::ON).await;
    }

    /// Recall the stored level of a scene
    pub async fn goto_scene(&mut self, address: Address, scene: u8) {
        self.command(address, gear::GO_TO_SCENE + (scene & 0x0F)).await;
    }

    /// Load DTR0, bus-wide
    pub async fn set_dtr0(&mut self, value: u8) {
        let mut frame = Frame::forward(special::DTR0, value);
        self.bus.send(&mut frame).await;
    }

    /// Load DTR1, bus-wide
    pub async fn set_dtr1(&mut self, value: u8) {
        let mut frame = Frame::forward(special::DTR1, value);
        self.bus.send(&mut frame).await;
    }

    /// Load DTR2, bus-wide
    pub async fn set_dtr2(&mut self, value: u8) {
        let mut frame = Frame::forward(special::DTR2, value);
        self.bus.send(&mut frame).await;
    }

    /// Run one of the SET commands with its operand via DTR0.
    ///
    /// `setter` is e.g. [`gear::SET_MAX_LEVEL`] or
    /// `gear::SET_SCENE + scene`.
    pub async fn set_level(&mut self, address: Address, setter: u8, level: u8) {
        self.set_dtr0(level).await;
        self.command_double(address, setter).await;
    }

    /// Add devices to a group
    pub async fn add_to_group(&mut self, address: Address, group: u8) {
        self.command_double(address, gear::ADD_TO_GROUP + (group & 0x0F))
            .await;
    }

    /// Remove devices from a group
    pub async fn remove_from_group(&mut self, address: Address, group: u8) {
        self.command_double(address, gear::REMOVE_FROM_GROUP + (group & 0x0F))
            .await;
    }

    /// Start the identification pattern on the addressed devices
    pub async fn identify(&mut self, address: Address) {
        self.command_double(address, gear::IDENTIFY).await;
    }

    /// Factory-reset the addressed devices
    pub async fn reset(&mut self, address: Address) {
        self.command_double(address, gear::RESET).await;
        self.bus.delay_ms(RESET_SETTLE_MS).await;
    }

    /// Query one byte from the addressed device
    pub async fn query(&mut self, address: Address, opcode: u8) -> Result<u8, CommandError> {
        self.bus.query_byte(address.byte(), opcode).await
    }

    /// Probe all 64 short addresses and report which answered
    pub async fn scan_short_addresses(&mut self) -> DeviceSet {
        let mut found = DeviceSet::empty();
        for short in 0..64 {
            let probe = self
                .bus
                .query_byte(Address::Short(short).byte(), gear::QUERY_OPERATING_MODE)
                .await;
            if probe.is_ok() {
                found.insert(short);
            }
        }
        found
    }

    /// Read a full snapshot of one device.
    ///
    /// Aborts on the first unanswered query; a half-present device is more
    /// likely a bus problem than a partial answer set.
    pub async fn device_info(&mut self, short_address: u8) -> Result<DeviceInfo, CommandError> {
        let device = Address::Short(short_address).byte();
        let long_address = query_long_address(self.bus, short_address).await?;

        let mut info = DeviceInfo {
            long_address,
            operating_mode: self.bus.query_byte(device, gear::QUERY_OPERATING_MODE).await?,
            status: self.bus.query_byte(device, gear::QUERY_STATUS).await?,
            dtr0: self.bus.query_byte(device, gear::QUERY_DTR0).await?,
            dtr1: self.bus.query_byte(device, gear::QUERY_DTR1).await?,
            dtr2: self.bus.query_byte(device, gear::QUERY_DTR2).await?,
            actual_level: self.bus.query_byte(device, gear::QUERY_ACTUAL_LEVEL).await?,
            max_level: self.bus.query_byte(device, gear::QUERY_MAX_LEVEL).await?,
            min_level: self.bus.query_byte(device, gear::QUERY_MIN_LEVEL).await?,
            power_on_level: self.bus.query_byte(device, gear::QUERY_POWER_ON_LEVEL).await?,
            system_failure_level: self
                .bus
                .query_byte(device, gear::QUERY_SYSTEM_FAILURE_LEVEL)
                .await?,
            physical_min_level: self.bus.query_byte(device, gear::QUERY_PHYSICAL_MIN).await?,
            fade_time: self.bus.query_byte(device, gear::QUERY_FADE_TIME).await?,
            ext_fade_time: self.bus.query_byte(device, gear::QUERY_EXT_FADE_TIME).await?,
            groups: 0,
            scenes: [0; 16],
        };

        let groups_low = self.bus.query_byte(device, gear::QUERY_GROUPS_0_7).await?;
        let groups_high = self.bus.query_byte(device, gear::QUERY_GROUPS_8_15).await?;
        info.groups = u16::from_le_bytes([groups_low, groups_high]);

        for scene in 0..16u8 {
            info.scenes[scene as usize] = self
                .bus
                .query_byte(device, gear::QUERY_SCENE_LEVEL + scene)
                .await?;
        }

        Ok(info)
    }
}
