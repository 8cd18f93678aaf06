//! Simulated control gear population for protocol-layer tests.
//!
//! [`SimBus`] implements [`Transport`] directly: frames are interpreted
//! against an in-memory device population instead of being clocked onto a
//! wire, and replies come back immediately. Special commands are recognized
//! by their position (the opcode rides in the address byte, and the special
//! opcode range 0xA1..=0xC9 odd is disjoint from every valid address byte).

use heapless::Vec;

use dali_protocol::commands::{gear, special};
use dali_protocol::{Address, Frame, FrameStatus, BROADCAST};

use crate::transport::Transport;

const DEFAULT_MAX_LEVEL: u8 = 254;
const DEFAULT_MIN_LEVEL: u8 = 1;
const SCENE_MASK: u8 = 255;

pub(crate) struct SimDevice {
    long_address: u32,
    short_address: Option<u8>,
    initialised: bool,
    withdrawn: bool,
    actual_level: u8,
    max_level: u8,
    min_level: u8,
    power_on_level: u8,
    system_failure_level: u8,
    fade_time: u8,
    operating_mode: u8,
    status: u8,
    groups: u16,
    scenes: [u8; 16],
}

impl SimDevice {
    fn new(long_address: u32) -> Self {
        Self {
            long_address,
            short_address: None,
            initialised: false,
            withdrawn: false,
            actual_level: 0,
            max_level: DEFAULT_MAX_LEVEL,
            min_level: DEFAULT_MIN_LEVEL,
            power_on_level: DEFAULT_MAX_LEVEL,
            system_failure_level: DEFAULT_MAX_LEVEL,
            fade_time: 0x07,
            operating_mode: 0x00,
            status: 0x04,
            groups: 0,
            scenes: [SCENE_MASK; 16],
        }
    }

    fn matches(&self, address_byte: u8) -> bool {
        if address_byte == BROADCAST {
            return true;
        }
        if address_byte & 0x80 != 0 {
            let group = (address_byte >> 1) & 0x0F;
            return self.groups & (1 << group) != 0;
        }
        self.short_address
            .map(|short| Address::Short(short).byte() == address_byte)
            .unwrap_or(false)
    }
}

pub(crate) struct SimBus {
    devices: Vec<SimDevice, 64>,
    search_address: u32,
    dtr0: u8,
    dtr1: u8,
    dtr2: u8,
    /// COMPARE queries issued, for iteration-bound assertions
    pub compare_count: usize,
    /// First frames sent, as (address byte, opcode byte, sequence id)
    pub log: Vec<(u8, u8, u8), 32>,
}

impl SimBus {
    pub fn with_long_addresses(addresses: &[u32]) -> Self {
        let mut devices = Vec::new();
        for &address in addresses {
            let _ = devices.push(SimDevice::new(address));
        }
        Self {
            devices,
            search_address: 0,
            dtr0: 0,
            dtr1: 0,
            dtr2: 0,
            compare_count: 0,
            log: Vec::new(),
        }
    }

    pub fn assign_short(&mut self, long_address: u32, short_address: u8) {
        for device in &mut self.devices {
            if device.long_address == long_address {
                device.short_address = Some(short_address);
            }
        }
    }

    pub fn short_address_of(&self, long_address: u32) -> Option<u8> {
        self.devices
            .iter()
            .find(|device| device.long_address == long_address)
            .and_then(|device| device.short_address)
    }

    pub fn any_initialised(&self) -> bool {
        self.devices.iter().any(|device| device.initialised)
    }

    pub fn actual_level_of(&self, short_address: u8) -> Option<u8> {
        self.devices
            .iter()
            .find(|device| device.short_address == Some(short_address))
            .map(|device| device.actual_level)
    }

    pub fn groups_of(&self, short_address: u8) -> u16 {
        self.devices
            .iter()
            .find(|device| device.short_address == Some(short_address))
            .map(|device| device.groups)
            .unwrap_or(0)
    }

    fn is_special(address_byte: u8) -> bool {
        (0xA1..=0xC9).contains(&address_byte) && address_byte & 0x01 == 1
    }

    fn apply_special(&mut self, opcode: u8, operand: u8) {
        match opcode {
            special::INITIALISE => {
                for device in &mut self.devices {
                    let selected = match operand {
                        0x00 => true,
                        BROADCAST => device.short_address.is_none(),
                        byte => device
                            .short_address
                            .map(|short| Address::Short(short).byte() == byte)
                            .unwrap_or(false),
                    };
                    if selected {
                        device.initialised = true;
                        device.withdrawn = false;
                    }
                }
            }
            special::TERMINATE => {
                for device in &mut self.devices {
                    device.initialised = false;
                }
            }
            special::RANDOMISE => {
                // Addresses are pre-seeded by the test; nothing to draw
            }
            special::SEARCHADDRH => {
                self.search_address = (self.search_address & 0x00_FFFF) | ((operand as u32) << 16);
            }
            special::SEARCHADDRM => {
                self.search_address = (self.search_address & 0xFF_00FF) | ((operand as u32) << 8);
            }
            special::SEARCHADDRL => {
                self.search_address = (self.search_address & 0xFF_FF00) | operand as u32;
            }
            special::WITHDRAW => {
                for device in &mut self.devices {
                    if device.initialised && device.long_address == self.search_address {
                        device.withdrawn = true;
                    }
                }
            }
            special::PROGRAM_SHORT_ADDRESS => {
                for device in &mut self.devices {
                    if device.initialised && device.long_address == self.search_address {
                        device.short_address = if operand == BROADCAST {
                            None
                        } else {
                            Some((operand >> 1) & 0x3F)
                        };
                    }
                }
            }
            special::DTR0 => self.dtr0 = operand,
            special::DTR1 => self.dtr1 = operand,
            special::DTR2 => self.dtr2 = operand,
            _ => {}
        }
    }

    fn apply_addressed(&mut self, address_byte: u8, opcode: u8) {
        let dtr0 = self.dtr0;
        for device in self.devices.iter_mut().filter(|d| d.matches(address_byte)) {
            match opcode {
                gear::OFF => device.actual_level = 0,
                gear::RECALL_MAX => device.actual_level = device.max_level,
                gear::RECALL_MIN => device.actual_level = device.min_level,
                opcode if opcode & 0xF0 == gear::GO_TO_SCENE => {
                    let level = device.scenes[(opcode & 0x0F) as usize];
                    if level != SCENE_MASK {
                        device.actual_level = level;
                    }
                }
                gear::SET_MAX_LEVEL => device.max_level = dtr0,
                gear::SET_MIN_LEVEL => device.min_level = dtr0,
                gear::SET_POWER_ON_LEVEL => device.power_on_level = dtr0,
                gear::SET_SYSTEM_FAILURE_LEVEL => device.system_failure_level = dtr0,
                gear::SET_FADE_TIME => device.fade_time = dtr0,
                opcode if opcode & 0xF0 == gear::SET_SCENE => {
                    device.scenes[(opcode & 0x0F) as usize] = dtr0;
                }
                opcode if opcode & 0xF0 == gear::REMOVE_FROM_SCENE => {
                    device.scenes[(opcode & 0x0F) as usize] = SCENE_MASK;
                }
                opcode if opcode & 0xF0 == gear::ADD_TO_GROUP => {
                    device.groups |= 1 << (opcode & 0x0F);
                }
                opcode if opcode & 0xF0 == gear::REMOVE_FROM_GROUP => {
                    device.groups &= !(1 << (opcode & 0x0F));
                }
                _ => {}
            }
        }
    }

    fn answer(&mut self, address_byte: u8, opcode: u8) -> Option<u8> {
        if Self::is_special(address_byte) {
            if address_byte == special::COMPARE {
                self.compare_count += 1;
                let anyone = self.devices.iter().any(|device| {
                    device.initialised
                        && !device.withdrawn
                        && device.long_address <= self.search_address
                });
                return anyone.then_some(0xFF);
            }
            return None;
        }

        let device = self
            .devices
            .iter()
            .find(|device| device.matches(address_byte))?;
        match opcode {
            gear::QUERY_STATUS => Some(device.status),
            gear::QUERY_DTR0 => Some(self.dtr0),
            gear::QUERY_DTR1 => Some(self.dtr1),
            gear::QUERY_DTR2 => Some(self.dtr2),
            gear::QUERY_OPERATING_MODE => Some(device.operating_mode),
            gear::QUERY_ACTUAL_LEVEL => Some(device.actual_level),
            gear::QUERY_MAX_LEVEL => Some(device.max_level),
            gear::QUERY_MIN_LEVEL => Some(device.min_level),
            gear::QUERY_POWER_ON_LEVEL => Some(device.power_on_level),
            gear::QUERY_SYSTEM_FAILURE_LEVEL => Some(device.system_failure_level),
            gear::QUERY_PHYSICAL_MIN => Some(DEFAULT_MIN_LEVEL),
            gear::QUERY_FADE_TIME => Some(device.fade_time),
            gear::QUERY_EXT_FADE_TIME => Some(0x00),
            gear::QUERY_GROUPS_0_7 => Some(device.groups as u8),
            gear::QUERY_GROUPS_8_15 => Some((device.groups >> 8) as u8),
            gear::QUERY_RAND_ADDR_H => Some((device.long_address >> 16) as u8),
            gear::QUERY_RAND_ADDR_M => Some((device.long_address >> 8) as u8),
            gear::QUERY_RAND_ADDR_L => Some(device.long_address as u8),
            opcode if opcode & 0xF0 == gear::QUERY_SCENE_LEVEL => {
                Some(device.scenes[(opcode & 0x0F) as usize])
            }
            _ => None,
        }
    }
}

impl Transport for SimBus {
    async fn send(&mut self, frame: &mut Frame) {
        let address_byte = frame.payload[0];
        let opcode = frame.payload[1];
        let _ = self.log.push((address_byte, opcode, frame.sequence_id));

        if Self::is_special(address_byte) {
            self.apply_special(address_byte, opcode);
        } else {
            self.apply_addressed(address_byte, opcode);
        }
        frame.status = FrameStatus::Ok;
    }

    async fn query(&mut self, tx: Frame, rx: &mut Frame) -> bool {
        let mut tx = tx;
        self.send(&mut tx).await;
        match self.answer(tx.payload[0], tx.payload[1]) {
            Some(byte) => {
                *rx = Frame::backward(6);
                rx.payload[0] = byte;
                rx.bit_length = 8;
                rx.status = FrameStatus::Ok;
                true
            }
            None => false,
        }
    }

    async fn delay_ms(&mut self, _ms: u32) {
        // Simulated gear settles instantly
    }
}
