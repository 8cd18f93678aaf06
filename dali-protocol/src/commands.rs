//! Command opcodes.
//!
//! Two opcode spaces: [`gear`] commands are addressed (the opcode travels in
//! the second byte, after the address byte), [`special`] commands are
//! bus-wide (the opcode travels in the address byte position, the operand in
//! the second byte). Section numbers refer to IEC 62386-102.

/// Addressed control-gear commands
pub mod gear {
    pub const OFF: u8 = 0x00; // 11.3.2: target level 0 and off
    pub const UP: u8 = 0x01; // 11.3.3: fade up for 200 ms
    pub const DOWN: u8 = 0x02; // 11.3.4
    pub const STEP_UP: u8 = 0x03; // 11.3.5: immediate one step up
    pub const STEP_DOWN: u8 = 0x04; // 11.3.6
    pub const RECALL_MAX: u8 = 0x05; // 11.3.7: target = actual = max level
    pub const RECALL_MIN: u8 = 0x06;
    pub const STEP_DOWN_OFF: u8 = 0x07;
    pub const ON_STEP_UP: u8 = 0x08;
    pub const DAPC_SEQUENCE: u8 = 0x09;
    pub const LAST_ACTIVE: u8 = 0x0A;
    pub const CONTINUOUS_UP: u8 = 0x0B;
    pub const CONTINUOUS_DOWN: u8 = 0x0C;

    /// Conventional "on": recall the maximum level
    pub const ON: u8 = RECALL_MAX;

    pub const GO_TO_SCENE: u8 = 0x10; // + scene number 0-15

    pub const RESET: u8 = 0x20; // 11.4.2
    pub const ACTUAL_IN_DTR0: u8 = 0x21;
    pub const SET_OPERATING_MODE: u8 = 0x23;
    pub const IDENTIFY: u8 = 0x25; // 11.4.6

    // SET commands, operand via DTR0
    pub const SET_MAX_LEVEL: u8 = 0x2A; // 11.4.7
    pub const SET_MIN_LEVEL: u8 = 0x2B; // 11.4.8
    pub const SET_SYSTEM_FAILURE_LEVEL: u8 = 0x2C; // 11.4.9
    pub const SET_POWER_ON_LEVEL: u8 = 0x2D; // 11.4.10
    pub const SET_FADE_TIME: u8 = 0x2E; // 11.4.11
    pub const SET_FADE_RATE: u8 = 0x2F; // 11.4.12
    pub const SET_EXT_FADE_TIME: u8 = 0x30; // 11.4.13

    // SCENE commands, + scene number 0-15
    pub const SET_SCENE: u8 = 0x40;
    pub const REMOVE_FROM_SCENE: u8 = 0x50;

    // GROUP commands, + group number 0-15
    pub const ADD_TO_GROUP: u8 = 0x60;
    pub const REMOVE_FROM_GROUP: u8 = 0x70;

    // QUERY commands; the device answers with a backward frame
    pub const QUERY_STATUS: u8 = 0x90; // 11.5.2
    pub const QUERY_DTR0: u8 = 0x98; // 11.5.11
    pub const QUERY_PHYSICAL_MIN: u8 = 0x9A; // 11.5.14
    pub const QUERY_DTR1: u8 = 0x9C; // 11.5.16
    pub const QUERY_DTR2: u8 = 0x9D; // 11.5.17
    pub const QUERY_OPERATING_MODE: u8 = 0x9E; // 11.5.18
    pub const QUERY_ACTUAL_LEVEL: u8 = 0xA0; // 11.5.20
    pub const QUERY_MAX_LEVEL: u8 = 0xA1; // 11.5.21
    pub const QUERY_MIN_LEVEL: u8 = 0xA2; // 11.5.22
    pub const QUERY_POWER_ON_LEVEL: u8 = 0xA3; // 11.5.23
    pub const QUERY_SYSTEM_FAILURE_LEVEL: u8 = 0xA4; // 11.5.24
    pub const QUERY_FADE_TIME: u8 = 0xA5; // 11.5.25
    pub const QUERY_EXT_FADE_TIME: u8 = 0xA8; // 11.5.65
    pub const QUERY_SCENE_LEVEL: u8 = 0xB0; // + scene number 0-15
    pub const QUERY_GROUPS_0_7: u8 = 0xC0;
    pub const QUERY_GROUPS_8_15: u8 = 0xC1;
    pub const QUERY_RAND_ADDR_H: u8 = 0xC2; // 11.4.31
    pub const QUERY_RAND_ADDR_M: u8 = 0xC3; // 11.4.32
    pub const QUERY_RAND_ADDR_L: u8 = 0xC4; // 11.4.33
}

/// Special commands; the opcode occupies the address byte position
pub mod special {
    pub const TERMINATE: u8 = 0xA1; // releases the INITIALISE state
    pub const DTR0: u8 = 0xA3; // data transfer register 0
    pub const INITIALISE: u8 = 0xA5; // 2x, operand selects the device subset
    pub const RANDOMISE: u8 = 0xA7; // 2x
    pub const COMPARE: u8 = 0xA9; // stored address <= search address?
    pub const WITHDRAW: u8 = 0xAB; // stop answering COMPARE
    pub const PING: u8 = 0xAD;
    pub const SEARCHADDRH: u8 = 0xB1;
    pub const SEARCHADDRM: u8 = 0xB3;
    pub const SEARCHADDRL: u8 = 0xB5;
    pub const PROGRAM_SHORT_ADDRESS: u8 = 0xB7;
    pub const VERIFY_SHORT_ADDRESS: u8 = 0xB9;
    pub const QUERY_SHORT_ADDRESS: u8 = 0xBB;
    pub const ENABLE_DEVICE_TYPE: u8 = 0xC1;
    pub const DTR1: u8 = 0xC3;
    pub const DTR2: u8 = 0xC5;
    pub const WRITE_MEMORY_LOCATION: u8 = 0xC7;
    pub const WRITE_MEMORY_NO_REPLY: u8 = 0xC9;
}

use crate::address::{Address, BROADCAST};

/// Device subset selected by the INITIALISE operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitialiseScope {
    /// All devices
    All,
    /// Only devices that have no short address yet
    WithoutShortAddress,
    /// Only the device currently holding this short address
    Device(u8),
}

impl InitialiseScope {
    /// Pack into the INITIALISE operand byte
    pub const fn byte(self) -> u8 {
        match self {
            InitialiseScope::All => 0x00,
            InitialiseScope::WithoutShortAddress => BROADCAST,
            InitialiseScope::Device(address) => Address::Short(address).byte(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialise_scope_operands() {
        assert_eq!(InitialiseScope::All.byte(), 0x00);
        assert_eq!(InitialiseScope::WithoutShortAddress.byte(), 0xFF);
        assert_eq!(InitialiseScope::Device(0).byte(), 0x01);
        assert_eq!(InitialiseScope::Device(5).byte(), 0x0B);
    }

    #[test]
    fn test_special_opcodes_are_odd() {
        // Special command opcodes sit in the address byte with bit 0 set,
        // so they can never alias a direct-arc-power frame.
        for opcode in [
            special::TERMINATE,
            special::INITIALISE,
            special::RANDOMISE,
            special::COMPARE,
            special::WITHDRAW,
            special::SEARCHADDRH,
            special::SEARCHADDRM,
            special::SEARCHADDRL,
            special::PROGRAM_SHORT_ADDRESS,
        ] {
            assert_eq!(opcode & 0x01, 0x01);
        }
    }
}
