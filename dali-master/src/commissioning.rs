//! Commissioning: discovering devices and assigning short addresses.
//!
//! Devices hold a self-generated 24-bit random address. While the bus-wide
//! INITIALISE mode is active, the master narrows in on the lowest random
//! address by binary search: it broadcasts a search address and asks every
//! device whose address is at or below it to answer COMPARE. The found
//! device gets a short address programmed and is withdrawn from the search
//! set, and the loop repeats until the search space is exhausted.

use dali_protocol::commands::{gear, special};
use dali_protocol::{Address, Frame, InitialiseScope, LongAddress};

use crate::transport::{CommandError, Transport};

/// Wait after RANDOMISE before devices have settled on a new address
pub const RANDOMISE_SETTLE_MS: u32 = 100;

/// Wait between COMPARE iterations so reply timing is respected
pub const COMPARE_SETTLE_MS: u32 = 10;

/// Short addresses available on one bus
pub const MAX_SHORT_ADDRESSES: u8 = 63;

/// Read a device's 24-bit random address, one byte per query.
///
/// Any missing reply aborts; a device that answers H but not M/L is not
/// safely addressable.
pub async fn query_long_address<T: Transport>(
    bus: &mut T,
    short_address: u8,
) -> Result<LongAddress, CommandError> {
    let device = Address::Short(short_address).byte();
    let high = bus.query_byte(device, gear::QUERY_RAND_ADDR_H).await?;
    let mid = bus.query_byte(device, gear::QUERY_RAND_ADDR_M).await?;
    let low = bus.query_byte(device, gear::QUERY_RAND_ADDR_L).await?;
    Ok(LongAddress::from_bytes(high, mid, low))
}

/// Runs the commissioning protocol over any [`Transport`]
pub struct Commissioner<'a, T: Transport> {
    bus: &'a mut T,
}

impl<'a, T: Transport> Commissioner<'a, T> {
    /// Commissioner over a bus handle
    pub fn new(bus: &'a mut T) -> Self {
        Self { bus }
    }

    /// Enter INITIALISE mode for the selected device subset
    pub async fn initialise(&mut self, scope: InitialiseScope) {
        let mut frame = Frame::forward(special::INITIALISE, scope.byte());
        self.bus.send_double(&mut frame).await;
    }

    /// Leave INITIALISE mode
    pub async fn terminate(&mut self) {
        let mut frame = Frame::forward(special::TERMINATE, 0x00);
        self.bus.send(&mut frame).await;
    }

    /// Have the selected devices draw fresh random addresses
    pub async fn randomise(&mut self, scope: InitialiseScope) {
        self.initialise(scope).await;
        let mut frame = Frame::forward(special::RANDOMISE, 0x00);
        self.bus.send_double(&mut frame).await;
        self.bus.delay_ms(RANDOMISE_SETTLE_MS).await;
        self.terminate().await;
    }

    /// Broadcast the 24-bit search address in three parts
    pub async fn set_search_address(&mut self, address: LongAddress) {
        for (opcode, byte) in [
            (special::SEARCHADDRH, address.high()),
            (special::SEARCHADDRM, address.mid()),
            (special::SEARCHADDRL, address.low()),
        ] {
            let mut frame = Frame::forward(opcode, byte);
            self.bus.send(&mut frame).await;
        }
    }

    /// Ask whether any device's address is at or below the search address
    pub async fn compare(&mut self) -> bool {
        let mut reply = Frame::default();
        self.bus
            .query(Frame::forward(special::COMPARE, 0x00), &mut reply)
            .await
    }

    /// Find the lowest random address among devices still answering COMPARE.
    ///
    /// Requires INITIALISE mode. Returns [`LongAddress::NOT_FOUND`] when no
    /// device responds at all. At most 24 iterations: one interval halving
    /// per address bit.
    pub async fn binary_search(&mut self) -> LongAddress {
        // The ceiling starts one past the highest assignable address, which
        // keeps the interval arithmetic uniform
        let mut low: u32 = 0x00_0000;
        let mut high: u32 = 0xFF_FFFF;

        for _ in 0..24 {
            let mid = (low + high) / 2;
            self.set_search_address(LongAddress(mid)).await;

            if self.compare().await {
                high = mid;
            } else {
                low = mid;
            }

            if high - low < 2 {
                if low == 0 && mid != 0 {
                    // Address 0 itself has not been probed yet: the interval
                    // is half open and only ever compares mid >= 1 on the
                    // way down. One more pass lands on mid == 0.
                    continue;
                }
                break;
            }

            self.bus.delay_ms(COMPARE_SETTLE_MS).await;
        }

        LongAddress(high)
    }

    /// Take the device at `address` out of the COMPARE set
    pub async fn withdraw(&mut self, address: LongAddress) {
        self.set_search_address(address).await;
        let mut frame = Frame::forward(special::WITHDRAW, 0x00);
        self.bus.send(&mut frame).await;
    }

    /// Program the short address of the device currently matching the
    /// search address
    async fn program_short_address(&mut self, address_byte: u8) {
        let mut frame = Frame::forward(special::PROGRAM_SHORT_ADDRESS, address_byte);
        self.bus.send(&mut frame).await;
    }

    /// Discover every device in `scope` and assign sequential short
    /// addresses 0, 1, 2, ...
    ///
    /// Returns the number of devices addressed. Stops after
    /// [`MAX_SHORT_ADDRESSES`] assignments or when the search space is
    /// exhausted.
    pub async fn reindex(&mut self, scope: InitialiseScope) -> u8 {
        self.initialise(scope).await;

        let mut assigned = 0;
        for index in 0..MAX_SHORT_ADDRESSES {
            let address = self.binary_search().await;
            if address == LongAddress::NOT_FOUND {
                break;
            }

            self.set_search_address(address).await;
            self.program_short_address(Address::Short(index).byte()).await;
            self.withdraw(address).await;
            assigned += 1;
        }

        self.terminate().await;
        assigned
    }

    /// Move one device to a new short address, or clear it with `None`.
    pub async fn change_short_address(
        &mut self,
        from: u8,
        to: Option<u8>,
    ) -> Result<(), CommandError> {
        if from > MAX_SHORT_ADDRESSES {
            return Err(CommandError::InvalidAddress(from));
        }
        let target = match to {
            None => dali_protocol::BROADCAST,
            Some(address) if address <= MAX_SHORT_ADDRESSES => Address::Short(address).byte(),
            Some(address) => return Err(CommandError::InvalidAddress(address)),
        };

        let long = query_long_address(self.bus, from).await?;

        self.initialise(InitialiseScope::Device(from)).await;
        self.set_search_address(long).await;
        self.program_short_address(target).await;
        self.terminate().await;
        Ok(())
    }

    /// Read back a device's long address; see [`query_long_address`]
    pub async fn query_long_address(
        &mut self,
        short_address: u8,
    ) -> Result<LongAddress, CommandError> {
        query_long_address(self.bus, short_address).await
    }
}
