//! ABI records shared between the shim, its callers and the SimCAN library.
//!
//! Every struct here is `#[repr(C)]` and laid out exactly as the vendor
//! headers declare it, since pointers to them are handed straight through.

use std::ffi::c_void;

/// Win32 `BOOL`
pub type Bool = i32;
/// Win32 `DWORD`
pub type Dword = u32;
/// Win32 `ULONG`
pub type Ulong = u32;
/// Win32 `LONG` (always 32 bits, even on 64 bit Windows)
pub type Long = i32;
/// Win32 `HANDLE`
pub type Handle = *mut c_void;

/// `BOOL` true
pub const TRUE: Bool = 1;
/// `BOOL` false
pub const FALSE: Bool = 0;

/// Returned by [crate::ffi::CanGetDeviceHandle] on failure
pub const INVALID_HANDLE_VALUE: Handle = -1isize as Handle;

/// Maximum number of data bytes in a [CanMsg]
pub const CAN_MAX_MSG_LENGTH: usize = 8;

/// CAN message identifier
pub type CanMsgId = u32;

/// Handle to an opened CAN interface. `0` is never a valid handle.
pub type CanHandle = Long;

/// Callback invoked by the vendor whenever a remote frame is received.
pub type SimCanRmr = unsafe extern "system" fn(net_index: Long, index: Ulong) -> Bool;

bitflags::bitflags! {
    /// Frame type selector / descriptor
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CanFrameType: u32 {
        /// Standard 11 bit identifier
        const STANDARD = 0x1;
        /// Extended 29 bit identifier
        const EXTENDED = 0x2;
        /// Remote frame
        const REMOTE = 0x4;
    }
}

impl CanFrameType {
    /// No frame type selected (`CAN_FRAME_INIT`)
    pub const INIT: Self = Self::empty();
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A CAN message, used for both transmit and receive
pub struct CanMsg {
    /// Message identifier
    pub id: CanMsgId,
    /// Payload. The number of valid bytes travels separately
    pub data: [u8; CAN_MAX_MSG_LENGTH],
}

impl CanMsg {
    /// Creates a message, copying at most [CAN_MAX_MSG_LENGTH] bytes of `data`
    pub fn new(id: CanMsgId, data: &[u8]) -> Self {
        let mut msg = Self { id, data: [0; CAN_MAX_MSG_LENGTH] };
        let len = data.len().min(CAN_MAX_MSG_LENGTH);
        msg.data[..len].copy_from_slice(&data[..len]);
        msg
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Performance and error counters kept by the vendor driver
pub struct CanStatistics {
    /// Received messages
    pub rx_msg_cntr: Ulong,
    /// Received data bytes
    pub rx_data_cntr: Ulong,
    /// Transmitted messages
    pub tx_msg_cntr: Ulong,
    /// Transmitted data bytes
    pub tx_data_cntr: Ulong,
    /// Hardware overruns
    pub hw_ovrn_cntr: Ulong,
    /// Bus warnings
    pub bus_warn_cntr: Ulong,
    /// Bus off events
    pub bus_off_cntr: Ulong,
    /// Application overruns
    pub app_ovrn_cntr: Ulong,
    /// Receive FIFO overruns
    pub rx_fifo_ovrn_cntr: Ulong,
    /// Receive FIFO high water mark
    pub rx_fifo_max: Ulong,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Interface capabilities
pub struct CanProperties {
    /// Supported interface types bitmask
    pub interface_types: Ulong,
    /// Supported frame types bitmask
    pub frame_types: Ulong,
}

impl CanProperties {
    /// Supported frame types, keeping any bits this crate does not name
    pub fn frame_types(&self) -> CanFrameType {
        CanFrameType::from_bits_retain(self.frame_types)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// 64 bit timestamp split into two halves
pub struct CanTimeStamp {
    /// Low 32 bits
    pub low: Ulong,
    /// High 32 bits
    pub high: Ulong,
}

impl CanTimeStamp {
    /// Full 64 bit value
    pub fn as_u64(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

impl From<u64> for CanTimeStamp {
    fn from(v: u64) -> Self {
        Self {
            low: v as u32,
            high: (v >> 32) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_layout() {
        assert_eq!(std::mem::size_of::<CanMsg>(), 12);
        assert_eq!(std::mem::size_of::<CanStatistics>(), 40);
        assert_eq!(std::mem::size_of::<CanProperties>(), 8);
        assert_eq!(std::mem::size_of::<CanTimeStamp>(), 8);
        assert_eq!(std::mem::size_of::<CanFrameType>(), 4);
    }

    #[test]
    fn msg_truncates_payload() {
        let msg = CanMsg::new(0x7E0, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(msg.data, [1, 2, 3, 4, 5, 6, 7, 8]);
        let short = CanMsg::new(0x10, &[0xAA]);
        assert_eq!(short.data, [0xAA, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn timestamp_halves() {
        let ts = CanTimeStamp::from(0x0000_0001_8000_0002);
        assert_eq!(ts.low, 0x8000_0002);
        assert_eq!(ts.high, 1);
        assert_eq!(ts.as_u64(), 0x0000_0001_8000_0002);
    }

    #[test]
    fn unnamed_frame_bits_survive() {
        let props = CanProperties { interface_types: 0, frame_types: 0x13 };
        let ft = props.frame_types();
        assert!(ft.contains(CanFrameType::STANDARD | CanFrameType::EXTENDED));
        assert_eq!(ft.bits(), 0x13);
        assert!(CanFrameType::INIT.is_empty());
    }
}
