//! SimCAN error codes.
//!
//! The vendor reports its own failures through the platform last error using
//! codes in a reserved range starting at [CAN_ERROR_MSG_BASE]. The shim never
//! produces most of these itself, it only passes them through and offers the
//! message tables so callers can describe them.

use std::ffi::{CStr, CString};
use std::sync::LazyLock;

use enum_repr::EnumRepr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

/// Base of the reserved SimCAN error range
pub const CAN_ERROR_MSG_BASE: u32 = 0x1F00;

/// Number of entries in the message tables
pub const CAN_ERROR_COUNT: usize = 48;

const MISSING_DESCRIPTION: &str = "ERROR DESCRIPTION MISSING";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Error, EnumIter)]
#[EnumRepr(type = "u32")]
#[allow(missing_docs)]
pub enum CanErrorCode {
    #[error("Operation succeeded.")]
    Success = 0x1F00,
    #[error("Operation failed, General fault no specific error applicable.")]
    Fail = 0x1F01,
    #[error("The device is already opened.")]
    DeviceAlreadyOpen = 0x1F02,
    #[error("There are no more drivers.")]
    NoMoreDriver = 0x1F03,
    #[error("Can not find a callback function for receiving messages.")]
    NoRcvCallback = 0x1F04,
    #[error("Failed creating thread.")]
    CreatingThread = 0x1F05,
    #[error("Hardware is not responding.")]
    NoContactHw = 0x1F06,
    #[error("Failed to send message to hardware.")]
    SendHw = 0x1F07,
    #[error("Failed to receive message from hardware.")]
    ReceiveHw = 0x1F08,
    #[error("Remote Frame error.")]
    RemoteFrame = 0x1F09,
    #[error("Bus off, the driver can not sense a net.")]
    BusOff = 0x1F0A,
    #[error("No more free handles.")]
    NoMoreHandles = 0x1F0B,
    #[error("The net does not exist.")]
    NoMoreNets = 0x1F0C,
    #[error("The process was already initiated.")]
    AlreadyInitiated = 0x1F0D,
    #[error("The handle is bad, it may be an illegal handle or it is not opened.")]
    WrongHandle = 0x1F0E,
    #[error("The process is not initialized")]
    NotInitialized = 0x1F0F,
    #[error("The dynamic connection failed")]
    ConnectFailed = 0x1F10,
    #[error("The hardware handle is bad, it may be an illegal handle or it is not opened.")]
    WrongHwHandle = 0x1F11,
    #[error("Bad receive type (0). Not sporadic (1) or periodic (2).")]
    BadCallbackType = 0x1F12,
    #[error("Null handle provided. Open may have returned null.")]
    NullHandle = 0x1F13,
    #[error("Trying to open illegal null net \"CAN0\".")]
    NullNet = 0x1F14,
    #[error("Failed to validate license.")]
    NoLicense = 0x1F15,
    #[error("Could not find an xml file.")]
    NoXmlFile = 0x1F16,
    #[error("Could not load HwXML.dll.")]
    LoadHwXml = 0x1F17,
    #[error("Could not create shared memory.")]
    SharedMemory = 0x1F18,
    #[error("Disallowed configuration in the XML file.")]
    FaultyXmlFile = 0x1F19,
    #[error("Failed to load interface dll.")]
    LoadInterface = 0x1F1A,
    #[error("Trying to send/receive bad frametype.")]
    FrameType = 0x1F1B,
    #[error("No more HW handles.")]
    NoMoreHwHandle = 0x1F1C,
    #[error("Last message was affected by fault injection packet loss.")]
    PacketLoss = 0x1F1D,
    #[error("Problem related to IXXAT adapter.")]
    Ixxat = 0x1F1E,
    #[error("Rx queue empty/Tx queue full.")]
    IxxatRxTxQueue = 0x1F1F,
    #[error(
        "Function could not be carried out due to HW or SW errors; check function of the PC/CAN-interface."
    )]
    IxxatHwSwFunction = 0x1F20,
    #[error("Function is not supported in this form (support-error).")]
    IxxatFunctionNotSupported = 0x1F21,
    #[error("Calling parameter(s) not correct or out of range.")]
    IxxatParameters = 0x1F22,
    #[error("Resource error. Limits (memory, max. nbr of queues, etc.) has been exceeded.")]
    IxxatResource = 0x1F23,
    #[error("Receive queue overrun.")]
    IxxatReceiveQueueOverrun = 0x1F24,
    #[error("A CAN message couldn't be sent for a long time (cable error, wrong baud rate etc).")]
    IxxatMessageNotSent = 0x1F25,
    #[error("Can Fault Injection component initialization error.")]
    FaultInjectionInit = 0x1F26,
    #[error("Can Fault Injection component error.")]
    FaultInjectionInternal = 0x1F27,
    #[error("Invalid fault type or fault registration data.")]
    FaultInjectionInvalidFaultData = 0x1F28,
    #[error("Maximum number of fault entries reached.")]
    FaultInjectionMaxFaultEntries = 0x1F29,
    #[error("Fault Injection timer overflow.")]
    FaultInjectionTimerOverflow = 0x1F2A,
    #[error("Fault Injection timer not initialized or not started.")]
    FaultInjectionTimerNotStarted = 0x1F2B,
    #[error("Fault Injection timer error.")]
    FaultInjectionTimerOther = 0x1F2C,
    #[error("Fault Injection shared global data error.")]
    FaultInjectionGlobalData = 0x1F2D,
    #[error("Invalid fault entry index.")]
    FaultInjectionInvalidEntryIdx = 0x1F2E,
    #[error("Invalid fault entry handle.")]
    FaultInjectionInvalidFaultHandle = 0x1F2F,
}

impl CanErrorCode {
    /// Kvaser adapters reuse the IXXAT queue code
    pub const KVASER: Self = Self::IxxatRxTxQueue;

    /// Offset of this code within the reserved range
    pub fn offset(&self) -> usize {
        (self.repr() - CAN_ERROR_MSG_BASE) as usize
    }
}

static MESSAGES_A: LazyLock<Vec<CString>> = LazyLock::new(|| {
    CanErrorCode::iter()
        .map(|c| CString::new(c.to_string()).unwrap_or_default())
        .collect()
});

static MESSAGES_W: LazyLock<Vec<Vec<u16>>> = LazyLock::new(|| {
    CanErrorCode::iter()
        .map(|c| c.to_string().encode_utf16().chain(std::iter::once(0)).collect())
        .collect()
});

static MISSING_A: &CStr = c"ERROR DESCRIPTION MISSING";

static MISSING_W: LazyLock<Vec<u16>> = LazyLock::new(|| {
    MISSING_DESCRIPTION
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect()
});

/// Returns true if `code` carries the SimCAN error range marker.
///
/// This is a mask test, so some values outside the 48 known codes also pass.
/// Use [can_error_msg] or [CanErrorCode::from_repr] to check for a known code.
pub fn is_can_error(code: u32) -> bool {
    code & CAN_ERROR_MSG_BASE == CAN_ERROR_MSG_BASE
}

fn known(code: u32) -> Option<CanErrorCode> {
    if is_can_error(code) {
        CanErrorCode::from_repr(code)
    } else {
        None
    }
}

/// Human readable description of a SimCAN error code
pub fn can_error_msg(code: u32) -> &'static str {
    known(code)
        .and_then(|c| MESSAGES_A.get(c.offset()))
        .and_then(|s| s.to_str().ok())
        .unwrap_or(MISSING_DESCRIPTION)
}

/// Narrow, nul terminated description of a SimCAN error code
pub fn can_error_msg_a(code: u32) -> &'static CStr {
    known(code)
        .and_then(|c| MESSAGES_A.get(c.offset()))
        .map(|s| s.as_c_str())
        .unwrap_or(MISSING_A)
}

/// Wide (UTF-16), nul terminated description of a SimCAN error code
pub fn can_error_msg_w(code: u32) -> &'static [u16] {
    known(code)
        .and_then(|c| MESSAGES_W.get(c.offset()))
        .map(|s| s.as_slice())
        .unwrap_or(MISSING_W.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense() {
        assert_eq!(CanErrorCode::iter().count(), CAN_ERROR_COUNT);
        for (idx, code) in CanErrorCode::iter().enumerate() {
            assert_eq!(code.offset(), idx, "{code:?} out of order");
        }
    }

    #[test]
    fn range_check() {
        assert!(is_can_error(0x1F00));
        assert!(is_can_error(0x1F2F));
        assert!(!is_can_error(0));
        assert!(!is_can_error(126));
        // Mask semantics, not a bounds check
        assert!(is_can_error(0x3F00));
        assert_eq!(can_error_msg(0x3F00), "ERROR DESCRIPTION MISSING");
    }

    #[test]
    fn messages() {
        assert_eq!(can_error_msg(0x1F0A), "Bus off, the driver can not sense a net.");
        assert_eq!(
            can_error_msg(CanErrorCode::AlreadyInitiated as u32),
            "The process was already initiated."
        );
        assert_eq!(can_error_msg(0x1F30), "ERROR DESCRIPTION MISSING");
        assert_eq!(can_error_msg(5), "ERROR DESCRIPTION MISSING");
        assert_eq!(
            can_error_msg_a(0x1F15).to_str().unwrap(),
            "Failed to validate license."
        );
    }

    #[test]
    fn wide_matches_narrow() {
        for code in CanErrorCode::iter() {
            let w = can_error_msg_w(code.repr());
            assert_eq!(w.last(), Some(&0));
            let decoded = String::from_utf16(&w[..w.len() - 1]).unwrap();
            assert_eq!(decoded, can_error_msg(code.repr()));
        }
        let missing = can_error_msg_w(1);
        assert_eq!(String::from_utf16_lossy(&missing[..missing.len() - 1]), MISSING_DESCRIPTION);
    }

    #[test]
    fn kvaser_alias() {
        assert_eq!(CanErrorCode::KVASER.repr(), CAN_ERROR_MSG_BASE + 31);
    }
}
