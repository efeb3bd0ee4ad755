//! Exported C functions.
//!
//! C callers have no way to hand a context in, so the exports share one
//! process wide [SimCanShim] over the dynamically loaded [SimCanLibrary],
//! configured from the environment on first use. Failures are reported as
//! the function's sentinel value with the platform last error set.
//!
//! Callers own every pointer they pass and the shim forwards them untouched
//! to the vendor.

#![allow(non_snake_case)]

use std::ffi::{CStr, c_char};
use std::ptr;
use std::sync::LazyLock;

use crate::{
    ShimConfig, ShimError, ShimResult, SimCanLibrary, SimCanShim,
    error_codes::{can_error_msg_a, can_error_msg_w, is_can_error},
    last_error::{self, ERROR_ACCESS_DENIED},
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, FALSE, Handle, INVALID_HANDLE_VALUE, SimCanRmr, TRUE, Ulong,
    },
};

static SHIM: LazyLock<SimCanShim<SimCanLibrary>> =
    LazyLock::new(|| SimCanShim::new(SimCanLibrary::new(ShimConfig::from_env())));

fn report<T>(export: &str, res: ShimResult<T>, failure: T) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{export} failed: {e}");
            last_error::set(e.code());
            failure
        }
    }
}

/// Length of a nul terminated UTF-16 string
unsafe fn wide_len(p: *const u16) -> usize {
    let mut len = 0;
    while unsafe { *p.add(len) } != 0 {
        len += 1;
    }
    len
}

/// Opens a CAN interface with Normal User privilege.
///
/// `p_net_name` is the net name `CAN1`..`CANn` as an ANSI string. Returns a
/// handle, or 0 on failure with the last error set.
///
/// # Safety
/// `p_net_name` must be null or a valid nul terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanOpenA(p_net_name: *const c_char) -> CanHandle {
    let res = if p_net_name.is_null() {
        Err(ShimError::InvalidNetName("(null)".into()))
    } else {
        SHIM.open_a(unsafe { CStr::from_ptr(p_net_name) })
    };
    report("CanOpenA", res, 0)
}

/// Opens a CAN interface with Normal User privilege.
///
/// `p_net_name` is the net name `CAN1`..`CANn` as a UTF-16 string. Returns a
/// handle, or 0 on failure with the last error set.
///
/// # Safety
/// `p_net_name` must be null or a valid nul terminated UTF-16 string.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanOpenW(p_net_name: *const u16) -> CanHandle {
    let res = if p_net_name.is_null() {
        Err(ShimError::InvalidNetName("(null)".into()))
    } else {
        let name = unsafe { std::slice::from_raw_parts(p_net_name, wide_len(p_net_name)) };
        SHIM.open_w(name)
    };
    report("CanOpenW", res, 0)
}

/// [CanOpenW], as selected by the `unicode` feature
///
/// # Safety
/// See [CanOpenW]
#[cfg(feature = "unicode")]
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanOpen(p_net_name: *const u16) -> CanHandle {
    unsafe { CanOpenW(p_net_name) }
}

/// [CanOpenA], as selected by the absence of the `unicode` feature
///
/// # Safety
/// See [CanOpenA]
#[cfg(not(feature = "unicode"))]
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanOpen(p_net_name: *const c_char) -> CanHandle {
    unsafe { CanOpenA(p_net_name) }
}

/// Shuts the vendor library down. Interfaces must be reopened afterwards.
#[unsafe(no_mangle)]
pub extern "system" fn CanShutDown() -> Bool {
    report("CanShutDown", SHIM.shut_down(), FALSE)
}

/// Closes a CAN interface
#[unsafe(no_mangle)]
pub extern "system" fn CanClose(h_interface: CanHandle) -> Bool {
    report("CanClose", SHIM.close(h_interface), FALSE)
}

/// Sends a message. Set `b_rtr` to send it as a remote frame.
///
/// If the interface was opened with `CanOpen` and the id is outside the
/// Normal User range, the vendor fails with `ERROR_ACCESS_DENIED`.
///
/// # Safety
/// `p_can_msg` must point to a valid [CanMsg].
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanSend(
    h_interface: CanHandle,
    p_can_msg: *mut CanMsg,
    data_length: Dword,
    b_rtr: Bool,
) -> Bool {
    let res = unsafe { SHIM.send(h_interface, p_can_msg, data_length, b_rtr) };
    report("CanSend", res, FALSE)
}

/// Receives a message, waiting at most `milliseconds`.
///
/// `p_can_msg_sel` is null to accept any id, otherwise its first element is
/// the count of ids that follow (negative to exclude them). A zero timeout
/// polls; `INFINITE` waits forever. On timeout the vendor fails with
/// `ERROR_TIMEOUT`.
///
/// # Safety
/// All pointers must satisfy the vendor's `SimCanReceive` contract.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanReceive(
    h_interface: CanHandle,
    p_can_msg: *mut CanMsg,
    p_data_length: *mut Dword,
    p_can_msg_sel: *mut CanMsgId,
    frame_type_sel: CanFrameType,
    p_frame_type: *mut CanFrameType,
    milliseconds: Dword,
) -> Bool {
    let res = unsafe {
        SHIM.receive(
            h_interface,
            p_can_msg,
            p_data_length,
            p_can_msg_sel,
            frame_type_sel,
            p_frame_type,
            milliseconds,
        )
    };
    report("CanReceive", res, FALSE)
}

/// Adds a reply to a received remote frame
///
/// # Safety
/// `p_can_msg` must point to a valid [CanMsg].
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanAddRemoteReply(
    h_interface: CanHandle,
    p_can_msg: *mut CanMsg,
    data_length: Dword,
) -> Bool {
    let res = unsafe { SHIM.add_remote_reply(h_interface, p_can_msg, data_length) };
    report("CanAddRemoteReply", res, FALSE)
}

/// Removes the reply associated with remote frame `id`
#[unsafe(no_mangle)]
pub extern "system" fn CanRemoveRemoteReply(h_interface: CanHandle, id: CanMsgId) -> Bool {
    report(
        "CanRemoveRemoteReply",
        SHIM.remove_remote_reply(h_interface, id),
        FALSE,
    )
}

/// Enumerates remote frame replies, starting at index 0.
///
/// Returns `ERROR_SUCCESS` or an error code, `ERROR_NO_MORE_ITEMS` past the
/// last reply and `ERROR_ACCESS_DENIED` before initialization.
///
/// # Safety
/// Output pointers must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanEnumRemoteReply(
    h_interface: CanHandle,
    index: Ulong,
    p_can_msg: *mut CanMsg,
    p_data_length: *mut Dword,
    p_frame_type: *mut CanFrameType,
) -> Dword {
    let res = unsafe {
        SHIM.enum_remote_reply(h_interface, index, p_can_msg, p_data_length, p_frame_type)
    };
    match res {
        Ok(code) => code,
        Err(ShimError::NotInitialized) => {
            last_error::set(ERROR_ACCESS_DENIED);
            ERROR_ACCESS_DENIED
        }
        Err(e) => {
            let code = e.code();
            report("CanEnumRemoteReply", Err(e), code)
        }
    }
}

/// Copies out performance and error counters
///
/// # Safety
/// `p_statistics` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanGetStatistics(
    h_interface: CanHandle,
    p_statistics: *mut CanStatistics,
) -> Bool {
    let res = unsafe { SHIM.get_statistics(h_interface, p_statistics) };
    report("CanGetStatistics", res, FALSE)
}

/// Copies out the interface properties
///
/// # Safety
/// `p_properties` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanGetProperties(
    h_interface: CanHandle,
    p_properties: *mut CanProperties,
) -> Bool {
    let res = unsafe { SHIM.get_properties(h_interface, p_properties) };
    report("CanGetProperties", res, FALSE)
}

/// Copies out the timestamp of the last received message
///
/// # Safety
/// `p_time_stamp` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn CanGetLastTimeStamp(
    h_interface: CanHandle,
    p_time_stamp: *mut CanTimeStamp,
) -> Bool {
    let res = unsafe { SHIM.get_last_time_stamp(h_interface, p_time_stamp) };
    report("CanGetLastTimeStamp", res, FALSE)
}

/// Handle to the CAN device, for `DeviceIoControl`.
///
/// Null before initialization, `INVALID_HANDLE_VALUE` when the vendor entry
/// point cannot be reached.
#[unsafe(no_mangle)]
pub extern "system" fn CanGetDeviceHandle(h_interface: CanHandle) -> Handle {
    match SHIM.get_device_handle(h_interface) {
        Err(e @ ShimError::NotInitialized) => {
            report("CanGetDeviceHandle", Err(e), ptr::null_mut())
        }
        res => report("CanGetDeviceHandle", res, INVALID_HANDLE_VALUE),
    }
}

/// Registers a callback run whenever a remote frame is received.
///
/// Only works if remote replies are handled in software or the hardware
/// supports remote callbacks.
#[unsafe(no_mangle)]
pub extern "system" fn CanRegisterRmrCallBack(
    h_interface: CanHandle,
    remote_callback: Option<SimCanRmr>,
) -> Bool {
    report(
        "CanRegisterRmrCallBack",
        SHIM.register_rmr_callback(h_interface, remote_callback),
        FALSE,
    )
}

/// Is `code` in the SimCAN error range?
#[unsafe(no_mangle)]
pub extern "system" fn IsCanError(code: Dword) -> Bool {
    if is_can_error(code) { TRUE } else { FALSE }
}

/// ANSI description of a SimCAN error code. The string is static.
#[unsafe(no_mangle)]
pub extern "system" fn CanErrorMsgA(code: Dword) -> *const c_char {
    can_error_msg_a(code).as_ptr()
}

/// UTF-16 description of a SimCAN error code. The string is static.
#[unsafe(no_mangle)]
pub extern "system" fn CanErrorMsgW(code: Dword) -> *const u16 {
    can_error_msg_w(code).as_ptr()
}

/// Last error set by the shim or the vendor on the calling thread.
/// Windows callers use `GetLastError` instead.
#[cfg(not(windows))]
#[unsafe(no_mangle)]
pub extern "system" fn CanGetLastError() -> Dword {
    last_error::get()
}
