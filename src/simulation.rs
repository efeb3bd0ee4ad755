//! Simulated SimCAN library for testing the shim without the vendor binary
//!
//! Keeps just enough state to answer every entry point plausibly: open
//! handles, a transmit log, a receive queue and remote replies. Message
//! selection on receive is not modelled; the next queued frame is returned.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    ShimResult,
    api::SimCanApi,
    binding::EntryPoint,
    error_codes::CanErrorCode,
    last_error::{
        self, ERROR_INVALID_PARAMETER, ERROR_NO_MORE_ITEMS, ERROR_NOT_FOUND, ERROR_SUCCESS,
        ERROR_TIMEOUT,
    },
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, FALSE, Handle, INVALID_HANDLE_VALUE, Long, SimCanRmr, TRUE, Ulong,
    },
};

/// Largest standard (11 bit) identifier
const MAX_STANDARD_ID: CanMsgId = 0x7FF;

#[derive(Debug, Default)]
struct SimState {
    calls: HashMap<EntryPoint, usize>,
    initiated: bool,
    init_error: Option<u32>,
    next_handle: CanHandle,
    open: HashMap<CanHandle, Long>,
    opened_nets: Vec<Long>,
    sent: Vec<(CanHandle, CanMsg, Dword, bool)>,
    rx_queue: VecDeque<(CanMsg, Dword, CanFrameType)>,
    remote_replies: Vec<(CanHandle, CanMsg, Dword)>,
    statistics: CanStatistics,
    last_time_stamp: CanTimeStamp,
    rmr_callbacks: HashMap<CanHandle, SimCanRmr>,
}

impl SimState {
    fn record(&mut self, entry: EntryPoint) {
        *self.calls.entry(entry).or_default() += 1;
    }

    fn check_handle(&self, handle: CanHandle) -> bool {
        if self.open.contains_key(&handle) {
            true
        } else {
            last_error::set(CanErrorCode::WrongHandle as u32);
            false
        }
    }
}

fn fail(code: u32) -> Bool {
    last_error::set(code);
    FALSE
}

fn frame_type_of(id: CanMsgId) -> CanFrameType {
    if id > MAX_STANDARD_ID {
        CanFrameType::EXTENDED
    } else {
        CanFrameType::STANDARD
    }
}

/// In-memory [SimCanApi]
#[derive(Debug, Default)]
pub struct SimulatedSimCan {
    state: Mutex<SimState>,
}

impl SimulatedSimCan {
    /// Fresh, uninitialized simulation
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of calls made to `entry`
    pub fn calls(&self, entry: EntryPoint) -> usize {
        self.state().calls.get(&entry).copied().unwrap_or(0)
    }

    /// Number of calls made to any entry point
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Makes `SimCanInit` fail with `code` until cleared with [Self::clear_init_failure]
    pub fn fail_init(&self, code: u32) {
        self.state().init_error = Some(code);
    }

    /// Lets `SimCanInit` succeed again
    pub fn clear_init_failure(&self) {
        self.state().init_error = None;
    }

    /// Net indexes passed to `SimCanOpen`, in call order
    pub fn opened_nets(&self) -> Vec<Long> {
        self.state().opened_nets.clone()
    }

    /// Messages passed to `SimCanSend` as (handle, message, length, rtr)
    pub fn sent(&self) -> Vec<(CanHandle, CanMsg, Dword, bool)> {
        self.state().sent.clone()
    }

    /// Queues a frame for the next `SimCanReceive`
    pub fn push_rx(&self, msg: CanMsg, data_length: Dword, frame_type: CanFrameType) {
        self.state().rx_queue.push_back((msg, data_length, frame_type));
    }

    /// Sets the counters returned by `SimCanGetStatistics`
    pub fn set_statistics(&self, statistics: CanStatistics) {
        self.state().statistics = statistics;
    }

    /// Sets the value returned by `SimCanGetLastTimeStamp`
    pub fn set_last_time_stamp(&self, ts: u64) {
        self.state().last_time_stamp = ts.into();
    }

    /// Is a remote frame callback registered for `handle`?
    pub fn has_rmr_callback(&self, handle: CanHandle) -> bool {
        self.state().rmr_callbacks.contains_key(&handle)
    }
}

impl SimCanApi for SimulatedSimCan {
    fn init(&self) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::Init);
        if let Some(code) = st.init_error {
            return Ok(fail(code));
        }
        if st.initiated {
            return Ok(fail(CanErrorCode::AlreadyInitiated as u32));
        }
        st.initiated = true;
        Ok(TRUE)
    }

    fn shut_down(&self) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::ShutDown);
        st.initiated = false;
        st.open.clear();
        st.rmr_callbacks.clear();
        Ok(TRUE)
    }

    fn open(&self, net_index: Long) -> ShimResult<CanHandle> {
        let mut st = self.state();
        st.record(EntryPoint::Open);
        if !st.initiated {
            fail(CanErrorCode::NotInitialized as u32);
            return Ok(0);
        }
        if net_index <= 0 {
            fail(CanErrorCode::NullNet as u32);
            return Ok(0);
        }
        st.next_handle += 1;
        let handle = st.next_handle;
        st.open.insert(handle, net_index);
        st.opened_nets.push(net_index);
        Ok(handle)
    }

    fn close(&self, handle: CanHandle) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::Close);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        st.open.remove(&handle);
        st.remote_replies.retain(|(h, _, _)| *h != handle);
        st.rmr_callbacks.remove(&handle);
        Ok(TRUE)
    }

    unsafe fn send(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
        rtr: Bool,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::Send);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        let Some(msg) = (unsafe { msg.as_ref() }) else {
            return Ok(fail(ERROR_INVALID_PARAMETER));
        };
        st.sent.push((handle, *msg, data_length, rtr != FALSE));
        st.statistics.tx_msg_cntr = st.statistics.tx_msg_cntr.wrapping_add(1);
        st.statistics.tx_data_cntr = st.statistics.tx_data_cntr.wrapping_add(data_length);
        Ok(TRUE)
    }

    unsafe fn receive(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        _msg_sel: *mut CanMsgId,
        _frame_type_sel: CanFrameType,
        frame_type: *mut CanFrameType,
        _milliseconds: Dword,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::Receive);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        if msg.is_null() {
            return Ok(fail(ERROR_INVALID_PARAMETER));
        }
        let Some((m, len, ft)) = st.rx_queue.pop_front() else {
            return Ok(fail(ERROR_TIMEOUT));
        };
        unsafe {
            *msg = m;
            if let Some(l) = data_length.as_mut() {
                *l = len;
            }
            if let Some(f) = frame_type.as_mut() {
                *f = ft;
            }
        }
        st.statistics.rx_msg_cntr = st.statistics.rx_msg_cntr.wrapping_add(1);
        st.statistics.rx_data_cntr = st.statistics.rx_data_cntr.wrapping_add(len);
        Ok(TRUE)
    }

    unsafe fn add_remote_reply(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::AddRemoteReply);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        let Some(msg) = (unsafe { msg.as_ref() }) else {
            return Ok(fail(ERROR_INVALID_PARAMETER));
        };
        let msg = *msg;
        st.remote_replies
            .retain(|(h, m, _)| !(*h == handle && m.id == msg.id));
        st.remote_replies.push((handle, msg, data_length));
        Ok(TRUE)
    }

    fn remove_remote_reply(&self, handle: CanHandle, id: CanMsgId) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::RemoveRemoteReply);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        let before = st.remote_replies.len();
        st.remote_replies
            .retain(|(h, m, _)| !(*h == handle && m.id == id));
        if st.remote_replies.len() == before {
            Ok(fail(ERROR_NOT_FOUND))
        } else {
            Ok(TRUE)
        }
    }

    unsafe fn enum_remote_reply(
        &self,
        handle: CanHandle,
        index: Ulong,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        frame_type: *mut CanFrameType,
    ) -> ShimResult<Dword> {
        let mut st = self.state();
        st.record(EntryPoint::EnumRemoteReply);
        if !st.check_handle(handle) {
            return Ok(CanErrorCode::WrongHandle as u32);
        }
        let Some((_, m, len)) = st
            .remote_replies
            .iter()
            .filter(|(h, _, _)| *h == handle)
            .nth(index as usize)
        else {
            return Ok(ERROR_NO_MORE_ITEMS);
        };
        unsafe {
            if let Some(out) = msg.as_mut() {
                *out = *m;
            }
            if let Some(l) = data_length.as_mut() {
                *l = *len;
            }
            if let Some(f) = frame_type.as_mut() {
                *f = frame_type_of(m.id) | CanFrameType::REMOTE;
            }
        }
        Ok(ERROR_SUCCESS)
    }

    unsafe fn get_statistics(
        &self,
        handle: CanHandle,
        statistics: *mut CanStatistics,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::GetStatistics);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        match unsafe { statistics.as_mut() } {
            Some(out) => {
                *out = st.statistics;
                Ok(TRUE)
            }
            None => Ok(fail(ERROR_INVALID_PARAMETER)),
        }
    }

    unsafe fn get_last_time_stamp(
        &self,
        handle: CanHandle,
        time_stamp: *mut CanTimeStamp,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::GetLastTimeStamp);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        match unsafe { time_stamp.as_mut() } {
            Some(out) => {
                *out = st.last_time_stamp;
                Ok(TRUE)
            }
            None => Ok(fail(ERROR_INVALID_PARAMETER)),
        }
    }

    unsafe fn get_properties(
        &self,
        handle: CanHandle,
        properties: *mut CanProperties,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::GetProperties);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        match unsafe { properties.as_mut() } {
            Some(out) => {
                *out = CanProperties {
                    interface_types: 0x1,
                    frame_types: CanFrameType::all().bits(),
                };
                Ok(TRUE)
            }
            None => Ok(fail(ERROR_INVALID_PARAMETER)),
        }
    }

    fn register_rmr_callback(
        &self,
        handle: CanHandle,
        callback: Option<SimCanRmr>,
    ) -> ShimResult<Bool> {
        let mut st = self.state();
        st.record(EntryPoint::RegisterRmrCallBack);
        if !st.check_handle(handle) {
            return Ok(FALSE);
        }
        match callback {
            Some(cb) => st.rmr_callbacks.insert(handle, cb),
            None => st.rmr_callbacks.remove(&handle),
        };
        Ok(TRUE)
    }

    fn get_device_handle(&self, handle: CanHandle) -> ShimResult<Handle> {
        let mut st = self.state();
        st.record(EntryPoint::GetDeviceHandle);
        if !st.check_handle(handle) {
            return Ok(INVALID_HANDLE_VALUE);
        }
        // Any stable non-null value will do
        Ok(handle as usize as Handle)
    }
}
