//! The forwarding context.
//!
//! [SimCanShim] owns a [SimCanApi] implementation and the "initialized" flag.
//! Opening a net initializes the vendor on demand; every other operation is
//! refused until that has happened, without touching the API at all.

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    ShimError, ShimResult,
    api::SimCanApi,
    error_codes::CanErrorCode,
    last_error,
    net_name::{parse_net_name, parse_net_name_bytes, parse_net_name_wide},
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, FALSE, Handle, Long, SimCanRmr, Ulong,
    },
};

/// Lazily initializing front end over a [SimCanApi]
#[derive(Debug)]
pub struct SimCanShim<A: SimCanApi> {
    api: A,
    initialized: AtomicBool,
}

impl<A: SimCanApi> SimCanShim<A> {
    /// Wraps `api`. The vendor is not initialized until the first open
    pub fn new(api: A) -> Self {
        Self {
            api,
            initialized: AtomicBool::new(false),
        }
    }

    /// The underlying API
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Has the vendor been initialized?
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn ensure_initialized(&self) -> ShimResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ShimError::NotInitialized)
        }
    }

    /// Calls `SimCanInit`. A vendor that reports it was already initiated
    /// counts as success.
    pub fn initialize(&self) -> ShimResult<()> {
        // Only a code set by this call may decide the outcome
        last_error::set(last_error::ERROR_SUCCESS);
        if self.api.init()? != FALSE {
            self.initialized.store(true, Ordering::Release);
            return Ok(());
        }
        match last_error::get() {
            code if code == CanErrorCode::AlreadyInitiated as u32 => {
                log::debug!("SimCAN was already initiated");
                self.initialized.store(true, Ordering::Release);
                Ok(())
            }
            last_error::ERROR_SUCCESS => Err(ShimError::InitFailed {
                code: CanErrorCode::Fail as u32,
            }),
            code => Err(ShimError::InitFailed { code }),
        }
    }

    /// Calls `SimCanShutDown`. On success the shim goes back to the
    /// uninitialized state.
    pub fn shut_down(&self) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        let res = self.api.shut_down()?;
        if res != FALSE {
            self.initialized.store(false, Ordering::Release);
        }
        Ok(res)
    }

    /// Opens the net with the given index, initializing first if needed
    pub fn open_index(&self, net_index: Long) -> ShimResult<CanHandle> {
        if !self.is_initialized() {
            self.initialize()?;
        }
        self.api.open(net_index)
    }

    /// Opens a net by name, `"CAN1"`..`"CANn"`
    pub fn open(&self, net_name: &str) -> ShimResult<CanHandle> {
        self.open_index(parse_net_name(net_name)?)
    }

    /// Opens a net by narrow C string name
    pub fn open_a(&self, net_name: &CStr) -> ShimResult<CanHandle> {
        self.open_index(parse_net_name_bytes(net_name.to_bytes())?)
    }

    /// Opens a net by wide (UTF-16) name, without terminator
    pub fn open_w(&self, net_name: &[u16]) -> ShimResult<CanHandle> {
        self.open_index(parse_net_name_wide(net_name)?)
    }

    /// Closes an interface
    pub fn close(&self, handle: CanHandle) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        self.api.close(handle)
    }

    /// Queues a message for transmission
    ///
    /// # Safety
    /// See [SimCanApi::send]
    pub unsafe fn send(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
        rtr: Bool,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe { self.api.send(handle, msg, data_length, rtr) }
    }

    /// Receives a message, waiting up to `milliseconds`
    ///
    /// # Safety
    /// See [SimCanApi::receive]
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn receive(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        msg_sel: *mut CanMsgId,
        frame_type_sel: CanFrameType,
        frame_type: *mut CanFrameType,
        milliseconds: Dword,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe {
            self.api.receive(
                handle,
                msg,
                data_length,
                msg_sel,
                frame_type_sel,
                frame_type,
                milliseconds,
            )
        }
    }

    /// Adds a reply to a remote frame
    ///
    /// # Safety
    /// See [SimCanApi::add_remote_reply]
    pub unsafe fn add_remote_reply(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe { self.api.add_remote_reply(handle, msg, data_length) }
    }

    /// Removes the reply registered for remote frame `id`
    pub fn remove_remote_reply(&self, handle: CanHandle, id: CanMsgId) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        self.api.remove_remote_reply(handle, id)
    }

    /// Reads the remote reply at `index`
    ///
    /// # Safety
    /// See [SimCanApi::enum_remote_reply]
    pub unsafe fn enum_remote_reply(
        &self,
        handle: CanHandle,
        index: Ulong,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        frame_type: *mut CanFrameType,
    ) -> ShimResult<Dword> {
        self.ensure_initialized()?;
        unsafe {
            self.api
                .enum_remote_reply(handle, index, msg, data_length, frame_type)
        }
    }

    /// Copies out the vendor's counters
    ///
    /// # Safety
    /// See [SimCanApi::get_statistics]
    pub unsafe fn get_statistics(
        &self,
        handle: CanHandle,
        statistics: *mut CanStatistics,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe { self.api.get_statistics(handle, statistics) }
    }

    /// Copies out the timestamp of the last received message
    ///
    /// # Safety
    /// See [SimCanApi::get_last_time_stamp]
    pub unsafe fn get_last_time_stamp(
        &self,
        handle: CanHandle,
        time_stamp: *mut CanTimeStamp,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe { self.api.get_last_time_stamp(handle, time_stamp) }
    }

    /// Copies out the interface properties
    ///
    /// # Safety
    /// See [SimCanApi::get_properties]
    pub unsafe fn get_properties(
        &self,
        handle: CanHandle,
        properties: *mut CanProperties,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        unsafe { self.api.get_properties(handle, properties) }
    }

    /// Registers the remote frame callback
    pub fn register_rmr_callback(
        &self,
        handle: CanHandle,
        callback: Option<SimCanRmr>,
    ) -> ShimResult<Bool> {
        self.ensure_initialized()?;
        self.api.register_rmr_callback(handle, callback)
    }

    /// Device handle for `DeviceIoControl`
    pub fn get_device_handle(&self, handle: CanHandle) -> ShimResult<Handle> {
        self.ensure_initialized()?;
        self.api.get_device_handle(handle)
    }
}
