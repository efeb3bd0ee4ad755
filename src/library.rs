//! Dynamic loading implementation of [SimCanApi]
//!
//! The library is opened on first use, and every entry point is looked up
//! the first time it is called. Both are kept until the [SimCanLibrary] is
//! dropped.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use once_cell::sync::OnceCell;

use crate::{
    ShimError, ShimResult,
    api::SimCanApi,
    binding::{Binding, EntryPoint},
    config::ShimConfig,
    last_error::{self, ERROR_MOD_NOT_FOUND, ERROR_PROC_NOT_FOUND},
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, Handle, Long, SimCanRmr, Ulong,
    },
};

type InitFn = unsafe extern "system" fn() -> Bool;

type ShutDownFn = unsafe extern "system" fn() -> Bool;

type OpenFn = unsafe extern "system" fn(net_index: Long) -> CanHandle;

type CloseFn = unsafe extern "system" fn(handle: CanHandle) -> Bool;

type SendFn = unsafe extern "system" fn(
    handle: CanHandle,
    msg: *mut CanMsg,
    data_length: Dword,
    rtr: Bool,
) -> Bool;

type ReceiveFn = unsafe extern "system" fn(
    handle: CanHandle,
    msg: *mut CanMsg,
    data_length: *mut Dword,
    msg_sel: *mut CanMsgId,
    frame_type_sel: CanFrameType,
    frame_type: *mut CanFrameType,
    milliseconds: Dword,
) -> Bool;

type AddRemoteReplyFn =
    unsafe extern "system" fn(handle: CanHandle, msg: *mut CanMsg, data_length: Dword) -> Bool;

type RemoveRemoteReplyFn = unsafe extern "system" fn(handle: CanHandle, id: CanMsgId) -> Bool;

type EnumRemoteReplyFn = unsafe extern "system" fn(
    handle: CanHandle,
    index: Ulong,
    msg: *mut CanMsg,
    data_length: *mut Dword,
    frame_type: *mut CanFrameType,
) -> Dword;

type GetStatisticsFn =
    unsafe extern "system" fn(handle: CanHandle, statistics: *mut CanStatistics) -> Bool;

type GetLastTimeStampFn =
    unsafe extern "system" fn(handle: CanHandle, time_stamp: *mut CanTimeStamp) -> Bool;

type GetPropertiesFn =
    unsafe extern "system" fn(handle: CanHandle, properties: *mut CanProperties) -> Bool;

type RegisterRmrCallBackFn =
    unsafe extern "system" fn(handle: CanHandle, callback: Option<SimCanRmr>) -> Bool;

type GetDeviceHandleFn = unsafe extern "system" fn(handle: CanHandle) -> Handle;

/// The SimCAN vendor library, bound lazily
pub struct SimCanLibrary {
    path: PathBuf,
    /// Loaded library. Function pointers below point into it
    lib: OnceCell<Library>,
    init_fn: Binding<InitFn>,
    shut_down_fn: Binding<ShutDownFn>,
    open_fn: Binding<OpenFn>,
    close_fn: Binding<CloseFn>,
    send_fn: Binding<SendFn>,
    receive_fn: Binding<ReceiveFn>,
    add_remote_reply_fn: Binding<AddRemoteReplyFn>,
    remove_remote_reply_fn: Binding<RemoveRemoteReplyFn>,
    enum_remote_reply_fn: Binding<EnumRemoteReplyFn>,
    get_statistics_fn: Binding<GetStatisticsFn>,
    get_last_time_stamp_fn: Binding<GetLastTimeStampFn>,
    get_properties_fn: Binding<GetPropertiesFn>,
    register_rmr_callback_fn: Binding<RegisterRmrCallBackFn>,
    get_device_handle_fn: Binding<GetDeviceHandleFn>,
}

impl fmt::Debug for SimCanLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimCanLibrary")
            .field("path", &self.path)
            .field("library", &self.lib.get())
            .finish()
    }
}

impl Default for SimCanLibrary {
    fn default() -> Self {
        Self::new(ShimConfig::default())
    }
}

impl SimCanLibrary {
    /// Nothing is loaded until the first call
    pub fn new(config: ShimConfig) -> Self {
        Self {
            path: config.library_path,
            lib: OnceCell::new(),
            init_fn: Binding::new(EntryPoint::Init),
            shut_down_fn: Binding::new(EntryPoint::ShutDown),
            open_fn: Binding::new(EntryPoint::Open),
            close_fn: Binding::new(EntryPoint::Close),
            send_fn: Binding::new(EntryPoint::Send),
            receive_fn: Binding::new(EntryPoint::Receive),
            add_remote_reply_fn: Binding::new(EntryPoint::AddRemoteReply),
            remove_remote_reply_fn: Binding::new(EntryPoint::RemoveRemoteReply),
            enum_remote_reply_fn: Binding::new(EntryPoint::EnumRemoteReply),
            get_statistics_fn: Binding::new(EntryPoint::GetStatistics),
            get_last_time_stamp_fn: Binding::new(EntryPoint::GetLastTimeStamp),
            get_properties_fn: Binding::new(EntryPoint::GetProperties),
            register_rmr_callback_fn: Binding::new(EntryPoint::RegisterRmrCallBack),
            get_device_handle_fn: Binding::new(EntryPoint::GetDeviceHandle),
        }
    }

    /// Library path this instance loads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Has the library been opened yet?
    pub fn is_loaded(&self) -> bool {
        self.lib.get().is_some()
    }

    /// Has `entry` been resolved yet?
    pub fn is_bound(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::Init => self.init_fn.is_bound(),
            EntryPoint::ShutDown => self.shut_down_fn.is_bound(),
            EntryPoint::Open => self.open_fn.is_bound(),
            EntryPoint::Close => self.close_fn.is_bound(),
            EntryPoint::Send => self.send_fn.is_bound(),
            EntryPoint::Receive => self.receive_fn.is_bound(),
            EntryPoint::AddRemoteReply => self.add_remote_reply_fn.is_bound(),
            EntryPoint::RemoveRemoteReply => self.remove_remote_reply_fn.is_bound(),
            EntryPoint::EnumRemoteReply => self.enum_remote_reply_fn.is_bound(),
            EntryPoint::GetStatistics => self.get_statistics_fn.is_bound(),
            EntryPoint::GetLastTimeStamp => self.get_last_time_stamp_fn.is_bound(),
            EntryPoint::GetProperties => self.get_properties_fn.is_bound(),
            EntryPoint::RegisterRmrCallBack => self.register_rmr_callback_fn.is_bound(),
            EntryPoint::GetDeviceHandle => self.get_device_handle_fn.is_bound(),
        }
    }

    fn library(&self) -> ShimResult<&Library> {
        self.lib.get_or_try_init(|| {
            log::debug!("Opening function library {}", self.path.display());
            unsafe { Library::new(&self.path) }.map_err(|source| {
                let err = ShimError::LibraryLoad {
                    path: self.path.clone(),
                    code: last_error::os_error_or(ERROR_MOD_NOT_FOUND),
                    source,
                };
                log::error!("{err}");
                err
            })
        })
    }

    /// `T` must be the function pointer type the vendor exports under the
    /// binding's symbol
    fn bind<T: Copy>(&self, binding: &Binding<T>) -> ShimResult<T> {
        binding.get_or_resolve(|entry| {
            let lib = self.library()?;
            let sym = unsafe { lib.get::<T>(entry.symbol().as_bytes()) }.map_err(|source| {
                let err = ShimError::SymbolNotFound {
                    symbol: entry,
                    code: last_error::os_error_or(ERROR_PROC_NOT_FOUND),
                    source,
                };
                log::error!("{err}");
                err
            })?;
            Ok(*sym)
        })
    }
}

impl SimCanApi for SimCanLibrary {
    fn init(&self) -> ShimResult<Bool> {
        let f = self.bind(&self.init_fn)?;
        Ok(unsafe { f() })
    }

    fn shut_down(&self) -> ShimResult<Bool> {
        let f = self.bind(&self.shut_down_fn)?;
        Ok(unsafe { f() })
    }

    fn open(&self, net_index: Long) -> ShimResult<CanHandle> {
        let f = self.bind(&self.open_fn)?;
        Ok(unsafe { f(net_index) })
    }

    fn close(&self, handle: CanHandle) -> ShimResult<Bool> {
        let f = self.bind(&self.close_fn)?;
        Ok(unsafe { f(handle) })
    }

    unsafe fn send(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
        rtr: Bool,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.send_fn)?;
        Ok(unsafe { f(handle, msg, data_length, rtr) })
    }

    unsafe fn receive(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        msg_sel: *mut CanMsgId,
        frame_type_sel: CanFrameType,
        frame_type: *mut CanFrameType,
        milliseconds: Dword,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.receive_fn)?;
        Ok(unsafe {
            f(
                handle,
                msg,
                data_length,
                msg_sel,
                frame_type_sel,
                frame_type,
                milliseconds,
            )
        })
    }

    unsafe fn add_remote_reply(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.add_remote_reply_fn)?;
        Ok(unsafe { f(handle, msg, data_length) })
    }

    fn remove_remote_reply(&self, handle: CanHandle, id: CanMsgId) -> ShimResult<Bool> {
        let f = self.bind(&self.remove_remote_reply_fn)?;
        Ok(unsafe { f(handle, id) })
    }

    unsafe fn enum_remote_reply(
        &self,
        handle: CanHandle,
        index: Ulong,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        frame_type: *mut CanFrameType,
    ) -> ShimResult<Dword> {
        let f = self.bind(&self.enum_remote_reply_fn)?;
        Ok(unsafe { f(handle, index, msg, data_length, frame_type) })
    }

    unsafe fn get_statistics(
        &self,
        handle: CanHandle,
        statistics: *mut CanStatistics,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.get_statistics_fn)?;
        Ok(unsafe { f(handle, statistics) })
    }

    unsafe fn get_last_time_stamp(
        &self,
        handle: CanHandle,
        time_stamp: *mut CanTimeStamp,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.get_last_time_stamp_fn)?;
        Ok(unsafe { f(handle, time_stamp) })
    }

    unsafe fn get_properties(
        &self,
        handle: CanHandle,
        properties: *mut CanProperties,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.get_properties_fn)?;
        Ok(unsafe { f(handle, properties) })
    }

    fn register_rmr_callback(
        &self,
        handle: CanHandle,
        callback: Option<SimCanRmr>,
    ) -> ShimResult<Bool> {
        let f = self.bind(&self.register_rmr_callback_fn)?;
        Ok(unsafe { f(handle, callback) })
    }

    fn get_device_handle(&self, handle: CanHandle) -> ShimResult<Handle> {
        let f = self.bind(&self.get_device_handle_fn)?;
        Ok(unsafe { f(handle) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_loaded_up_front() {
        let lib = SimCanLibrary::new(ShimConfig::with_library_path("/nonexistent/libSimCan.so"));
        assert!(!lib.is_loaded());
        assert!(!lib.is_bound(EntryPoint::Init));
        assert_eq!(lib.path(), Path::new("/nonexistent/libSimCan.so"));
    }

    #[test]
    fn missing_library() {
        let _ = env_logger::builder().is_test(true).try_init();
        let lib = SimCanLibrary::new(ShimConfig::with_library_path("/nonexistent/libSimCan.so"));
        for _ in 0..2 {
            match lib.init() {
                Err(e @ ShimError::LibraryLoad { .. }) => {
                    if cfg!(not(windows)) {
                        assert_eq!(e.code(), ERROR_MOD_NOT_FOUND);
                    }
                }
                other => panic!("expected load failure, got {other:?}"),
            }
            assert!(!lib.is_loaded());
            assert!(!lib.is_bound(EntryPoint::Init));
        }
        assert!(matches!(lib.close(1), Err(ShimError::LibraryLoad { .. })));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn missing_symbol() {
        let _ = env_logger::builder().is_test(true).try_init();
        // Any library that is always present but does not export SimCan*
        let lib = SimCanLibrary::new(ShimConfig::with_library_path("libc.so.6"));
        match lib.open(1) {
            Err(e @ ShimError::SymbolNotFound { symbol: EntryPoint::Open, .. }) => {
                assert_eq!(e.code(), ERROR_PROC_NOT_FOUND);
            }
            other => panic!("expected missing symbol, got {other:?}"),
        }
        // Library stays loaded, the symbol does not get cached
        assert!(lib.is_loaded());
        assert!(!lib.is_bound(EntryPoint::Open));
        assert!(matches!(
            lib.get_device_handle(1),
            Err(ShimError::SymbolNotFound { symbol: EntryPoint::GetDeviceHandle, .. })
        ));
    }
}
