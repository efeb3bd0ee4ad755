use std::cell::RefCell;

use simcan_shim::{
    ShimError, ShimResult, SimCanApi, SimCanShim,
    binding::EntryPoint,
    error_codes::CanErrorCode,
    last_error,
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, FALSE, Handle, Long, SimCanRmr, TRUE, Ulong,
    },
};

/// Vendor stand-in that only logs which entry points were reached
#[derive(Debug, Default)]
pub struct TracingApi {
    log: RefCell<Vec<EntryPoint>>,
    failing: Option<EntryPoint>,
    // `SimCanInit` says FALSE but leaves the last error alone
    silent_init_failure: bool,
}

impl TracingApi {
    fn hit(&self, entry: EntryPoint) -> ShimResult<()> {
        self.log.borrow_mut().push(entry);
        if self.failing == Some(entry) {
            Err(ShimError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

impl SimCanApi for TracingApi {
    fn init(&self) -> ShimResult<Bool> {
        self.hit(EntryPoint::Init)
            .map(|_| if self.silent_init_failure { FALSE } else { TRUE })
    }

    fn shut_down(&self) -> ShimResult<Bool> {
        self.hit(EntryPoint::ShutDown).map(|_| TRUE)
    }

    fn open(&self, net_index: Long) -> ShimResult<CanHandle> {
        self.hit(EntryPoint::Open).map(|_| net_index * 10)
    }

    fn close(&self, _handle: CanHandle) -> ShimResult<Bool> {
        self.hit(EntryPoint::Close).map(|_| TRUE)
    }

    unsafe fn send(&self, _: CanHandle, _: *mut CanMsg, _: Dword, _: Bool) -> ShimResult<Bool> {
        self.hit(EntryPoint::Send).map(|_| TRUE)
    }

    unsafe fn receive(
        &self,
        _: CanHandle,
        _: *mut CanMsg,
        _: *mut Dword,
        _: *mut CanMsgId,
        _: CanFrameType,
        _: *mut CanFrameType,
        _: Dword,
    ) -> ShimResult<Bool> {
        self.hit(EntryPoint::Receive).map(|_| TRUE)
    }

    unsafe fn add_remote_reply(&self, _: CanHandle, _: *mut CanMsg, _: Dword) -> ShimResult<Bool> {
        self.hit(EntryPoint::AddRemoteReply).map(|_| TRUE)
    }

    fn remove_remote_reply(&self, _: CanHandle, _: CanMsgId) -> ShimResult<Bool> {
        self.hit(EntryPoint::RemoveRemoteReply).map(|_| TRUE)
    }

    unsafe fn enum_remote_reply(
        &self,
        _: CanHandle,
        _: Ulong,
        _: *mut CanMsg,
        _: *mut Dword,
        _: *mut CanFrameType,
    ) -> ShimResult<Dword> {
        self.hit(EntryPoint::EnumRemoteReply).map(|_| 0)
    }

    unsafe fn get_statistics(&self, _: CanHandle, _: *mut CanStatistics) -> ShimResult<Bool> {
        self.hit(EntryPoint::GetStatistics).map(|_| TRUE)
    }

    unsafe fn get_last_time_stamp(&self, _: CanHandle, _: *mut CanTimeStamp) -> ShimResult<Bool> {
        self.hit(EntryPoint::GetLastTimeStamp).map(|_| TRUE)
    }

    unsafe fn get_properties(&self, _: CanHandle, _: *mut CanProperties) -> ShimResult<Bool> {
        self.hit(EntryPoint::GetProperties).map(|_| TRUE)
    }

    fn register_rmr_callback(&self, _: CanHandle, _: Option<SimCanRmr>) -> ShimResult<Bool> {
        self.hit(EntryPoint::RegisterRmrCallBack).map(|_| TRUE)
    }

    fn get_device_handle(&self, _: CanHandle) -> ShimResult<Handle> {
        self.hit(EntryPoint::GetDeviceHandle)
            .map(|_| std::ptr::null_mut())
    }
}

#[test]
fn open_then_forward() {
    let shim = SimCanShim::new(TracingApi::default());
    assert!(matches!(shim.close(1), Err(ShimError::NotInitialized)));
    assert!(shim.api().log.borrow().is_empty());

    let h = shim.open("CAN7").unwrap();
    assert_eq!(h, 70);
    assert_eq!(shim.close(h).unwrap(), TRUE);
    assert_eq!(shim.remove_remote_reply(h, 0x10).unwrap(), TRUE);
    assert_eq!(
        *shim.api().log.borrow(),
        vec![
            EntryPoint::Init,
            EntryPoint::Open,
            EntryPoint::Close,
            EntryPoint::RemoveRemoteReply
        ]
    );
}

#[test]
fn api_failure_aborts_call() {
    let shim = SimCanShim::new(TracingApi {
        failing: Some(EntryPoint::Open),
        ..Default::default()
    });
    assert!(shim.open("CAN1").is_err());
    // Init went through, so later forwarding is allowed
    assert!(shim.is_initialized());
    assert_eq!(shim.get_device_handle(1).unwrap(), std::ptr::null_mut());
}

#[test]
fn init_failure_stops_open() {
    let shim = SimCanShim::new(TracingApi {
        failing: Some(EntryPoint::Init),
        ..Default::default()
    });
    assert!(shim.open("CAN1").is_err());
    assert!(!shim.is_initialized());
    assert_eq!(*shim.api().log.borrow(), vec![EntryPoint::Init]);
}

#[test]
fn silent_init_failure_ignores_stale_already_initiated() {
    let shim = SimCanShim::new(TracingApi {
        silent_init_failure: true,
        ..Default::default()
    });
    // Left over from an unrelated earlier call on this thread
    last_error::set(CanErrorCode::AlreadyInitiated as u32);
    match shim.open("CAN7") {
        Err(ShimError::InitFailed { code }) => assert_eq!(code, CanErrorCode::Fail as u32),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!shim.is_initialized());
    assert_eq!(*shim.api().log.borrow(), vec![EntryPoint::Init]);
}

#[test]
fn silent_init_failure_never_reports_success() {
    let shim = SimCanShim::new(TracingApi {
        silent_init_failure: true,
        ..Default::default()
    });
    last_error::set(last_error::ERROR_SUCCESS);
    let err = shim.open("CAN1").unwrap_err();
    assert_ne!(err.code(), last_error::ERROR_SUCCESS);
    assert_eq!(err.code(), CanErrorCode::Fail as u32);
    assert!(!shim.is_initialized());
}
