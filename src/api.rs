//! The SimCAN vendor API, one method per entry point.
//!
//! Arguments and return values are the raw ABI values. Implementations
//! forward them as is; only failures to reach the vendor at all are reported
//! through [ShimResult]. A vendor `FALSE` is an `Ok(FALSE)`, with the detail
//! left in the platform last error.

use crate::{
    ShimResult,
    types::{
        Bool, CanFrameType, CanHandle, CanMsg, CanMsgId, CanProperties, CanStatistics,
        CanTimeStamp, Dword, Handle, Long, SimCanRmr, Ulong,
    },
};

/// Vendor capability interface
pub trait SimCanApi {
    /// `SimCanInit`
    fn init(&self) -> ShimResult<Bool>;

    /// `SimCanShutDown`
    fn shut_down(&self) -> ShimResult<Bool>;

    /// `SimCanOpen`. Returns 0 on failure
    fn open(&self, net_index: Long) -> ShimResult<CanHandle>;

    /// `SimCanClose`
    fn close(&self, handle: CanHandle) -> ShimResult<Bool>;

    /// `SimCanSend`
    ///
    /// # Safety
    /// `msg` must be valid for reads of a [CanMsg] or be whatever the vendor
    /// accepts.
    unsafe fn send(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
        rtr: Bool,
    ) -> ShimResult<Bool>;

    /// `SimCanReceive`
    ///
    /// `msg_sel` may be null to receive any id. Otherwise its first element
    /// holds the number of ids that follow, negated to exclude them.
    ///
    /// # Safety
    /// All pointers must satisfy the vendor's contract for `SimCanReceive`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn receive(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        msg_sel: *mut CanMsgId,
        frame_type_sel: CanFrameType,
        frame_type: *mut CanFrameType,
        milliseconds: Dword,
    ) -> ShimResult<Bool>;

    /// `SimCanAddRemoteReply`
    ///
    /// # Safety
    /// `msg` must be valid for reads of a [CanMsg].
    unsafe fn add_remote_reply(
        &self,
        handle: CanHandle,
        msg: *mut CanMsg,
        data_length: Dword,
    ) -> ShimResult<Bool>;

    /// `SimCanRemoveRemoteReply`
    fn remove_remote_reply(&self, handle: CanHandle, id: CanMsgId) -> ShimResult<Bool>;

    /// `SimCanEnumRemoteReply`. Returns a Win32 error code,
    /// `ERROR_NO_MORE_ITEMS` once `index` runs past the last reply.
    ///
    /// # Safety
    /// Output pointers must be valid for writes.
    unsafe fn enum_remote_reply(
        &self,
        handle: CanHandle,
        index: Ulong,
        msg: *mut CanMsg,
        data_length: *mut Dword,
        frame_type: *mut CanFrameType,
    ) -> ShimResult<Dword>;

    /// `SimCanGetStatistics`
    ///
    /// # Safety
    /// `statistics` must be valid for writes.
    unsafe fn get_statistics(
        &self,
        handle: CanHandle,
        statistics: *mut CanStatistics,
    ) -> ShimResult<Bool>;

    /// `SimCanGetLastTimeStamp`
    ///
    /// # Safety
    /// `time_stamp` must be valid for writes.
    unsafe fn get_last_time_stamp(
        &self,
        handle: CanHandle,
        time_stamp: *mut CanTimeStamp,
    ) -> ShimResult<Bool>;

    /// `SimCanGetProperties`
    ///
    /// # Safety
    /// `properties` must be valid for writes.
    unsafe fn get_properties(
        &self,
        handle: CanHandle,
        properties: *mut CanProperties,
    ) -> ShimResult<Bool>;

    /// `SimCanRegisterRmrCallBack`
    fn register_rmr_callback(
        &self,
        handle: CanHandle,
        callback: Option<SimCanRmr>,
    ) -> ShimResult<Bool>;

    /// `SimCanGetDeviceHandle`
    fn get_device_handle(&self, handle: CanHandle) -> ShimResult<Handle>;
}
