//! Memoized lazy symbol binding

use once_cell::sync::OnceCell;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::ShimResult;

/// Vendor library entry points. The string form is the exported symbol name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, EnumIter)]
#[allow(missing_docs)]
pub enum EntryPoint {
    #[strum(serialize = "SimCanInit")]
    Init,
    #[strum(serialize = "SimCanShutDown")]
    ShutDown,
    #[strum(serialize = "SimCanOpen")]
    Open,
    #[strum(serialize = "SimCanClose")]
    Close,
    #[strum(serialize = "SimCanSend")]
    Send,
    #[strum(serialize = "SimCanReceive")]
    Receive,
    #[strum(serialize = "SimCanAddRemoteReply")]
    AddRemoteReply,
    #[strum(serialize = "SimCanRemoveRemoteReply")]
    RemoveRemoteReply,
    #[strum(serialize = "SimCanEnumRemoteReply")]
    EnumRemoteReply,
    #[strum(serialize = "SimCanGetStatistics")]
    GetStatistics,
    #[strum(serialize = "SimCanGetLastTimeStamp")]
    GetLastTimeStamp,
    #[strum(serialize = "SimCanGetProperties")]
    GetProperties,
    #[strum(serialize = "SimCanRegisterRmrCallBack")]
    RegisterRmrCallBack,
    #[strum(serialize = "SimCanGetDeviceHandle")]
    GetDeviceHandle,
}

impl EntryPoint {
    /// Exported symbol name
    pub fn symbol(&self) -> &'static str {
        self.into()
    }
}

/// A single entry point, resolved on first use and then kept.
///
/// Failed resolutions are not stored, so a later call tries again.
pub struct Binding<T> {
    entry: EntryPoint,
    cell: OnceCell<T>,
}

impl<T: Copy> Binding<T> {
    /// Unresolved binding for `entry`
    pub const fn new(entry: EntryPoint) -> Self {
        Self {
            entry,
            cell: OnceCell::new(),
        }
    }

    /// Entry point this binding is for
    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    /// Is the entry point resolved?
    pub fn is_bound(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the cached value, or runs `resolve` once to produce it.
    pub fn get_or_resolve<F>(&self, resolve: F) -> ShimResult<T>
    where
        F: FnOnce(EntryPoint) -> ShimResult<T>,
    {
        self.cell
            .get_or_try_init(|| {
                log::trace!("Binding {}", self.entry);
                resolve(self.entry)
            })
            .copied()
    }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("entry", &self.entry)
            .field("bound", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use strum::IntoEnumIterator;

    use super::*;
    use crate::ShimError;

    #[test]
    fn symbol_names() {
        assert_eq!(EntryPoint::Init.symbol(), "SimCanInit");
        assert_eq!(EntryPoint::RegisterRmrCallBack.symbol(), "SimCanRegisterRmrCallBack");
        assert_eq!(EntryPoint::GetDeviceHandle.to_string(), "SimCanGetDeviceHandle");
        assert_eq!(EntryPoint::iter().count(), 14);
        assert!(EntryPoint::iter().all(|e| e.symbol().starts_with("SimCan")));
    }

    #[test]
    fn resolves_once() {
        let calls = Cell::new(0);
        let binding: Binding<u32> = Binding::new(EntryPoint::Send);
        assert!(!binding.is_bound());
        for _ in 0..5 {
            let v = binding.get_or_resolve(|e| {
                assert_eq!(e, EntryPoint::Send);
                calls.set(calls.get() + 1);
                Ok(42)
            });
            assert_eq!(v.unwrap(), 42);
        }
        assert_eq!(calls.get(), 1);
        assert!(binding.is_bound());
    }

    #[test]
    fn failure_is_not_cached() {
        let calls = Cell::new(0);
        let binding: Binding<u32> = Binding::new(EntryPoint::Close);
        let res = binding.get_or_resolve(|_| {
            calls.set(calls.get() + 1);
            Err(ShimError::NotInitialized)
        });
        assert!(matches!(res, Err(ShimError::NotInitialized)));
        assert!(!binding.is_bound());
        let res = binding.get_or_resolve(|_| {
            calls.set(calls.get() + 1);
            Ok(7)
        });
        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }
}
