//! Platform last error.
//!
//! On Windows this is `GetLastError`/`SetLastError`, which the vendor library
//! also writes to. Other targets have no such mechanism so a per-thread value
//! stands in for it, exported to C callers as [crate::ffi::CanGetLastError].

/// The operation completed successfully
pub const ERROR_SUCCESS: u32 = 0;
/// Access is denied
pub const ERROR_ACCESS_DENIED: u32 = 5;
/// The parameter is incorrect
pub const ERROR_INVALID_PARAMETER: u32 = 87;
/// The specified module could not be found
pub const ERROR_MOD_NOT_FOUND: u32 = 126;
/// The specified procedure could not be found
pub const ERROR_PROC_NOT_FOUND: u32 = 127;
/// One or more arguments are not correct
pub const ERROR_BAD_ARGUMENTS: u32 = 160;
/// No more data is available
pub const ERROR_NO_MORE_ITEMS: u32 = 259;
/// Element not found
pub const ERROR_NOT_FOUND: u32 = 1168;
/// This operation returned because the timeout period expired
pub const ERROR_TIMEOUT: u32 = 1460;

#[cfg(windows)]
mod imp {
    use winapi::um::errhandlingapi::{GetLastError, SetLastError};

    pub fn get() -> u32 {
        unsafe { GetLastError() }
    }

    pub fn set(code: u32) {
        unsafe { SetLastError(code) }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::cell::Cell;

    thread_local! {
        static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
    }

    pub fn get() -> u32 {
        LAST_ERROR.with(|e| e.get())
    }

    pub fn set(code: u32) {
        LAST_ERROR.with(|e| e.set(code))
    }
}

/// Reads the calling thread's last error
pub fn get() -> u32 {
    imp::get()
}

/// Sets the calling thread's last error
pub fn set(code: u32) {
    imp::set(code)
}

/// Last error reported by the OS after a failed library call, or `fallback`
/// where the OS does not report one through this mechanism.
pub(crate) fn os_error_or(fallback: u32) -> u32 {
    if cfg!(windows) {
        match get() {
            ERROR_SUCCESS => fallback,
            code => code,
        }
    } else {
        fallback
    }
}
