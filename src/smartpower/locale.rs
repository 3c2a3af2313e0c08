//! Scoped protection of the process locale
//!
//! hidapi's initialisation calls `setlocale(LC_ALL, "")` when it first runs,
//! switching the process to the user's environment locale. [`LocaleGuard`]
//! records the locale in force before the call and puts it back on drop, so
//! opening the meter leaves the process in the neutral locale it started in.

use std::ffi::{CStr, CString};

/// Restores the captured `LC_ALL` locale when dropped
pub struct LocaleGuard {
    saved: Option<CString>,
}

impl LocaleGuard {
    pub fn capture() -> Self {
        Self { saved: current() }
    }
}

/// Current `LC_ALL` locale name
pub fn current() -> Option<CString> {
    // SAFETY: a NULL locale only queries; the returned string is copied
    // before any other setlocale call can invalidate it
    unsafe {
        let name = libc::setlocale(libc::LC_ALL, std::ptr::null());
        (!name.is_null()).then(|| CStr::from_ptr(name).to_owned())
    }
}

impl Drop for LocaleGuard {
    fn drop(&mut self) {
        let neutral = c"C";
        let target = self.saved.as_deref().unwrap_or(neutral);
        // SAFETY: target is a valid NUL-terminated string for the call
        unsafe {
            libc::setlocale(libc::LC_ALL, target.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test touching the process locale.
    #[test]
    fn test_guard_restores_locale() {
        let before = current();
        {
            let _guard = LocaleGuard::capture();
            // SAFETY: valid NUL-terminated locale name
            unsafe {
                libc::setlocale(libc::LC_ALL, c"POSIX".as_ptr());
            }
        }
        assert_eq!(current(), before);
    }
}
