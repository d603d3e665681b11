//! Sync status codes.

use std::fmt;

/// Integer outcome of a cache synchronization attempt.
///
/// `0` is success; every other value is a failure or "nothing there".
/// [`SyncStatus::UNSET`] is the value before any attempt has been observed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncStatus(i32);

impl SyncStatus {
    /// The operation succeeded.
    pub const SUCCESS: Self = Self(0);
    /// There was nothing to restore or push.
    pub const MISSING: Self = Self(-1);
    /// No attempt has been observed yet.
    pub const UNSET: Self = Self(-2);
    /// A collaborator failed; the error was logged and folded into this code.
    pub const FAILED: Self = Self(-3);
    /// The cache did not answer within the configured timeout.
    pub const TIMED_OUT: Self = Self(-4);

    /// Creates a status from a raw code.
    #[inline]
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true for [`SyncStatus::SUCCESS`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<i32> for SyncStatus {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<SyncStatus> for i32 {
    fn from(status: SyncStatus) -> Self {
        status.0
    }
}

impl fmt::Debug for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncStatus({self})")
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => write!(f, "success"),
            Self::MISSING => write!(f, "missing"),
            Self::UNSET => write!(f, "unset"),
            Self::FAILED => write!(f, "failed"),
            Self::TIMED_OUT => write!(f, "timed out"),
            Self(code) => write!(f, "code {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unset_and_not_success() {
        let status = SyncStatus::default();
        assert_eq!(status, SyncStatus::UNSET);
        assert!(!status.is_success());
    }

    #[test]
    fn only_zero_is_success() {
        assert!(SyncStatus::from_code(0).is_success());
        assert!(!SyncStatus::from_code(1).is_success());
        assert!(!SyncStatus::MISSING.is_success());
    }

    #[test]
    fn display() {
        assert_eq!(SyncStatus::SUCCESS.to_string(), "success");
        assert_eq!(SyncStatus::from_code(7).to_string(), "code 7");
        assert_eq!(i32::from(SyncStatus::TIMED_OUT), -4);
    }
}
