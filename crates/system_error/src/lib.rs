#![no_std]

use num_derive::{FromPrimitive, ToPrimitive};

/// Kernel-wide error type, modeled after POSIX errno values.
///
/// Every fallible operation in this repository returns `Result<T, SystemError>`.
/// Lower layers (bitmap, radix tree) return sentinel / small integer failures;
/// this is the error type the interrupt core converts them into.
#[repr(i32)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
#[allow(dead_code, non_camel_case_types)]
pub enum SystemError {
    /// Operation not permitted.
    EPERM = 1,
    /// No such file or directory.
    ENOENT = 2,
    /// No such process.
    ESRCH = 3,
    /// Interrupted function.
    EINTR = 4,
    /// I/O error.
    EIO = 5,
    /// No such device or address.
    ENXIO = 6,
    /// Bad file descriptor.
    EBADF = 9,
    /// Resource temporarily unavailable.
    EAGAIN = 11,
    /// Not enough memory.
    ENOMEM = 12,
    /// Permission denied.
    EACCES = 13,
    /// Bad address.
    EFAULT = 14,
    /// Device or resource busy.
    EBUSY = 16,
    /// File exists.
    EEXIST = 17,
    /// No such device.
    ENODEV = 19,
    /// Invalid argument.
    EINVAL = 22,
    /// Too many open files.
    EMFILE = 24,
    /// Function not supported.
    ENOSYS = 38,
    /// No message of the desired type.
    ENOMSG = 42,
    /// Resource deadlock would occur.
    EDEADLK = 35,
    /// Math result not representable / out of range.
    ERANGE = 34,
    /// Connection refused.
    ECONNREFUSED = 111,
    /// Operation already in progress.
    EALREADY = 114,
    /// Operation in progress.
    EINPROGRESS = 115,
    /// Operation canceled.
    ECANCELED = 125,
    /// The transport endpoint is not connected.
    ENOTCONN = 107,
    /// Previous owner died (used for inconsistent lock-protected state).
    EOWNERDEAD = 130,
}

impl SystemError {
    /// Converts a POSIX-style negative errno into a `SystemError`.
    pub fn from_posix_errno(errno: i32) -> Option<SystemError> {
        if errno >= 0 {
            return None;
        }
        <Self as num_traits::FromPrimitive>::from_i32(-errno)
    }

    /// Converts this error into a negative POSIX errno.
    pub fn to_posix_errno(&self) -> i32 {
        -<Self as num_traits::ToPrimitive>::to_i32(self).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_posix_errno() {
        assert_eq!(SystemError::EPERM.to_posix_errno(), -1);
        assert_eq!(SystemError::from_posix_errno(-22), Some(SystemError::EINVAL));
        assert_eq!(SystemError::from_posix_errno(22), None);
    }
}
