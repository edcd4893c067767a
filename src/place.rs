//! Execution place descriptor

use std::fmt;

/// Where a tensor's buffer lives
///
/// `Host` is ordinary process memory. `Device(n)` is accelerator slot `n`;
/// whether a device place can actually be allocated on depends on the
/// runtimes registered with [`crate::runtime::register`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Place {
    /// Host memory
    #[default]
    Host,
    /// Accelerator device with the given index
    Device(usize),
}

impl Place {
    /// Returns true for the host place
    #[inline]
    pub const fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    /// Returns true for any device place
    #[inline]
    pub const fn is_device(self) -> bool {
        matches!(self, Self::Device(_))
    }

    /// Device index, or `None` for the host
    #[inline]
    pub const fn device_index(self) -> Option<usize> {
        match self {
            Self::Host => None,
            Self::Device(index) => Some(index),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device(index) => write!(f, "device:{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_equality() {
        assert_eq!(Place::Host, Place::default());
        assert_eq!(Place::Device(1), Place::Device(1));
        assert_ne!(Place::Device(0), Place::Device(1));
        assert_ne!(Place::Host, Place::Device(0));
    }

    #[test]
    fn test_place_queries() {
        assert!(Place::Host.is_host());
        assert!(Place::Device(2).is_device());
        assert_eq!(Place::Device(2).device_index(), Some(2));
        assert_eq!(Place::Host.device_index(), None);
    }

    #[test]
    fn test_place_display() {
        assert_eq!(Place::Host.to_string(), "host");
        assert_eq!(Place::Device(4).to_string(), "device:4");
    }
}
