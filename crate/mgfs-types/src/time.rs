use std::time::{Duration, SystemTime};

/// Time as duration since the start of the UNIX epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct UnixTime(Duration);

impl UnixTime {
    /// Start of the UNIX epoch.
    pub const ZERO: UnixTime = UnixTime(Duration::ZERO);

    /// Create a new UNIX time with the given secs and fractional nanosecs.
    pub fn new(secs: u64, nsecs: u32) -> Self {
        UnixTime(Duration::new(secs, nsecs))
    }

    pub fn from_secs(secs: u64) -> Self {
        UnixTime::new(secs, 0)
    }

    /// Build a UNIX time from milliseconds, as stored by BSON dates.
    ///
    /// Times before the epoch are clamped to [UnixTime::ZERO].
    pub fn from_millis(millis: i64) -> Self {
        if millis < 0 {
            return UnixTime::ZERO;
        }

        UnixTime(Duration::from_millis(millis as u64))
    }

    pub fn as_system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis() {
        assert_eq!(UnixTime::new(1640995200, 500_000_000), UnixTime::from_millis(1640995200500));
        assert_eq!(UnixTime::ZERO, UnixTime::from_millis(-10));
    }

    #[test]
    fn system_time_conversion() {
        let t = UnixTime::new(1234567890, 333999111);
        assert_eq!(
            Some(Duration::new(1234567890, 333999111)),
            t.as_system_time().duration_since(SystemTime::UNIX_EPOCH).ok()
        );
        assert_eq!(SystemTime::UNIX_EPOCH, UnixTime::ZERO.as_system_time());
    }
}
