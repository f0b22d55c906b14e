//! Conversions between wire durations and [`std::time::Duration`].
//!
//! Precision is milliseconds; anything finer is truncated.

use std::time::Duration;

/// Absent or negative durations convert to zero.
pub fn to_std(duration: Option<&prost_types::Duration>) -> Duration {
    let Some(d) = duration else {
        return Duration::ZERO;
    };
    if d.seconds < 0 || (d.seconds == 0 && d.nanos <= 0) {
        return Duration::ZERO;
    }
    let millis = (d.seconds as u64)
        .saturating_mul(1000)
        .saturating_add((d.nanos.max(0) as u64) / 1_000_000);
    Duration::from_millis(millis)
}

/// Like [`to_std`], but zero maps to `None` ("use the platform default").
pub fn to_std_opt(duration: Option<&prost_types::Duration>) -> Option<Duration> {
    let d = to_std(duration);
    (!d.is_zero()).then_some(d)
}

pub fn from_std(duration: Duration) -> prost_types::Duration {
    let millis = duration.as_millis();
    prost_types::Duration {
        seconds: i64::try_from(millis / 1000).unwrap_or(i64::MAX),
        nanos: ((millis % 1000) * 1_000_000) as i32,
    }
}

pub fn from_millis(millis: u64) -> prost_types::Duration {
    from_std(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_granularity() {
        let d = Duration::from_micros(1_500_700);
        let wire = from_std(d);
        assert_eq!(wire.seconds, 1);
        assert_eq!(wire.nanos, 500_000_000);
        assert_eq!(to_std(Some(&wire)), Duration::from_millis(1500));
    }

    #[test]
    fn absent_and_negative_are_zero() {
        assert_eq!(to_std(None), Duration::ZERO);
        let negative = prost_types::Duration {
            seconds: -3,
            nanos: 0,
        };
        assert_eq!(to_std(Some(&negative)), Duration::ZERO);
        assert_eq!(to_std_opt(None), None);
        assert_eq!(
            to_std_opt(Some(&from_millis(20))),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn oversized_durations_saturate() {
        let wire = from_std(Duration::MAX);
        assert_eq!(wire.seconds, i64::MAX);
        assert!(to_std(Some(&wire)) > Duration::from_secs(1_000_000_000));
    }
}
