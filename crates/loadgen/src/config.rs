use loadcore::ConfigError;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_ITERATIONS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// How many iterations of a scenario to run and how many at once.
///
/// Zero values mean "unset". `iterations` and `duration` are mutually
/// exclusive; when neither is set [`DEFAULT_ITERATIONS`] applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunConfiguration {
    pub iterations: u64,
    pub duration: Option<Duration>,
    pub max_concurrent: usize,
    /// Stop launching iterations and cancel in-flight ones after the first failure
    pub fail_fast: bool,
}

/// The bound a validated configuration runs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    Iterations(u64),
    Duration(Duration),
}

impl RunConfiguration {
    pub fn iterations(iterations: u64) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }

    pub fn duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Default::default()
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    fn has_duration(&self) -> bool {
        self.duration.map_or(false, |d| !d.is_zero())
    }

    /// Reject conflicting limits and fill in defaults
    pub fn validate_and_default(mut self) -> Result<Self, ConfigError> {
        if self.iterations > 0 && self.has_duration() {
            return Err(ConfigError::ConflictingLimits);
        }
        if !self.has_duration() {
            self.duration = None;
            if self.iterations == 0 {
                self.iterations = DEFAULT_ITERATIONS;
            }
        }
        if self.max_concurrent == 0 {
            self.max_concurrent = DEFAULT_MAX_CONCURRENT;
        }
        Ok(self)
    }

    /// Fill the limits and concurrency the user left unset from `defaults`.
    ///
    /// Limits are taken as a pair so a user-supplied duration never meets a
    /// default iteration count.
    pub fn with_fallback(mut self, defaults: &RunConfiguration) -> Self {
        if self.iterations == 0 && !self.has_duration() {
            self.iterations = defaults.iterations;
            self.duration = defaults.duration;
        }
        if self.max_concurrent == 0 {
            self.max_concurrent = defaults.max_concurrent;
        }
        self
    }

    /// Only meaningful after [`validate_and_default`](Self::validate_and_default)
    pub fn limit(&self) -> RunLimit {
        match self.duration {
            Some(duration) if !duration.is_zero() => RunLimit::Duration(duration),
            _ => RunLimit::Iterations(self.iterations),
        }
    }
}

/// Parse a duration such as `"300ms"`, `"1.5h"` or `"1m30s"`.
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare
/// `"0"` is the only unitless value allowed.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.starts_with('-') {
        return Err("negative durations are not allowed".to_string());
    }
    let mut rest = text.strip_prefix('+').unwrap_or(text);

    let mut total = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("expected a number in {:?}", input));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {:?}", number))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("missing unit in duration {:?}", input)),
            other => return Err(format!("unknown unit {:?} in duration {:?}", other, input)),
        };
        total += value * scale;
        rest = tail;
    }

    Duration::try_from_secs_f64(total).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neither_limit_defaults_to_iterations() {
        let config = RunConfiguration::default().validate_and_default().unwrap();
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.limit(), RunLimit::Iterations(DEFAULT_ITERATIONS));
    }

    #[test]
    fn both_limits_are_rejected() {
        let config = RunConfiguration {
            iterations: 5,
            duration: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        assert_eq!(
            config.validate_and_default(),
            Err(ConfigError::ConflictingLimits)
        );
    }

    #[test]
    fn duration_limit_keeps_iterations_unset() {
        let config = RunConfiguration::duration(Duration::from_secs(3))
            .validate_and_default()
            .unwrap();
        assert_eq!(config.iterations, 0);
        assert_eq!(config.limit(), RunLimit::Duration(Duration::from_secs(3)));
    }

    #[test]
    fn zero_duration_counts_as_unset() {
        let config = RunConfiguration::duration(Duration::ZERO)
            .validate_and_default()
            .unwrap();
        assert_eq!(config.limit(), RunLimit::Iterations(DEFAULT_ITERATIONS));
    }

    #[test]
    fn fallback_only_fills_unset_fields() {
        let defaults = RunConfiguration::iterations(100).with_max_concurrent(20);

        let user = RunConfiguration::duration(Duration::from_secs(1)).with_fallback(&defaults);
        assert_eq!(user.iterations, 0);
        assert_eq!(user.max_concurrent, 20);

        let empty = RunConfiguration::default().with_fallback(&defaults);
        assert_eq!(empty.iterations, 100);
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("ten seconds").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
