use crate::Error;
use core::str::FromStr;
use core::time::Duration;

/// Longest accepted window, one hundred years.
const MAX_WINDOW_SECS: u64 = 100 * 365 * 24 * 3600;

/// How long evaluations stay local after the remote authority fails.
///
/// Parsed from `<amount><unit>` where unit is `s`, `m` or `h`, e.g. `5m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentMode {
    duration: Duration,
}

impl SilentMode {
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl FromStr for SilentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::config(format!("invalid silent mode '{s}', expected <amount><s|m|h>"));

        let s = s.trim();
        let unit_at = s.len().checked_sub(1).ok_or_else(invalid)?;
        let (amount, unit) = s.split_at_checked(unit_at).ok_or_else(invalid)?;
        let amount: u64 = amount.parse().map_err(|_| invalid())?;

        let multiplier = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            _ => return Err(invalid()),
        };

        let secs = amount.checked_mul(multiplier).ok_or_else(invalid)?;
        if secs == 0 || secs > MAX_WINDOW_SECS {
            return Err(invalid());
        }

        Ok(Self::new(Duration::from_secs(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!("30s".parse::<SilentMode>().unwrap().duration(), Duration::from_secs(30));
        assert_eq!("5m".parse::<SilentMode>().unwrap().duration(), Duration::from_secs(300));
        assert_eq!("2h".parse::<SilentMode>().unwrap().duration(), Duration::from_secs(7200));
        assert_eq!("876000h".parse::<SilentMode>().unwrap().duration(), Duration::from_secs(MAX_WINDOW_SECS));
    }

    #[test]
    fn rejects_malformed_specs() {
        for spec in ["", "s", "5", "5d", "-1s", "0m", "1.5h", "99999999999999999999h", "3000000000h", "876001h"] {
            let err = spec.parse::<SilentMode>().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{spec}");
        }
    }
}
