//! # config — โหลดค่าตั้งค่าทั้งหมดครั้งเดียวตอนเริ่มโปรแกรม
//!
//! ไม่มีการ reload ระหว่างรัน.  Missing tokens are fatal.

use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_FIGI: &str = "BBG004730N88";
pub const DEFAULT_INSTRUMENT_NAME: &str = "SBER";
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 2.0;
pub const DEFAULT_TINKOFF_API_URL: &str = "https://invest-public-api.tinkoff.ru/rest";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Longest candle window accepted (1 day)
pub const MAX_LOOKBACK_MINUTES: i64 = 24 * 60;

/// Config ทั้งหมดที่ daemon ต้องการ
#[derive(Clone)]
pub struct Config {
    /// Bearer token for Tinkoff Invest
    pub tinkoff_token:     String,
    /// Telegram bot token
    pub telegram_token:    String,
    /// Instrument to watch
    pub figi:              String,
    /// Human-readable name used in alert messages, e.g. "SBER"
    pub instrument_name:   String,
    /// Spike threshold in percent (inclusive)
    pub threshold_percent: f64,
    /// รอบเวลา Scheduler Loop
    pub poll_interval:     Duration,
    /// How far back each candle request reaches
    pub lookback:          chrono::Duration,
    pub tinkoff_api_url:   String,
    pub telegram_api_url:  String,
    /// Bind address for the status route (disabled when unset)
    pub status_addr:       Option<String>,
}

// Tokens stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("figi", &self.figi)
            .field("instrument_name", &self.instrument_name)
            .field("threshold_percent", &self.threshold_percent)
            .field("poll_interval", &self.poll_interval)
            .field("lookback", &self.lookback)
            .field("tinkoff_api_url", &self.tinkoff_api_url)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("status_addr", &self.status_addr)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(AppError::ConfigMissing(key))
        };

        let tinkoff_token  = required("TINKOFF_TOKEN")?;
        let telegram_token = required("TELEGRAM_TOKEN")?;

        let threshold_percent = match lookup("THRESHOLD_PERCENT") {
            Some(raw) => parse_positive::<f64>("THRESHOLD_PERCENT", &raw)?,
            None => DEFAULT_THRESHOLD_PERCENT,
        };
        if !threshold_percent.is_finite() {
            return Err(AppError::ConfigInvalid {
                key:    "THRESHOLD_PERCENT",
                reason: "must be a finite number".into(),
            });
        }

        let interval_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(raw) => parse_positive::<u64>("POLL_INTERVAL_SECS", &raw)?,
            None => 60,
        };

        let lookback_min = match lookup("LOOKBACK_MINUTES") {
            Some(raw) => parse_positive::<i64>("LOOKBACK_MINUTES", &raw)?,
            None => 5,
        };
        // ห้ามเกิน 1 วัน, ค่าใหญ่ๆ ทำให้ DateTime overflow
        if lookback_min > MAX_LOOKBACK_MINUTES {
            return Err(AppError::ConfigInvalid {
                key:    "LOOKBACK_MINUTES",
                reason: format!("must be at most {MAX_LOOKBACK_MINUTES}"),
            });
        }
        let lookback = chrono::Duration::try_minutes(lookback_min).ok_or(AppError::ConfigInvalid {
            key:    "LOOKBACK_MINUTES",
            reason: "out of range".into(),
        })?;

        Ok(Self {
            tinkoff_token,
            telegram_token,
            figi:              lookup("FIGI").unwrap_or_else(|| DEFAULT_FIGI.to_string()),
            instrument_name:   lookup("INSTRUMENT_NAME").unwrap_or_else(|| DEFAULT_INSTRUMENT_NAME.to_string()),
            threshold_percent,
            poll_interval:     Duration::from_secs(interval_secs),
            lookback,
            tinkoff_api_url:   lookup("TINKOFF_API_URL")
                .unwrap_or_else(|| DEFAULT_TINKOFF_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            telegram_api_url:  lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            status_addr:       lookup("STATUS_ADDR").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse_positive<T>(key: &'static str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value: T = raw.trim().parse().map_err(|_| AppError::ConfigInvalid {
        key,
        reason: format!("'{raw}' is not a number"),
    })?;

    if value <= T::default() {
        return Err(AppError::ConfigInvalid {
            key,
            reason: format!("'{raw}' must be greater than zero"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const TOKENS: [(&str, &str); 2] = [("TINKOFF_TOKEN", "t.abc"), ("TELEGRAM_TOKEN", "123:xyz")];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&TOKENS)).unwrap();

        assert_eq!(config.figi, DEFAULT_FIGI);
        assert_eq!(config.instrument_name, "SBER");
        assert_eq!(config.threshold_percent, 2.0);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.lookback, chrono::Duration::minutes(5));
        assert_eq!(config.tinkoff_api_url, DEFAULT_TINKOFF_API_URL);
        assert!(config.status_addr.is_none());
    }

    #[test]
    fn test_missing_tinkoff_token_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_TOKEN", "123:xyz")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigMissing("TINKOFF_TOKEN")));
    }

    #[test]
    fn test_blank_telegram_token_counts_as_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("TINKOFF_TOKEN", "t.abc"),
            ("TELEGRAM_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigMissing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = TOKENS.to_vec();
        pairs.extend([
            ("FIGI", "BBG000B9XRY4"),
            ("INSTRUMENT_NAME", "AAPL"),
            ("THRESHOLD_PERCENT", "0.5"),
            ("POLL_INTERVAL_SECS", "15"),
            ("TELEGRAM_API_URL", "http://localhost:9000/"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.figi, "BBG000B9XRY4");
        assert_eq!(config.instrument_name, "AAPL");
        assert_eq!(config.threshold_percent, 0.5);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.telegram_api_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        for bad in ["abc", "0", "-1.5", "NaN", "inf"] {
            let mut pairs = TOKENS.to_vec();
            pairs.push(("THRESHOLD_PERCENT", bad));
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(
                matches!(err, AppError::ConfigInvalid { key: "THRESHOLD_PERCENT", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_oversized_lookback_rejected() {
        for bad in ["1441", "1000000000000", "9223372036854775807"] {
            let mut pairs = TOKENS.to_vec();
            pairs.push(("LOOKBACK_MINUTES", bad));
            let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(
                matches!(err, AppError::ConfigInvalid { key: "LOOKBACK_MINUTES", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_one_day_lookback_accepted() {
        let mut pairs = TOKENS.to_vec();
        pairs.push(("LOOKBACK_MINUTES", "1440"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.lookback, chrono::Duration::days(1));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let config = Config::from_lookup(lookup_from(&TOKENS)).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("t.abc"));
        assert!(!printed.contains("123:xyz"));
    }
}
