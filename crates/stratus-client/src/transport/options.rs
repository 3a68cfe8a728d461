//! Transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stratus_core::{Error, Result};

/// Settings every transport backend understands
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Whole-request timeout; zero disables it
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Verify TLS certificates
    pub ssl_verify: bool,
    /// Log every request and response at debug level
    pub debug: bool,
    /// Proxy URL for all requests
    pub proxy: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            ssl_verify: true,
            debug: false,
            proxy: None,
        }
    }
}

impl TransportOptions {
    /// Apply a single option
    pub fn apply(&mut self, option: TransportOption) {
        match option {
            TransportOption::Timeout(timeout) => self.timeout = timeout,
            TransportOption::SslVerify(verify) => self.ssl_verify = verify,
            TransportOption::Debug(debug) => self.debug = debug,
            TransportOption::Proxy(proxy) => self.proxy = proxy,
        }
    }

    /// Read a single option
    pub fn get(&self, key: OptionKey) -> TransportOption {
        match key {
            OptionKey::Timeout => TransportOption::Timeout(self.timeout),
            OptionKey::SslVerify => TransportOption::SslVerify(self.ssl_verify),
            OptionKey::Debug => TransportOption::Debug(self.debug),
            OptionKey::Proxy => TransportOption::Proxy(self.proxy.clone()),
        }
    }
}

/// Name of a transport option
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Timeout,
    SslVerify,
    Debug,
    Proxy,
}

impl OptionKey {
    /// Resolve a configuration key, with or without the `transport.` prefix
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.strip_prefix("transport.").unwrap_or(key);
        match key.to_ascii_lowercase().as_str() {
            "timeout" => Ok(Self::Timeout),
            "ssl_verify" | "sslverify" => Ok(Self::SslVerify),
            "debug" => Ok(Self::Debug),
            "proxy" => Ok(Self::Proxy),
            other => Err(Error::Config(format!("unknown transport option '{other}'"))),
        }
    }
}

/// A single transport option and its value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportOption {
    Timeout(Duration),
    SslVerify(bool),
    Debug(bool),
    Proxy(Option<String>),
}

impl TransportOption {
    /// Parse a string configuration entry such as `transport.timeout = 10`
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        Ok(match OptionKey::parse(key)? {
            OptionKey::Timeout => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("invalid timeout '{value}'")))?;
                Self::Timeout(Duration::from_secs(secs))
            }
            OptionKey::SslVerify => Self::SslVerify(parse_bool(value)?),
            OptionKey::Debug => Self::Debug(parse_bool(value)?),
            OptionKey::Proxy => match value {
                "" | "false" | "0" | "none" => Self::Proxy(None),
                url => Self::Proxy(Some(url.to_string())),
            },
        })
    }

    /// Which option this is
    pub fn key(&self) -> OptionKey {
        match self {
            Self::Timeout(_) => OptionKey::Timeout,
            Self::SslVerify(_) => OptionKey::SslVerify,
            Self::Debug(_) => OptionKey::Debug,
            Self::Proxy(_) => OptionKey::Proxy,
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("invalid boolean '{other}'"))),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("transport.timeout", "10", TransportOption::Timeout(Duration::from_secs(10)))]
    #[case("timeout", "0", TransportOption::Timeout(Duration::ZERO))]
    #[case("transport.ssl_verify", "false", TransportOption::SslVerify(false))]
    #[case("transport.debug", "ON", TransportOption::Debug(true))]
    #[case(
        "transport.proxy",
        "http://proxy:3128",
        TransportOption::Proxy(Some("http://proxy:3128".to_string()))
    )]
    #[case("transport.proxy", "false", TransportOption::Proxy(None))]
    fn test_parse_option(
        #[case] key: &str,
        #[case] value: &str,
        #[case] expected: TransportOption,
    ) {
        assert_eq!(TransportOption::parse(key, value).unwrap(), expected);
    }

    #[rstest]
    #[case("transport.timeout", "soon")]
    #[case("transport.debug", "maybe")]
    #[case("transport.retries", "3")]
    fn test_parse_option_rejects(#[case] key: &str, #[case] value: &str) {
        assert!(matches!(TransportOption::parse(key, value), Err(Error::Config(_))));
    }

    #[test]
    fn test_apply_and_get() {
        let mut options = TransportOptions::default();
        options.apply(TransportOption::Debug(true));
        options.apply(TransportOption::Timeout(Duration::from_secs(5)));

        assert_eq!(options.get(OptionKey::Debug), TransportOption::Debug(true));
        assert_eq!(
            options.get(OptionKey::Timeout),
            TransportOption::Timeout(Duration::from_secs(5))
        );
        assert!(options.ssl_verify);
    }

    #[test]
    fn test_serde_uses_seconds() {
        let options: TransportOptions =
            serde_json::from_str(r#"{"timeout": 12, "debug": true}"#).unwrap();
        assert_eq!(options.timeout, Duration::from_secs(12));
        assert!(options.debug);
        assert!(options.ssl_verify);

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["timeout"], 12);
    }
}
