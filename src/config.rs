use std::path::PathBuf;
use std::time::{
    Duration,
    SystemTime,
};

use chrono::{
    DateTime,
    NaiveDate,
    Utc,
};
use chrono_tz::Tz;
use url::Url;

use crate::classify::TypeTable;
use crate::error::{
    RelayError,
    Result,
};

/// Default upload limit, 20MB.
pub const MAX_UPLOAD_SIZE: u64 = 20 * 1024 * 1024;

/// Default cache lifetime of served images, one year.
pub const CACHE_DURATION: u64 = 31536000;

/// Immutable relay configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub webdav_url: String,
    pub username: String,
    pub password: String,
    pub tokens: Vec<String>,
    pub types: TypeTable,
    pub max_size: u64,
    pub cache_duration: Duration,
    pub timezone: Tz,
    pub public_url: String,
    pub insecure_tls: bool,
    pub spool_dir: Option<PathBuf>,
}

impl Config {

    /// Create a configuration with defaults for everything except the remote store.
    ///
    /// # Arguments
    ///
    /// * `webdav_url` - Base url of the WebDAV server. Trailing slashes are dropped.
    /// * `username` - Basic auth user on the WebDAV server.
    /// * `password` - Basic auth password on the WebDAV server.
    pub fn new(webdav_url: &str, username: &str, password: &str) -> Result<Config> {
        let url = Url::parse(webdav_url).map_err(|e| {
            RelayError::Config(format!("invalid webdav url {}: {}", webdav_url, e))
        })?;
        match url.scheme() {
            "http" | "https" => {},
            v => {
                return Err(RelayError::Config(format!("unsupported webdav url scheme {}", v)));
            },
        };
        Ok(Config {
            webdav_url: webdav_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            tokens: vec!(),
            types: TypeTable::standard(),
            max_size: MAX_UPLOAD_SIZE,
            cache_duration: Duration::from_secs(CACHE_DURATION),
            timezone: Tz::UTC,
            public_url: String::from("/"),
            insecure_tls: false,
            spool_dir: None,
        })
    }

    pub fn with_tokens(mut self, tokens: Vec<String>) -> Config {
        self.tokens = tokens.into_iter().filter(|v| !v.is_empty()).collect();
        self
    }

    pub fn with_types(mut self, types: TypeTable) -> Config {
        self.types = types;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Config {
        self.max_size = max_size;
        self
    }

    pub fn with_cache_duration(mut self, secs: u64) -> Config {
        self.cache_duration = Duration::from_secs(secs);
        self
    }

    pub fn with_timezone(mut self, name: &str) -> Result<Config> {
        self.timezone = name.parse::<Tz>().map_err(|e| {
            RelayError::Config(format!("unknown timezone {}: {}", name, e))
        })?;
        Ok(self)
    }

    pub fn with_public_url(mut self, public_url: &str) -> Config {
        self.public_url = public_url.to_string();
        self
    }

    pub fn with_insecure_tls(mut self, insecure: bool) -> Config {
        self.insecure_tls = insecure;
        self
    }

    /// Keep uploads in progress in `dir` instead of the system temporary directory.
    pub fn with_spool_dir(mut self, dir: PathBuf) -> Config {
        self.spool_dir = Some(dir);
        self
    }

    /// True if uploads require a token.
    pub fn token_required(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Calendar date of a point in time in the configured timezone.
    pub fn date_at(&self, t: SystemTime) -> NaiveDate {
        DateTime::<Utc>::from(t).with_timezone(&self.timezone).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use chrono_tz::Tz;

    #[test]
    fn test_config_defaults() {
        let cfg = Config::new("https://dav.example.org/remote.php/", "alice", "secret").unwrap();
        assert_eq!(cfg.webdav_url, "https://dav.example.org/remote.php");
        assert_eq!(cfg.max_size, 20 * 1024 * 1024);
        assert_eq!(cfg.cache_duration.as_secs(), 31536000);
        assert!(!cfg.insecure_tls);
        assert!(cfg.spool_dir.is_none());
        assert!(!cfg.token_required());
    }

    #[test]
    fn test_config_bad_url() {
        assert!(Config::new("not a url", "", "").is_err());
        assert!(Config::new("ftp://dav.example.org", "", "").is_err());
    }

    #[test]
    fn test_config_tokens_drop_empty() {
        let cfg = Config::new("http://localhost", "", "").unwrap()
            .with_tokens(vec!(String::new(), String::from("foo")));
        assert_eq!(cfg.tokens, vec!(String::from("foo")));
        assert!(cfg.token_required());
    }

    #[test]
    fn test_config_date_at() {
        use std::time::{Duration, UNIX_EPOCH};
        use chrono::NaiveDate;

        // 2024-03-05T23:30:00Z
        let t = UNIX_EPOCH + Duration::from_secs(1709681400);
        let cfg = Config::new("http://localhost", "", "").unwrap();
        assert_eq!(cfg.date_at(t), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let cfg = cfg.with_timezone("Asia/Shanghai").unwrap();
        assert_eq!(cfg.date_at(t), NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    }

    #[test]
    fn test_config_timezone() {
        let cfg = Config::new("http://localhost", "", "").unwrap()
            .with_timezone("Asia/Shanghai").unwrap();
        assert_eq!(cfg.timezone, Tz::Asia__Shanghai);
        assert!(Config::new("http://localhost", "", "").unwrap().with_timezone("Mars/Olympus").is_err());
    }
}
