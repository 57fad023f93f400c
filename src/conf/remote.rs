use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default = "RemoteConfig::default_base_url")]
    pub base_url: String,
    #[serde(with = "humantime_serde", default = "RemoteConfig::default_timeout")]
    pub timeout: Duration,
}

impl RemoteConfig {
    fn default_base_url() -> String {
        String::from("http://localhost:5000/api")
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout: Self::default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_default() {
        let remote = RemoteConfig::default();
        assert_eq!(remote.base_url, "http://localhost:5000/api");
        assert_eq!(remote.timeout, Duration::from_secs(30));
    }
}
