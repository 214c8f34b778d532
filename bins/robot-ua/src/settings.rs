use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sip_ua::UserAgentConfig;
use tokio::fs;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5060;
const DEFAULT_TRANSPORT: &str = "udp";
const DEFAULT_USER: &str = "robot";

/// Partially specified settings from the command line or a JSON file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<String>,
    pub user: Option<String>,
}

impl Settings {
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Combines file settings with flags; flags win.
    pub fn merge(file: Option<Settings>, flags: Settings) -> Settings {
        let file = file.unwrap_or_default();
        Settings {
            host: flags.host.or(file.host),
            port: flags.port.or(file.port),
            transport: flags.transport.or(file.transport),
            user: flags.user.or(file.user),
        }
    }

    pub fn user(&self) -> String {
        self.user.clone().unwrap_or_else(|| DEFAULT_USER.to_owned())
    }

    pub fn into_config(self) -> Result<UserAgentConfig> {
        let config = UserAgentConfig::new(
            self.host.unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            self.port.unwrap_or(DEFAULT_PORT),
            self.transport
                .unwrap_or_else(|| DEFAULT_TRANSPORT.to_owned()),
        )?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file() {
        let file: Settings =
            serde_json::from_str(r#"{"host":"10.0.0.1","port":5070,"user":"robot"}"#).unwrap();
        let flags = Settings {
            port: Some(5080),
            user: Some("human".to_owned()),
            ..Settings::default()
        };
        let merged = Settings::merge(Some(file), flags);
        assert_eq!(merged.user(), "human");

        let config = merged.into_config().unwrap();
        assert_eq!(config.host_port(), "10.0.0.1:5080");
        assert_eq!(config.transport, "udp");
    }

    #[test]
    fn tcp_is_refused() {
        let settings = Settings {
            transport: Some("tcp".to_owned()),
            ..Settings::default()
        };
        assert!(settings.into_config().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Settings>(r#"{"proxy":"x"}"#).is_err());
    }
}
