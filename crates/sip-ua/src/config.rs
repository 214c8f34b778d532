use serde::{Deserialize, Serialize};
use sip_transport::TransportKind;
use smol_str::SmolStr;

use crate::UaError;

fn default_transport() -> String {
    "udp".to_owned()
}

/// Local binding of a user agent.
///
/// Only `udp` is implemented; construction and [`validate`](Self::validate)
/// reject anything else so a misconfigured agent never starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_transport")]
    pub transport: String,
}

impl UserAgentConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        transport: impl Into<String>,
    ) -> Result<Self, UaError> {
        let config = Self {
            host: host.into(),
            port,
            transport: transport.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the transport name, returning the parsed kind.
    pub fn validate(&self) -> Result<TransportKind, UaError> {
        match TransportKind::parse(&self.transport) {
            Some(TransportKind::Udp) => Ok(TransportKind::Udp),
            Some(TransportKind::Tcp) => Err(UaError::TransportNotImplemented(SmolStr::new(
                TransportKind::Tcp.as_str(),
            ))),
            None => Err(UaError::UnknownTransport(SmolStr::new(&self.transport))),
        }
    }

    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
