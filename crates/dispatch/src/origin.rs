//! Origin checks for inbound deliveries.

use std::net::IpAddr;

use {ebworker_config::WorkerConfig, ipnet::IpNet};

use crate::{Error, Result};

/// Accepts deliveries from loopback or a trusted network whose `User-Agent`
/// contains the daemon's agent string, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    user_agent: String,
    trusted_networks: Vec<IpNet>,
}

impl OriginPolicy {
    pub fn new(user_agent: impl Into<String>, trusted_networks: Vec<IpNet>) -> Self {
        Self {
            user_agent: user_agent.into().to_ascii_lowercase(),
            trusted_networks,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(&config.user_agent, config.trusted_networks.clone())
    }

    /// Fails with [`Error::UntrustedOrigin`] or [`Error::UnexpectedAgent`].
    pub fn check(&self, remote: IpAddr, user_agent: Option<&str>) -> Result<()> {
        if !self.is_trusted(remote) {
            return Err(Error::UntrustedOrigin { remote });
        }
        let agent = user_agent.unwrap_or_default();
        if !agent.to_ascii_lowercase().contains(&self.user_agent) {
            return Err(Error::UnexpectedAgent {
                agent: agent.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_trusted(&self, remote: IpAddr) -> bool {
        let remote = remote.to_canonical();
        remote.is_loopback() || self.trusted_networks.iter().any(|net| net.contains(&remote))
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}
