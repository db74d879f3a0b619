//! Deployment configuration.
//!
//! Loaded once at startup from a TOML file. Every field has a default that
//! reproduces the standard four-switch chain deployment, so an empty file (or
//! no file at all) is a valid configuration.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decision::{ChainPolicy, FlowDecisionEngine, Role, RoleTable, RuleSettings};
use crate::error::ConfigError;
use crate::ofp_controller::SwitchId;

/// Role assignment for one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRole {
    pub dpid: SwitchId,
    pub role: Role,
}

/// Chain entry: traffic from `source` enters the chain on `port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub source: Ipv4Addr,
    pub port: u16,
}

/// Service chain routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Output port on interior switches
    #[serde(default = "default_next_hop_port")]
    pub next_hop_port: u16,

    /// Output port on return switches; unset sends return traffic to the next hop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_port: Option<u16>,

    /// Source address to entry port mapping
    #[serde(default = "default_entries")]
    pub entries: Vec<ChainEntry>,
}

/// Flow rule timeouts and priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Idle timeout (seconds) of rules installed by the learning switch
    #[serde(default = "default_learning_idle_timeout")]
    pub learning_idle_timeout: u16,

    /// Idle timeout (seconds) of rules installed by chain routing
    #[serde(default = "default_chain_idle_timeout")]
    pub chain_idle_timeout: u16,

    /// Priority of every installed rule
    #[serde(default = "default_priority")]
    pub priority: u16,
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Address the OpenFlow listener binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Role of switches not listed in `switches`
    #[serde(default = "default_role")]
    pub default_role: Role,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default = "default_switches")]
    pub switches: Vec<SwitchRole>,
}

fn default_listen() -> String {
    "127.0.0.1:6633".to_string()
}

fn default_role() -> Role {
    Role::Interior
}

fn default_switches() -> Vec<SwitchRole> {
    vec![SwitchRole {
             dpid: SwitchId(1),
             role: Role::Entry,
         },
         SwitchRole {
             dpid: SwitchId(5),
             role: Role::Return,
         }]
}

fn default_next_hop_port() -> u16 {
    1
}

fn default_entries() -> Vec<ChainEntry> {
    vec![ChainEntry {
             source: Ipv4Addr::new(10, 0, 1, 1),
             port: 1,
         },
         ChainEntry {
             source: Ipv4Addr::new(10, 0, 2, 1),
             port: 2,
         }]
}

fn default_learning_idle_timeout() -> u16 {
    350
}

fn default_chain_idle_timeout() -> u16 {
    360
}

fn default_priority() -> u16 {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            next_hop_port: default_next_hop_port(),
            return_port: None,
            entries: default_entries(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            learning_idle_timeout: default_learning_idle_timeout(),
            chain_idle_timeout: default_chain_idle_timeout(),
            priority: default_priority(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_role: default_role(),
            timeouts: TimeoutConfig::default(),
            chain: ChainConfig::default(),
            switches: default_switches(),
        }
    }
}

impl ControllerConfig {
    /// Load and validate configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        Self::from_toml(&content, path)
    }

    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Io { ref source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Parse and validate `content`; `path` is only used in error messages.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ControllerConfig = toml::from_str(content).map_err(|e| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.chain.next_hop_port == 0 {
            return Err(ConfigError::ZeroPort { what: "chain.next_hop_port".to_string() });
        }
        if self.chain.return_port == Some(0) {
            return Err(ConfigError::ZeroPort { what: "chain.return_port".to_string() });
        }

        let mut sources = HashSet::new();
        for entry in &self.chain.entries {
            if entry.port == 0 {
                return Err(ConfigError::ZeroPort {
                    what: format!("chain entry for {}", entry.source),
                });
            }
            if !sources.insert(entry.source) {
                return Err(ConfigError::DuplicateSource(entry.source));
            }
        }

        let mut switches = HashSet::new();
        for sw in &self.switches {
            if !switches.insert(sw.dpid) {
                return Err(ConfigError::DuplicateSwitch(sw.dpid));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| ConfigError::ListenAddress(self.listen.clone()))
    }

    pub fn role_table(&self) -> RoleTable {
        let mut roles = RoleTable::new(self.default_role);
        for sw in &self.switches {
            roles.assign(sw.dpid, sw.role);
        }
        roles
    }

    pub fn chain_policy(&self) -> ChainPolicy {
        let entry_ports: HashMap<Ipv4Addr, u16> = self.chain
            .entries
            .iter()
            .map(|e| (e.source, e.port))
            .collect();
        ChainPolicy {
            entry_ports: entry_ports,
            next_hop_port: self.chain.next_hop_port,
            return_port: self.chain.return_port,
            learning_rule: RuleSettings {
                idle_timeout: self.timeouts.learning_idle_timeout,
                priority: self.timeouts.priority,
            },
            chain_rule: RuleSettings {
                idle_timeout: self.timeouts.chain_idle_timeout,
                priority: self.timeouts.priority,
            },
        }
    }

    /// Build the decision engine described by this configuration.
    pub fn engine(&self) -> Result<FlowDecisionEngine, ConfigError> {
        self.validate()?;
        Ok(FlowDecisionEngine::new(self.chain_policy(), self.role_table()))
    }
}
