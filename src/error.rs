//! Error types for the controller, one enum per layer.

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use thiserror::Error;

use crate::ofp_controller::SwitchId;

/// A packet-in payload that could not be parsed into a `Packet`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("truncated {layer} header: need {need} bytes, have {have}")]
    Truncated {
        layer: &'static str,
        need: usize,
        have: usize,
    },

    #[error("unsupported IP version {0}")]
    IpVersion(u8),

    #[error("invalid IPv4 header length {0}")]
    IpHeaderLength(u8),
}

/// Failures decoding OpenFlow messages off the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown OpenFlow message code {0}")]
    UnknownMessageCode(u8),

    #[error("unsupported OpenFlow version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("declared message length {0} is shorter than the header")]
    BadLength(usize),

    #[error("truncated {message} body: need {need} bytes, have {have}")]
    Truncated {
        message: &'static str,
        need: usize,
        have: usize,
    },

    #[error("parsing {0} messages is not supported")]
    Unsupported(&'static str),

    #[error("unknown packet-in reason {0}")]
    UnknownReason(u8),
}

/// The switch fabric could not deliver an instruction.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("no connection to switch {0}")]
    NotConnected(SwitchId),
}

/// Errors surfaced while handling an event for a switch session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("send failed: {0}")]
    Send(#[from] FabricError),

    #[error("no session for switch {0}")]
    UnknownSwitch(SwitchId),
}

/// Errors loading or validating the deployment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{what} must not use port 0")]
    ZeroPort { what: String },

    #[error("duplicate chain entry for source {0}")]
    DuplicateSource(Ipv4Addr),

    #[error("switch {0} is assigned more than one role")]
    DuplicateSwitch(SwitchId),

    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
}
