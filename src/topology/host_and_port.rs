use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_PORT;
use crate::Error;
use crate::Result;
use crate::TopologyError;

/// Network address of a single replica set member
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostAndPort {
    host: String,
    port: u16,
}

impl HostAndPort {
    pub fn new(
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host`, `host:port` or `[v6addr]:port`, falling back to `default_port`
    /// when no port is given.
    pub fn parse_with_default_port(
        s: &str,
        default_port: u16,
    ) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(parse_error(s, "empty host"));
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| parse_error(s, "missing closing bracket"))?;
            match after {
                "" => (host, None),
                _ => {
                    let port = after
                        .strip_prefix(':')
                        .ok_or_else(|| parse_error(s, "unexpected characters after bracket"))?;
                    (host, Some(port))
                }
            }
        } else {
            match s.rsplit_once(':') {
                // A bare IPv6 address without brackets carries no port
                Some((host, _)) if host.contains(':') => (s, None),
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(parse_error(s, "empty host"));
        }

        let port = match port {
            Some(p) => p
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| parse_error(s, "invalid port"))?,
            None => default_port,
        };

        Ok(Self::new(host, port))
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_with_default_port(s, DEFAULT_PORT)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for HostAndPort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_error(
    input: &str,
    reason: &str,
) -> Error {
    TopologyError::FailedToParse(format!("{reason} in host '{input}'")).into()
}
