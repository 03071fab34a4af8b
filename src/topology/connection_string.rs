use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_PORT;
use crate::Error;
use crate::HostAndPort;
use crate::Result;
use crate::TopologyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    Invalid,
    /// A single standalone server
    Master,
    /// A replica set identified by name plus seed hosts
    Set,
    /// In-process connection, no hosts
    Local,
}

/// Seed description of a deployment: its type, set name and host list
///
/// Canonical replica set form is `setName/host1:port1,host2:port2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionString {
    connection_type: ConnectionType,
    servers: Vec<HostAndPort>,
    set_name: String,
}

impl ConnectionString {
    pub fn for_replica_set(
        set_name: impl Into<String>,
        servers: Vec<HostAndPort>,
    ) -> Self {
        Self {
            connection_type: ConnectionType::Set,
            servers,
            set_name: set_name.into(),
        }
    }

    pub fn for_local() -> Self {
        Self {
            connection_type: ConnectionType::Local,
            servers: Vec::new(),
            set_name: String::new(),
        }
    }

    pub fn for_master(server: HostAndPort) -> Self {
        Self {
            connection_type: ConnectionType::Master,
            servers: vec![server],
            set_name: String::new(),
        }
    }

    /// Builds a connection string from already parsed parts. An empty set name
    /// with exactly one server yields a `Master` connection string.
    pub(crate) fn from_parts(
        set_name: String,
        mut servers: Vec<HostAndPort>,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(TopologyError::FailedToParse("no server(s) specified".into()).into());
        }
        if !set_name.is_empty() {
            return Ok(Self::for_replica_set(set_name, servers));
        }
        if servers.len() == 1 {
            if let Some(server) = servers.pop() {
                return Ok(Self::for_master(server));
            }
        }
        Err(TopologyError::FailedToParse(format!(
            "{} hosts given without a replica set name",
            servers.len()
        ))
        .into())
    }

    /// Parses `setName/host[:port][,host[:port]...]` or a single `host[:port]`.
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_with_default_port(s, DEFAULT_PORT)
    }

    pub fn parse_with_default_port(
        s: &str,
        default_port: u16,
    ) -> Result<Self> {
        let s = s.trim();
        let (set_name, hosts) = match s.split_once('/') {
            Some((name, hosts)) => {
                if name.is_empty() {
                    return Err(TopologyError::FailedToParse(format!("empty replica set name in '{s}'")).into());
                }
                (name.to_string(), hosts)
            }
            None => (String::new(), s),
        };

        let servers = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| HostAndPort::parse_with_default_port(h, default_port))
            .collect::<Result<Vec<_>>>()?;

        Self::from_parts(set_name, servers)
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn is_valid(&self) -> bool {
        self.connection_type != ConnectionType::Invalid
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn servers(&self) -> &[HostAndPort] {
        &self.servers
    }

    /// Returns the set name, failing for anything that is not a replica set.
    pub fn require_set_name(&self) -> Result<&str> {
        if self.connection_type != ConnectionType::Set || self.set_name.is_empty() {
            return Err(TopologyError::NotAReplicaSet(self.to_string()).into());
        }
        Ok(&self.set_name)
    }
}

impl Default for ConnectionString {
    fn default() -> Self {
        Self {
            connection_type: ConnectionType::Invalid,
            servers: Vec::new(),
            set_name: String::new(),
        }
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.connection_type {
            ConnectionType::Local => return f.write_str("localhost"),
            ConnectionType::Set => write!(f, "{}/", self.set_name)?,
            _ => {}
        }
        for (i, server) in self.servers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{server}")?;
        }
        Ok(())
    }
}
