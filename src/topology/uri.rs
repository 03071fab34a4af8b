use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_PORT;
use crate::constants::REPLICA_SET_OPTION;
use crate::constants::URI_PREFIX;
use crate::ConnectionString;
use crate::Error;
use crate::HostAndPort;
use crate::Result;
use crate::TopologyError;

/// Parsed `mongodb://` URI
///
/// Only the pieces needed to locate a deployment are interpreted: the host
/// list, the `replicaSet` option, credentials' user name and the database.
/// Every other option is kept verbatim and can be read through [`MongoUri::option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoUri {
    connection_string: ConnectionString,
    username: String,
    password: String,
    database: String,
    // lowercase key -> (original key, value)
    options: BTreeMap<String, (String, String)>,
}

impl MongoUri {
    pub fn is_mongo_uri(s: &str) -> bool {
        s.starts_with(URI_PREFIX)
    }

    /// Parses a URI; input without the `mongodb://` scheme is treated as a plain
    /// connection string.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let Some(rest) = url.strip_prefix(URI_PREFIX) else {
            return Ok(Self::from(ConnectionString::parse(url)?));
        };

        let (user_and_hosts, db_and_options) = match rest.split_once('/') {
            Some((left, right)) => (left, right),
            None => (rest, ""),
        };
        if db_and_options.is_empty() && user_and_hosts.contains('?') {
            return Err(fail(url, "URI must contain slash delimiter between hosts and options"));
        }

        let (user_info, hosts) = match user_and_hosts.rsplit_once('@') {
            Some((user_info, hosts)) => (user_info, hosts),
            None => ("", user_and_hosts),
        };
        let (username, password) = match user_info.split_once(':') {
            Some((u, p)) => (u, p),
            None => (user_info, ""),
        };
        if username.contains('@') || password.contains('@') || password.contains(':') {
            return Err(fail(url, "username and password must be URL encoded"));
        }

        let (database, option_str) = match db_and_options.split_once('?') {
            Some((db, opts)) => (db, opts),
            None => (db_and_options, ""),
        };
        if database.contains(['/', '\\', ' ', '"', '$']) {
            return Err(fail(url, "database name contains reserved characters"));
        }

        let mut servers = Vec::new();
        for host in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            servers.push(HostAndPort::parse_with_default_port(host, DEFAULT_PORT)?);
        }
        if servers.is_empty() {
            return Err(fail(url, "no server(s) specified"));
        }

        let options = parse_options(url, option_str)?;
        let set_name = match options.get(&REPLICA_SET_OPTION.to_ascii_lowercase()) {
            Some((_, value)) if value.is_empty() => {
                return Err(fail(url, "replicaSet option cannot be empty"));
            }
            Some((_, value)) => value.clone(),
            None => String::new(),
        };

        Ok(Self {
            connection_string: ConnectionString::from_parts(set_name, servers)?,
            username: username.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            options,
        })
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.connection_string
    }

    pub fn set_name(&self) -> &str {
        self.connection_string.set_name()
    }

    pub fn servers(&self) -> &[HostAndPort] {
        self.connection_string.servers()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Case-insensitive option lookup
    pub fn option(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.options.get(&key.to_ascii_lowercase()).map(|(_, v)| v.as_str())
    }

    /// URI without password and options, safe for logs
    pub fn redact(&self) -> String {
        let mut out = String::from(URI_PREFIX);
        if !self.username.is_empty() {
            out.push_str(&self.username);
            out.push('@');
        }
        let hosts: Vec<String> = self.servers().iter().map(ToString::to_string).collect();
        out.push_str(&hosts.join(","));
        if !self.database.is_empty() {
            out.push('/');
            out.push_str(&self.database);
        }
        out
    }
}

impl From<ConnectionString> for MongoUri {
    fn from(connection_string: ConnectionString) -> Self {
        Self {
            connection_string,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            options: BTreeMap::new(),
        }
    }
}

impl FromStr for MongoUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MongoUri {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.redact())
    }
}

fn parse_options(
    url: &str,
    options: &str,
) -> Result<BTreeMap<String, (String, String)>> {
    let mut parsed = BTreeMap::new();
    for pair in options.split(['&', ';']).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| fail(url, &format!("option '{pair}' is missing a value")))?;
        if key.is_empty() {
            return Err(fail(url, "option key cannot be empty"));
        }
        if parsed
            .insert(key.to_ascii_lowercase(), (key.to_string(), value.to_string()))
            .is_some()
        {
            return Err(fail(url, &format!("duplicate option '{key}'")));
        }
    }
    Ok(parsed)
}

fn fail(
    url: &str,
    reason: &str,
) -> Error {
    TopologyError::FailedToParse(format!("{reason}: {url}")).into()
}
