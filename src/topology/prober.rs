use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::HostAndPort;
use crate::Result;

/// What a member says about itself and its set when probed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReply {
    /// Set the member believes it belongs to; `None` for a standalone
    pub set_name: Option<String>,
    pub is_primary: bool,
    pub is_secondary: bool,
    /// Members listed in the responder's replica set configuration
    pub hosts: Vec<HostAndPort>,
    /// Primary as seen by the responder
    pub primary: Option<HostAndPort>,
    pub tags: BTreeMap<String, String>,
}

/// Issues one topology probe against a host
///
/// The wire-level handshake lives outside this crate; the registry is handed
/// an implementation at construction time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostProber: Send + Sync + 'static {
    async fn probe(
        &self,
        host: &HostAndPort,
    ) -> Result<ProbeReply>;
}
