// -
// Connection strings

/// Port assumed for hosts written without one
pub const DEFAULT_PORT: u16 = 27017;

/// Scheme prefix recognised by the URI parser
pub(crate) const URI_PREFIX: &str = "mongodb://";

/// URI option carrying the replica set name
pub(crate) const REPLICA_SET_OPTION: &str = "replicaSet";

// -
// Diagnostic report keys

pub(crate) const REPORT_KEY_REPLICA_SETS: &str = "replicaSets";
pub(crate) const REPORT_KEY_PING_TIMES: &str = "replicaSetPingTimesMillis";

// -
// Index catalog

/// Name of the mandatory primary-key index
pub const ID_INDEX_NAME: &str = "_id_";
