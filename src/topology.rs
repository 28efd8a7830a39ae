//! Replica set topology types.
//!
//! [`ClusterConfig`] is the document handed to `replSetInitiate`; it is
//! built once at startup and passed down unmodified.  [`ClusterStatus`]
//! is the transient snapshot decoded from `replSetGetStatus` and is
//! re-fetched on every poll, never cached.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State label of the member currently accepting writes.
pub const STATE_PRIMARY: &str = "PRIMARY";

/// State label of a healthy replicating member.
pub const STATE_SECONDARY: &str = "SECONDARY";

/// Number of members this tool bootstraps.
pub const MEMBER_COUNT: usize = 3;

/// One member of the replica set configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garde::Validate)]
pub struct MemberSpec {
    /// Member identifier (`_id` on the wire).
    #[serde(rename = "_id", alias = "id")]
    #[garde(range(min = 0, max = 255))]
    pub id: i32,

    /// `host:port` the other members reach this one on.
    #[garde(pattern(r"^[A-Za-z0-9][A-Za-z0-9.\-]*:[0-9]{1,5}$"))]
    pub host: String,

    /// Election priority; the highest-priority member is preferred as primary.
    #[garde(custom(finite_priority), range(min = 0.0, max = 1000.0))]
    pub priority: f64,
}

impl MemberSpec {
    /// Create a member entry.
    pub fn new(id: i32, host: impl Into<String>, priority: f64) -> Self {
        Self {
            id,
            host: host.into(),
            priority,
        }
    }
}

/// The configuration submitted with `replSetInitiate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, garde::Validate)]
pub struct ClusterConfig {
    /// Replica set name (`_id` on the wire).
    #[serde(rename = "_id", alias = "id", default = "default_cluster_id")]
    #[garde(length(min = 1, max = 64))]
    pub id: String,

    /// Members in declaration order.
    #[serde(default = "default_members")]
    #[garde(length(min = 3, max = 3), custom(distinct_members), dive)]
    pub members: Vec<MemberSpec>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            id: default_cluster_id(),
            members: default_members(),
        }
    }
}

impl ClusterConfig {
    /// Host of the highest-priority member (the first one on ties).
    pub fn primary_designate(&self) -> Option<&str> {
        self.members
            .iter()
            .fold(None::<&MemberSpec>, |best, member| match best {
                Some(b) if b.priority >= member.priority => Some(b),
                _ => Some(member),
            })
            .map(|m| m.host.as_str())
    }

    /// Whether `host` names one of the configured members.
    pub fn contains_host(&self, host: &str) -> bool {
        self.members.iter().any(|m| m.host == host)
    }
}

fn default_cluster_id() -> String {
    "rs0".to_string()
}

fn default_members() -> Vec<MemberSpec> {
    vec![
        MemberSpec::new(0, "mongo-primary:27017", 2.0),
        MemberSpec::new(1, "mongo-secondary1:27017", 1.0),
        MemberSpec::new(2, "mongo-secondary2:27017", 1.0),
    ]
}

fn distinct_members(members: &Vec<MemberSpec>, _ctx: &()) -> garde::Result {
    for (i, member) in members.iter().enumerate() {
        for other in &members[i + 1..] {
            if member.id == other.id {
                return Err(garde::Error::new(format!(
                    "duplicate member id {}",
                    member.id
                )));
            }
            if member.host == other.host {
                return Err(garde::Error::new(format!(
                    "duplicate member host {}",
                    member.host
                )));
            }
        }
    }
    Ok(())
}

fn finite_priority(priority: &f64, _ctx: &()) -> garde::Result {
    if priority.is_finite() {
        Ok(())
    } else {
        Err(garde::Error::new(format!("priority must be a finite number, got {priority}")))
    }
}

/// Per-member entry of a status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatus {
    /// Member `host:port`.
    pub name: String,

    /// Human-readable state, e.g. `PRIMARY`, `SECONDARY`, `STARTUP2`.
    #[serde(rename = "stateStr")]
    pub state_str: String,

    /// 1 when the reporting node can reach this member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,

    /// Remaining reply fields (`_id`, `uptime`, optimes, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemberStatus {
    pub fn new(name: impl Into<String>, state_str: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state_str: state_str.into(),
            health: None,
            extra: Map::new(),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.state_str == STATE_PRIMARY
    }
}

/// Snapshot returned by the status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    /// Replica set name, when the reporting node knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    /// Command status flag: 1 on success.
    pub ok: f64,

    #[serde(default)]
    pub members: Vec<MemberStatus>,

    /// Everything else the server reported (`date`, `term`, `myState`,
    /// optimes, ...), kept so the final dump shows the whole reply.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClusterStatus {
    /// A snapshot with `ok: 1`.
    pub fn healthy(members: Vec<MemberStatus>) -> Self {
        Self {
            set: None,
            ok: 1.0,
            members,
            extra: Map::new(),
        }
    }

    /// Whether the query reported `ok == 1`.
    pub fn is_ok(&self) -> bool {
        (self.ok - 1.0).abs() < f64::EPSILON
    }

    /// The first member reporting `PRIMARY` state.
    pub fn primary(&self) -> Option<&MemberStatus> {
        self.members.iter().find(|m| m.is_primary())
    }
}
