//! Final human-readable report printed after a successful run.

use std::fmt::Write as _;

use crate::bootstrap::BootstrapOutcome;
use crate::topology::{
    ClusterStatus, MemberStatus, MEMBER_COUNT, STATE_PRIMARY, STATE_SECONDARY,
};

/// Members that are neither PRIMARY nor SECONDARY.
pub fn unsettled_members(status: &ClusterStatus) -> Vec<&MemberStatus> {
    status
        .members
        .iter()
        .filter(|m| m.state_str != STATE_PRIMARY && m.state_str != STATE_SECONDARY)
        .collect()
}

/// Pretty JSON dump of a status snapshot.
pub fn render_status(status: &ClusterStatus) -> String {
    serde_json::to_string_pretty(status).unwrap_or_else(|e| format!("<unrenderable status: {e}>"))
}

/// One line per member plus a role count.
pub fn topology_summary(status: &ClusterStatus) -> String {
    let mut out = String::new();
    for member in &status.members {
        let _ = writeln!(out, "  {:<28} {}", member.name, member.state_str);
    }
    let primaries = status.members.iter().filter(|m| m.is_primary()).count();
    let secondaries = status
        .members
        .iter()
        .filter(|m| m.state_str == STATE_SECONDARY)
        .count();
    let _ = writeln!(
        out,
        "  {primaries} primary, {secondaries} secondary ({} of {MEMBER_COUNT} members reporting)",
        status.members.len()
    );
    out
}

pub fn render_outcome(outcome: &BootstrapOutcome) -> String {
    let mut out = String::new();
    let status = match outcome {
        BootstrapOutcome::AlreadyInitialized(status) => {
            let _ = writeln!(
                out,
                "Replica set {} was already initialized",
                status.set.as_deref().unwrap_or("(unnamed)")
            );
            if let Some(primary) = status.primary() {
                let _ = writeln!(out, "Primary: {}", primary.name);
            }
            status
        }
        BootstrapOutcome::Initialized(info) => {
            let _ = writeln!(
                out,
                "Replica set {} initialized successfully after {} status polls",
                info.status.set.as_deref().unwrap_or("(unnamed)"),
                info.ticks
            );
            match &info.primary {
                Some(name) => {
                    let _ = writeln!(out, "Primary: {name}");
                }
                None => {
                    let _ = writeln!(out, "Primary: none elected yet");
                }
            }
            &info.status
        }
    };
    let _ = writeln!(out, "Members:");
    out.push_str(&topology_summary(status));
    let _ = writeln!(out, "Replica set status:");
    out.push_str(&render_status(status));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::PrimaryInfo;

    fn settled() -> ClusterStatus {
        ClusterStatus {
            set: Some("rs0".to_string()),
            ok: 1.0,
            members: vec![
                MemberStatus::new("mongo-primary:27017", STATE_PRIMARY),
                MemberStatus::new("mongo-secondary1:27017", STATE_SECONDARY),
                MemberStatus::new("mongo-secondary2:27017", "STARTUP2"),
            ],
            extra: Default::default(),
        }
    }

    #[test]
    fn test_unsettled_members() {
        let status = settled();
        let unsettled = unsettled_members(&status);
        assert_eq!(unsettled.len(), 1);
        assert_eq!(unsettled[0].name, "mongo-secondary2:27017");
    }

    #[test]
    fn test_render_status_keeps_full_reply() {
        let status: ClusterStatus = serde_json::from_str(
            r#"{"set":"rs0","date":"2024-01-01T00:00:00Z","myState":1,"term":3,"ok":1,"members":[
                {"_id":0,"name":"mongo-primary:27017","health":1,"stateStr":"PRIMARY","uptime":42,"optimeDate":"x"}
            ]}"#,
        )
        .unwrap();
        let dump = render_status(&status);
        assert!(dump.contains("\"term\": 3"));
        assert!(dump.contains("\"myState\": 1"));
        assert!(dump.contains("\"date\""));
        assert!(dump.contains("\"uptime\": 42"));
        assert!(dump.contains("\"optimeDate\": \"x\""));
        assert!(dump.contains("\"stateStr\": \"PRIMARY\""));
    }

    #[test]
    fn test_topology_summary_counts_roles() {
        let summary = topology_summary(&settled());
        assert!(summary.contains("mongo-primary:27017"));
        assert!(summary.contains("STARTUP2"));
        assert!(summary.contains("1 primary, 1 secondary (3 of 3 members reporting)"));
    }

    #[test]
    fn test_render_initialized_names_primary() {
        let outcome = BootstrapOutcome::Initialized(PrimaryInfo {
            primary: Some("mongo-primary:27017".to_string()),
            status: settled(),
            ticks: 2,
        });
        let text = render_outcome(&outcome);
        assert!(text.starts_with("Replica set rs0 initialized successfully after 2 status polls"));
        assert!(text.contains("Primary: mongo-primary:27017"));
        assert!(text.contains("\"stateStr\": \"PRIMARY\""));
    }

    #[test]
    fn test_render_initialized_without_primary() {
        let mut status = settled();
        status.members[0].state_str = "STARTUP2".to_string();
        let outcome = BootstrapOutcome::Initialized(PrimaryInfo {
            primary: None,
            status,
            ticks: 1,
        });
        assert!(render_outcome(&outcome).contains("Primary: none elected yet"));
    }

    #[test]
    fn test_render_already_initialized() {
        let text = render_outcome(&BootstrapOutcome::AlreadyInitialized(settled()));
        assert!(text.starts_with("Replica set rs0 was already initialized"));
        assert!(text.contains("Primary: mongo-primary:27017"));
        assert!(text.contains("Replica set status:"));
    }
}
