//! Execution profile shared by every container the operator starts
use serde_json::{json, Value};

pub const RUN_AS_USER: i64 = 1000;

#[must_use]
pub fn container_security_context() -> Value {
    json!({
        "capabilities": {
            "drop": ["ALL"]
        },
        "privileged": false,
        "allowPrivilegeEscalation": false,
        "readOnlyRootFilesystem": true,
        "runAsNonRoot": true,
        "runAsUser": RUN_AS_USER,
        "seccompProfile": {
            "type": "RuntimeDefault"
        }
    })
}

/// Mounted volumes are group owned by the same id the containers run as
#[must_use]
pub fn pod_security_context() -> Value {
    json!({
        "fsGroup": RUN_AS_USER
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodSecurityContext, SecurityContext};

    #[test]
    fn container_profile_is_locked_down() {
        let sc: SecurityContext = serde_json::from_value(container_security_context()).unwrap();
        assert_eq!(sc.run_as_user, Some(1000));
        assert_eq!(sc.run_as_non_root, Some(true));
        assert_eq!(sc.allow_privilege_escalation, Some(false));
        assert_eq!(sc.read_only_root_filesystem, Some(true));
        assert_eq!(sc.capabilities.unwrap().drop, Some(vec!["ALL".to_string()]));
        assert_eq!(sc.seccomp_profile.unwrap().type_, "RuntimeDefault");
    }

    #[test]
    fn pod_profile_sets_fs_group() {
        let sc: PodSecurityContext = serde_json::from_value(pod_security_context()).unwrap();
        assert_eq!(sc.fs_group, Some(RUN_AS_USER));
    }
}
