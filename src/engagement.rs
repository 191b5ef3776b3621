// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progressive engagement: escalation scoring and probabilistic breadcrumb
//! or transient-error injection into simulator output.

use rand::Rng;

use crate::session::SessionContext;

const BREADCRUMBS_BY_LEVEL: [&[&str]; 4] = [
    &[
        "Hint: Internal network range is 10.0.0.0/16",
        "Note: Default SSH port is open on most internal hosts",
    ],
    &[
        "Breadcrumb: Configuration files are typically at /app/config.yaml",
        "Breadcrumb: The .env file contains database credentials",
        "Breadcrumb: Internal DNS resolves *.corp.internal",
        "Breadcrumb: Jump server available at 10.0.0.5",
    ],
    &[
        "Breadcrumb: SQL injection detected in /api/users endpoint",
        "Breadcrumb: Admin panel at /admin uses default credentials from config.yaml",
        "Breadcrumb: AWS credentials stored in /home/deploy/.aws/credentials",
        "Breadcrumb: Backup script runs as root via cron at 3 AM",
        "Breadcrumb: PostgreSQL accepts connections from any internal host",
    ],
    &[
        "Breadcrumb: Production database backup at s3://corp-internal-backups/db/",
        "Breadcrumb: Deploy keys in internal_tools.deploy_keys table",
        "Breadcrumb: Root SSH key stored in /root/.ssh/id_rsa (passwordless)",
        "Breadcrumb: Kubernetes API at https://k8s.corp.internal:6443 (no auth)",
    ],
];

const TRANSIENT_ERRORS: [&str; 4] = [
    "Connection timed out. Retrying...",
    "Error: ECONNRESET - peer reset connection. Please retry.",
    "503 Service Temporarily Unavailable",
    "Warning: Rate limit approaching (90/100 requests per minute)",
];

/// Escalation score in 0..=3, summing one point each for: >=2 hosts,
/// >=2 files, >=1 credential, >=10 interactions.
pub fn compute_escalation(session: &SessionContext) -> i64 {
    let mut score = 0i64;
    if session.discovered_hosts.len() >= 2 {
        score += 1;
    }
    if session.discovered_files.len() >= 2 {
        score += 1;
    }
    if !session.discovered_credentials.is_empty() {
        score += 1;
    }
    if session.interaction_count >= 10 {
        score += 1;
    }
    score.min(3)
}

pub fn get_breadcrumb(session: &SessionContext) -> Option<&'static str> {
    let level = session.escalation_level.clamp(0, 3) as usize;
    let crumbs = BREADCRUMBS_BY_LEVEL[level];
    if crumbs.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..crumbs.len());
    Some(crumbs[idx])
}

pub fn should_inject_error(session: &SessionContext) -> bool {
    if session.interaction_count < 5 {
        return false;
    }
    rand::rng().random::<f64>() < 0.10
}

pub fn get_transient_error() -> &'static str {
    let idx = rand::rng().random_range(0..TRANSIENT_ERRORS.len());
    TRANSIENT_ERRORS[idx]
}

/// Optionally prepend a transient error or append a breadcrumb to raw
/// simulator output.
pub fn enrich_output(output: &str, session: &SessionContext) -> String {
    if should_inject_error(session) {
        return format!("{}\n\n{output}", get_transient_error());
    }

    if let Some(breadcrumb) = get_breadcrumb(session) {
        if rand::rng().random::<f64>() < 0.3 {
            return format!("{output}\n\n# {breadcrumb}");
        }
    }

    output.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    fn bare_session() -> SessionContext {
        SessionContext {
            session_id: "a".repeat(32),
            client_info: serde_json::json!({}),
            escalation_level: 0,
            discovered_hosts: IndexSet::new(),
            discovered_ports: IndexSet::new(),
            discovered_files: IndexSet::new(),
            discovered_credentials: IndexSet::new(),
            interaction_count: 0,
        }
    }

    #[test]
    fn test_escalation_needs_two_hosts() {
        let mut s = bare_session();
        s.add_host("10.0.1.1");
        assert_eq!(compute_escalation(&s), 0);
        s.add_host("10.0.1.2");
        assert_eq!(compute_escalation(&s), 1);
    }

    #[test]
    fn test_escalation_caps_at_three() {
        let mut s = bare_session();
        s.add_host("a");
        s.add_host("b");
        s.add_file("f1");
        s.add_file("f2");
        s.add_credential("db_credential:x");
        s.interaction_count = 20;
        assert_eq!(compute_escalation(&s), 3);
    }

    #[test]
    fn test_should_inject_error_false_below_five_interactions() {
        let mut s = bare_session();
        s.interaction_count = 4;
        assert!(!should_inject_error(&s));
    }

    #[test]
    fn test_breadcrumb_levels_nonempty() {
        for level in 0..=3 {
            let mut s = bare_session();
            s.escalation_level = level;
            assert!(get_breadcrumb(&s).is_some());
        }
    }
}
