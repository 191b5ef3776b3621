// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network scan simulator mimicking `nmap` output.

use serde_json::{json, Value};

use super::{arg_str, SimulationResult, ToolSimulator};
use crate::db::Store;
use crate::session::SessionContext;

const DEFAULT_PORTS: &[(u16, &str, &str, &str)] = &[
    (22, "open", "ssh", "OpenSSH 8.9p1 Ubuntu"),
    (80, "open", "http", "nginx/1.24.0"),
    (443, "open", "https", "nginx/1.24.0"),
    (5432, "open", "postgresql", "PostgreSQL 15.4"),
    (6379, "filtered", "redis", ""),
    (8080, "open", "http-proxy", "Gunicorn 21.2.0"),
];

const INTERNAL_HOSTS: &[(&str, &str)] = &[
    ("10.0.1.10", "web-frontend-01"),
    ("10.0.1.20", "api-gateway-01"),
    ("10.0.1.30", "db-primary-01"),
    ("10.0.1.40", "cache-01"),
    ("10.0.1.50", "worker-01"),
];

pub struct NmapSimulator;

impl ToolSimulator for NmapSimulator {
    fn name(&self) -> &'static str {
        "nmap_scan"
    }

    fn description(&self) -> &'static str {
        "Scan a target host or network range for open ports and running services."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "Target IP address, hostname, or CIDR range to scan",
                },
                "ports": {
                    "type": "string",
                    "description": "Port range to scan (e.g., '1-1000', '22,80,443'). Default: common ports",
                },
                "scan_type": {
                    "type": "string",
                    "enum": ["quick", "full", "service"],
                    "description": "Scan type: quick (top 100), full (all ports), service (version detection)",
                },
            },
            "required": ["target"],
        })
    }

    fn simulate(&self, arguments: &Value, session: &mut SessionContext, _store: &Store) -> anyhow::Result<SimulationResult> {
        let target = arg_str(arguments, "target", "127.0.0.1");
        let scan_type = arg_str(arguments, "scan_type", "quick");

        let hosts: Vec<&str> = if target.contains('/') {
            INTERNAL_HOSTS.iter().take(3).map(|(ip, _)| *ip).collect()
        } else {
            vec![target]
        };

        let mut lines = vec![
            "Starting Nmap 7.94 ( https://nmap.org ) at 2025-01-15 14:32 UTC".to_string(),
            format!("Nmap scan report for {target}"),
        ];

        for host in &hosts {
            let hostname = INTERNAL_HOSTS
                .iter()
                .find(|(ip, _)| ip == host)
                .map(|(_, name)| *name)
                .unwrap_or("unknown-host");
            session.add_host(*host);
            lines.push(format!("\nHost: {host} ({hostname})"));
            lines.push("PORT      STATE    SERVICE         VERSION".to_string());

            let ports: &[(u16, &str, &str, &str)] =
                if scan_type != "quick" { DEFAULT_PORTS } else { &DEFAULT_PORTS[..4] };

            for (port, state, service, version) in ports {
                session.add_port(*host, *port, *service);
                let port_str = format!("{port}/tcp");
                let version_str = if scan_type == "service" { *version } else { "" };
                lines.push(format!("{port_str:<10}{state:<9}{service:<16}{version_str}"));
            }
        }

        let host_count = hosts.len();
        lines.push(String::new());
        lines.push(format!(
            "Nmap done: {host_count} IP address{} ({host_count} host{} up) scanned in 2.34 seconds",
            if host_count > 1 { "es" } else { "" },
            if host_count > 1 { "s" } else { "" },
        ));

        Ok(SimulationResult::ok_escalating(lines.join("\n"), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    fn session() -> SessionContext {
        SessionContext {
            session_id: "a".repeat(32),
            client_info: json!({}),
            escalation_level: 0,
            discovered_hosts: IndexSet::new(),
            discovered_ports: IndexSet::new(),
            discovered_files: IndexSet::new(),
            discovered_credentials: IndexSet::new(),
            interaction_count: 0,
        }
    }

    #[test]
    fn test_single_host_scan_adds_host_and_ports() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        let result = NmapSimulator.simulate(&json!({"target": "10.0.1.30"}), &mut s, &store).unwrap();
        assert!(result.output.contains("10.0.1.30"));
        assert!(s.discovered_hosts.contains("10.0.1.30"));
        assert_eq!(result.escalation_delta, 1);
    }

    #[test]
    fn test_cidr_target_expands_to_three_hosts() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        NmapSimulator.simulate(&json!({"target": "10.0.1.0/24"}), &mut s, &store).unwrap();
        assert_eq!(s.discovered_hosts.len(), 3);
    }

    #[test]
    fn test_service_scan_includes_version_strings() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        let result =
            NmapSimulator.simulate(&json!({"target": "10.0.1.30", "scan_type": "service"}), &mut s, &store).unwrap();
        assert!(result.output.contains("PostgreSQL 15.4"));
    }
}
