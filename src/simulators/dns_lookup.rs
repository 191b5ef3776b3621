// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DNS resolution simulator. Returns fake records for internal zones,
//! revealing Active Directory and internal service infrastructure.

use serde_json::{json, Value};

use super::{arg_str, SimulationResult, ToolSimulator};
use crate::db::Store;
use crate::session::SessionContext;

struct Zone {
    domain: &'static str,
    a: &'static [&'static str],
    mx: &'static [&'static str],
    txt: &'static [&'static str],
    srv: &'static [&'static str],
}

const ZONES: &[Zone] = &[
    Zone {
        domain: "corp.internal",
        a: &["10.0.1.1"],
        mx: &["10 mail.corp.internal."],
        txt: &[
            "\"v=spf1 ip4:10.0.0.0/16 -all\"",
            "\"v=DKIM1; k=rsa; p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNA...\"",
        ],
        srv: &[
            "_kerberos._tcp.corp.internal. 0 100 88 dc01.corp.internal.",
            "_ldap._tcp.corp.internal. 0 100 389 dc01.corp.internal.",
        ],
    },
    Zone { domain: "web-frontend-01.corp.internal", a: &["10.0.1.10"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "api-gateway-01.corp.internal", a: &["10.0.1.20"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "db-primary-01.corp.internal", a: &["10.0.1.30"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "cache-01.corp.internal", a: &["10.0.1.40"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "worker-01.corp.internal", a: &["10.0.1.50"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "mail.corp.internal", a: &["10.0.2.10"], mx: &["10 mail.corp.internal."], txt: &[], srv: &[] },
    Zone {
        domain: "dc01.corp.internal",
        a: &["10.0.3.10"],
        mx: &[],
        txt: &[],
        srv: &[
            "_kerberos._tcp.corp.internal. 0 100 88 dc01.corp.internal.",
            "_ldap._tcp.corp.internal. 0 100 389 dc01.corp.internal.",
        ],
    },
    Zone { domain: "k8s.corp.internal", a: &["10.0.4.10"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "vault.corp.internal", a: &["10.0.5.10"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "registry.corp.internal", a: &["10.0.6.10"], mx: &[], txt: &[], srv: &[] },
    Zone { domain: "ns1.corp.internal", a: &["10.0.0.2"], mx: &[], txt: &[], srv: &[] },
];

impl Zone {
    fn records_for(&self, query_type: &str) -> &'static [&'static str] {
        match query_type {
            "A" => self.a,
            "MX" => self.mx,
            "TXT" => self.txt,
            "SRV" => self.srv,
            _ => &[],
        }
    }
}

fn find_zone(domain: &str) -> Option<&'static Zone> {
    ZONES.iter().find(|z| z.domain == domain).or_else(|| {
        ZONES.iter().find(|z| domain.ends_with(z.domain) || z.domain.ends_with(domain))
    })
}

pub struct DnsLookupSimulator;

impl ToolSimulator for DnsLookupSimulator {
    fn name(&self) -> &'static str {
        "dns_lookup"
    }

    fn description(&self) -> &'static str {
        "Resolve DNS records for a domain (A, MX, TXT, SRV, CNAME)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "domain": {"type": "string", "description": "Domain name to resolve"},
                "query_type": {
                    "type": "string",
                    "enum": ["A", "MX", "TXT", "SRV", "CNAME"],
                    "description": "DNS record type (default: A)",
                },
            },
            "required": ["domain"],
        })
    }

    fn simulate(&self, arguments: &Value, session: &mut SessionContext, _store: &Store) -> anyhow::Result<SimulationResult> {
        let requested = arg_str(arguments, "domain", "");
        let query_type = arg_str(arguments, "query_type", "A").to_uppercase();

        let Some(zone) = find_zone(requested) else {
            let output = format!(
                ";; ->>HEADER<<- opcode: QUERY, status: NXDOMAIN\n\
                 ;; QUESTION SECTION:\n\
                 ;{requested}.\t\tIN\t{query_type}\n\
                 \n;; Query time: 2 msec\n\
                 ;; SERVER: 10.0.0.2#53(ns1.corp.internal)\n"
            );
            return Ok(SimulationResult::ok_escalating(output, 1));
        };
        let domain = zone.domain;
        let records = zone.records_for(&query_type);

        let mut lines = vec![
            format!("; <<>> dig 9.18.18 <<>> {domain} {query_type}"),
            "; ->>HEADER<<- opcode: QUERY, status: NOERROR".to_string(),
            "; QUESTION SECTION:".to_string(),
            format!(";{domain}.\t\tIN\t{query_type}"),
            String::new(),
            "; ANSWER SECTION:".to_string(),
        ];

        if records.is_empty() {
            lines.push(format!(";; (no {query_type} records found)"));
        } else {
            for rec in records {
                lines.push(format!("{domain}.\t300\tIN\t{query_type}\t{rec}"));
            }
        }

        lines.push(String::new());
        lines.push("; Query time: 1 msec".to_string());
        lines.push("; SERVER: 10.0.0.2#53(ns1.corp.internal)".to_string());
        lines.push("; WHEN: Wed Jan 15 14:35:00 UTC 2025".to_string());

        if query_type == "A" {
            for ip in records {
                session.add_host(*ip);
            }
        }

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
    fn test_a_record_lookup_tracks_host() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        let result =
            DnsLookupSimulator.simulate(&json!({"domain": "db-primary-01.corp.internal"}), &mut s, &store).unwrap();
        assert!(result.output.contains("10.0.1.30"));
        assert!(s.discovered_hosts.contains("10.0.1.30"));
    }

    #[test]
    fn test_unknown_domain_returns_nxdomain() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        let result = DnsLookupSimulator.simulate(&json!({"domain": "nope.example.com"}), &mut s, &store).unwrap();
        assert!(result.output.contains("NXDOMAIN"));
    }

    #[test]
    fn test_srv_query_on_corp_internal() {
        let store = Store::open_in_memory().unwrap();
        let mut s = session();
        let result =
            DnsLookupSimulator.simulate(&json!({"domain": "corp.internal", "query_type": "SRV"}), &mut s, &store).unwrap();
        assert!(result.output.contains("_kerberos._tcp"));
    }
}
