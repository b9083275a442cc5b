//! Built-in YAML templates and the deploy summary text.

use std::fmt::Write as _;

use crate::config::{Inventory, InventoryType, Variables};

const USER_PLACEHOLDER: &str = "${REPOSITORY_USER}";
const PASSWORD_PLACEHOLDER: &str = "${REPOSITORY_PASSWORD}";

const VARS: &str = r#"---
inventory: production

ansible_any_errors_fatal: true
ansible_ignore_unreachable: true
ansible_python_interpreter: /usr/bin/python3

# This setting is always appended to the default ssh command line.
ansible_ssh_extra_args: '-o StrictHostKeyChecking=no'

# The username to use when connecting to the host
# ansible_user: admin

# The connection port number, if not the default (22 for ssh)
# ansible_port: 2222

# Private key file used by ssh.
# ansible_ssh_private_key_file: /home/webitel/.ssh/rsa.key

# The password to use to authenticate to the host
# ansible_ssh_pass: "pAssw0rd"

webitel_version: "23.02"
webitel_repository_user: "${REPOSITORY_USER}"
webitel_repository_password: "${REPOSITORY_PASSWORD}"

rtpengine_mode: "global"

freeswitch_signalwire_key: ""

opensips_version: "3.2"
opensips_fail2ban: true

nginx_letsencrypt: false
nginx_site_name: "webitel.example.com"
nginx_mail_address: "cloud@example.com"

grafana_enable: true
grafana_basic_dashboards: false
grafana_basic_dashboards_language: "en"

# Generate additional locales
locales_gen:
  - "en_US.UTF-8"
"#;

const INVENTORY_LOCALHOST: &str = r#"---
all:
  hosts:
    node1:
      ansible_host: localhost
      ansible_connection: local
      # ansible_user: admin
      # ansible_port: 2222
      webitel_services:
        - consul
        - rabbitmq
        - postgresql
        - postgresql_main
        - freeswitch
        - rtpengine
        - opensips
        - nginx
"#;

const INVENTORY_CUSTOM: &str = r#"---
all:
  hosts:
    node1:
      ansible_host: 1.1.1.1
      # ansible_user: admin
      # ansible_port: 2222
      webitel_services:
        - opensips
        - rtpengine
        - nginx
        - webitel_core
        - webitel_engine
        - webitel_call_center
        - webitel_messages

    node2:
      ansible_host: 2.2.2.2
      webitel_services:
        - postgresql
        - postgresql_main
        - grafana
        - rabbitmq
        - consul
        - webitel_storage

    node3:
      ansible_host: 3.3.3.3
      webitel_services:
        - freeswitch
        - webitel_flow_manager
"#;

/// Variables document with the repository credentials filled in.
pub fn render_vars(user: &str, password: &str) -> String {
    VARS.replace(USER_PLACEHOLDER, &yaml_escape(user))
        .replace(PASSWORD_PLACEHOLDER, &yaml_escape(password))
}

/// Inventory document for the selected template kind.
pub fn inventory(kind: InventoryType) -> &'static str {
    match kind {
        InventoryType::Localhost => INVENTORY_LOCALHOST,
        InventoryType::Custom => INVENTORY_CUSTOM,
    }
}

/// Human readable overview shown before a deploy is confirmed.
///
/// Hosts are listed in name order, each followed by its services in the
/// order they appear in the inventory.
pub fn render_summary(vars: &Variables, inventory: &Inventory) -> String {
    let mut out = String::new();
    let version = if vars.webitel_version.is_empty() {
        "?"
    } else {
        vars.webitel_version.as_str()
    };
    let _ = writeln!(out, "# S U M M A R Y");
    let _ = writeln!(out, "## Webitel v{version}");
    let _ = writeln!(out);

    if inventory.all.hosts.is_empty() {
        let _ = writeln!(out, "No hosts configured.");
        return out;
    }

    let _ = writeln!(out, "Hosts:");
    for (i, (name, host)) in inventory.all.hosts.iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({}):", i + 1, host.address, name);
        if host.services.is_empty() {
            let _ = writeln!(out, "   (no services assigned)");
        }
        for service in &host.services {
            let _ = writeln!(out, "   - {service}");
        }
    }
    out
}

/// Double-quoted YAML scalars only need `\` and `"` escaped.
fn yaml_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Host;

    fn two_hosts() -> Inventory {
        let mut inv = Inventory::default();
        inv.all.hosts.insert(
            "alpha".into(),
            Host {
                address: "10.0.0.1".into(),
                services: vec!["opensips".into(), "nginx".into()],
            },
        );
        inv.all.hosts.insert(
            "beta".into(),
            Host {
                address: "10.0.0.2".into(),
                services: vec!["grafana".into(), "consul".into(), "rabbitmq".into()],
            },
        );
        inv
    }

    #[test]
    fn test_summary_lists_every_host_and_service_once() {
        // Each address and each assigned service appears exactly once.
        let vars = Variables {
            webitel_version: "23.02".into(),
            ..Variables::default()
        };
        let text = render_summary(&vars, &two_hosts());

        assert!(text.contains("## Webitel v23.02"));
        for addr in ["10.0.0.1", "10.0.0.2"] {
            assert_eq!(text.matches(addr).count(), 1, "{addr} in {text}");
        }
        let bullets: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("   - "))
            .collect();
        assert_eq!(
            bullets,
            vec!["opensips", "nginx", "grafana", "consul", "rabbitmq"]
        );
    }

    #[test]
    fn test_summary_without_hosts() {
        // An empty inventory still renders a readable summary.
        let text = render_summary(&Variables::default(), &Inventory::default());
        assert!(text.contains("No hosts configured."));
        assert!(text.contains("Webitel v?"));
    }

    #[test]
    fn test_render_vars_escapes_credentials() {
        // Quotes in a password stay inside the YAML scalar.
        let text = render_vars("bob", "pa\"ss");
        let vars: Variables = serde_yaml::from_str(&text).unwrap();
        assert_eq!(vars.webitel_repository_user, "bob");
        assert_eq!(vars.webitel_repository_password, "pa\"ss");
        assert!(vars.opensips_fail2ban);
        assert_eq!(vars.locales_gen, vec!["en_US.UTF-8".to_string()]);
    }

    #[test]
    fn test_inventory_templates_parse() {
        // Both inventory templates are valid documents.
        for kind in [InventoryType::Localhost, InventoryType::Custom] {
            let inv: Inventory = serde_yaml::from_str(inventory(kind)).unwrap();
            assert!(!inv.all.hosts.is_empty());
        }
    }
}
