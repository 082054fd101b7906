//! 🔧 Client Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment: `ELASTX_*` env vars as the base layer, an optional TOML file on top.
//! Nested keys in env vars use `__`, so `ELASTX_TRANSPORT__TIMEOUT_MS=5000` lands in
//! `transport.timeout_ms`. Hosts take a list, one string, or a comma-separated string:
//! `ELASTX_HOSTS=es1:9200,es2:9200` and `ELASTX_HOSTS="[es1:9200, es2:9200]"` both work.

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::document::DocumentConfig;
use crate::transport::TransportConfig;

/// 📦 Everything a [`crate::Client`] needs to know before its first request.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// 📡 The nodes, in order. `host`, `host:port`, or `scheme://host:port`.
    #[serde(default = "default_hosts", deserialize_with = "deserialize_hosts")]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

fn default_hosts() -> Vec<String> {
    vec!["localhost:9200".to_string()]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostList {
    Many(Vec<String>),
    One(String),
}

/// 📡 A list as-is; a single string split on commas. Env vars rarely come as arrays.
fn deserialize_hosts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match HostList::deserialize(deserializer)? {
        HostList::Many(hosts) => hosts,
        HostList::One(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            transport: TransportConfig::default(),
            document: DocumentConfig::default(),
        }
    }
}

impl ClientConfig {
    /// 🏗️ Defaults everywhere except the host list.
    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// 🚀 Load the config, from a file, from env vars, or from the sheer power of hoping.
///
/// 📐 DESIGN NOTE:
///   - `config_file_name` is None → env vars only, defaults for the rest.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<ClientConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("ELASTX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (ELASTX_*). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (ELASTX_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ExhaustionPolicy, SelectionPolicy};
    use figment::Jail;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write the temp config.");
        file
    }

    #[test]
    fn the_one_where_every_knob_is_turned() {
        let file = write_test_config(
            r#"
            hosts = ["es-1:9200", "https://es-2:9243"]

            [transport]
            connect_timeout_ms = 1000
            timeout_ms = 5000
            selection = "first_alive"
            exhaustion = "resurrect"
            username = "elastic"
            password = "changeme"

            [document]
            auto_populate = true
            "#,
        );

        let config = load_config(Some(file.path())).expect("💀 Full config should parse.");

        assert_eq!(config.hosts, vec!["es-1:9200", "https://es-2:9243"]);
        assert_eq!(config.transport.connect_timeout_ms, 1000);
        assert_eq!(config.transport.timeout_ms, 5000);
        assert_eq!(config.transport.selection, SelectionPolicy::FirstAlive);
        assert_eq!(config.transport.exhaustion, ExhaustionPolicy::Resurrect);
        assert_eq!(config.transport.username.as_deref(), Some("elastic"));
        assert!(config.document.auto_populate);
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let file = write_test_config("");

        let config: ClientConfig = Figment::new()
            .merge(Toml::file(file.path()))
            .extract()
            .expect("💀 An empty file should fall back to defaults.");

        assert_eq!(config.hosts, vec!["localhost:9200"]);
        assert_eq!(config.transport.connect_timeout_ms, 10_000);
        assert_eq!(config.transport.timeout_ms, 30_000);
        assert_eq!(config.transport.selection, SelectionPolicy::RoundRobin);
        assert_eq!(config.transport.exhaustion, ExhaustionPolicy::Fail);
        assert!(config.transport.api_key.is_none());
        assert!(!config.document.auto_populate);
    }

    #[test]
    fn the_one_where_a_serialized_config_comes_home_intact() {
        // 🧪 build the file with the toml crate instead of by hand
        let table = toml::toml! {
            hosts = ["a:9200", "b:9200", "c:9200"]
            [transport]
            api_key = "c2VjcmV0"
        };
        let file = write_test_config(&table.to_string());

        let config = load_config(Some(file.path())).expect("💀 Generated config should parse.");
        assert_eq!(config.hosts.len(), 3);
        assert_eq!(config.transport.api_key.as_deref(), Some("c2VjcmV0"));
    }

    #[test]
    fn the_one_where_a_typo_in_the_policy_is_caught_with_context() {
        let file = write_test_config(
            r#"
            [transport]
            selection = "vibes_based"
            "#,
        );

        let err = load_config(Some(file.path())).expect_err("💀 Unknown policy must not parse.");
        assert!(format!("{:#}", err).contains("Failed to parse configuration"));
    }

    #[test]
    fn the_one_where_with_hosts_keeps_the_other_defaults() {
        let config = ClientConfig::with_hosts(["x:1", "y:2"]);
        assert_eq!(config.hosts, vec!["x:1", "y:2"]);
        assert_eq!(config.transport.timeout_ms, 30_000);
    }

    // 🔒 Jail serializes env access across tests and restores the environment afterwards.
    #[test]
    fn the_one_where_the_environment_speaks_up() {
        Jail::expect_with(|jail| {
            jail.set_env("ELASTX_HOSTS", "es1:9200");
            jail.set_env("ELASTX_TRANSPORT__TIMEOUT_MS", "5000");
            jail.set_env("ELASTX_TRANSPORT__SELECTION", "first_alive");
            jail.set_env("ELASTX_DOCUMENT__AUTO_POPULATE", "true");

            let config = load_config(None).map_err(|e| format!("{:#}", e))?;
            assert_eq!(config.hosts, vec!["es1:9200"]);
            assert_eq!(config.transport.timeout_ms, 5000);
            assert_eq!(config.transport.selection, SelectionPolicy::FirstAlive);
            assert!(config.document.auto_populate);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_hosts_arrive_comma_separated_or_bracketed() {
        Jail::expect_with(|jail| {
            jail.set_env("ELASTX_HOSTS", "es1:9200, es2:9200,");
            let config = load_config(None).map_err(|e| format!("{:#}", e))?;
            assert_eq!(config.hosts, vec!["es1:9200", "es2:9200"]);

            jail.set_env("ELASTX_HOSTS", "[es1:9200, es2:9200]");
            let config = load_config(None).map_err(|e| format!("{:#}", e))?;
            assert_eq!(config.hosts, vec!["es1:9200", "es2:9200"]);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_file_outranks_the_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("ELASTX_HOSTS", "from-env:9200");
            jail.set_env("ELASTX_TRANSPORT__TIMEOUT_MS", "1234");
            jail.create_file("elastx.toml", r#"hosts = ["from-file:9200"]"#)?;

            let config = load_config(Some(Path::new("elastx.toml")))
                .map_err(|e| format!("{:#}", e))?;
            assert_eq!(config.hosts, vec!["from-file:9200"]);
            // -- 🤝 keys the file doesn't mention still come from the environment
            assert_eq!(config.transport.timeout_ms, 1234);
            Ok(())
        });
    }
}
