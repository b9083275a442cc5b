//! Deploy settings, the variables/inventory YAML documents and their persistence.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::templates;

/// File name of the provisioning transcript inside the log directory.
pub const ANSIBLE_LOG_FILE: &str = "ansible.log";

/// Errors raised while loading or re-reading the deploy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("repository credentials are missing: pass --user and --password or set them in {0}")]
    MissingCredentials(PathBuf),

    #[error("no data directory available for default config paths")]
    NoDataDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Verbosity accepted by `--log-level`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            // tracing has no level above error.
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}

/// Output encoding of the log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Which built-in inventory template is materialized on first run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InventoryType {
    #[default]
    Localhost,
    Custom,
}

/// Logging related settings.
#[derive(Clone, Debug)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub directory: PathBuf,
}

/// Settings resolved once from the command line. Never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Settings {
    pub log: LogSettings,
    /// Explicit variables file; defaults to the per-user data directory.
    pub vars_file: Option<PathBuf>,
    /// Explicit inventory file; defaults to the per-user data directory.
    pub hosts_file: Option<PathBuf>,
    pub repository_user: String,
    pub repository_password: String,
    pub inventory_type: InventoryType,
    /// Playbook passed to the provisioning tool.
    pub playbook: PathBuf,
    /// Executable of the provisioning tool.
    pub ansible_playbook: String,
    /// Optional TOML file with key binding overrides.
    pub shortcuts_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogSettings {
                level: LogLevel::Info,
                format: LogFormat::Plain,
                directory: PathBuf::from("./"),
            },
            vars_file: None,
            hosts_file: None,
            repository_user: String::new(),
            repository_password: String::new(),
            inventory_type: InventoryType::Localhost,
            playbook: PathBuf::from("playbook.yml"),
            ansible_playbook: "ansible-playbook".into(),
            shortcuts_file: PathBuf::from("shortcut.toml"),
        }
    }
}

/// Flat key/value settings that drive the deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variables {
    pub inventory: String,
    pub ansible_any_errors_fatal: bool,
    pub ansible_ignore_unreachable: bool,
    pub ansible_python_interpreter: String,
    /// Always appended to the default ssh command line.
    pub ansible_ssh_extra_args: String,
    pub ansible_user: String,
    pub ansible_port: Option<u16>,
    pub ansible_ssh_private_key_file: String,
    pub ansible_ssh_pass: String,

    pub webitel_version: String,
    pub webitel_repository_user: String,
    pub webitel_repository_password: String,

    pub rtpengine_mode: String,
    pub freeswitch_signalwire_key: String,
    pub opensips_version: String,
    pub opensips_fail2ban: bool,

    pub nginx_letsencrypt: bool,
    pub nginx_site_name: String,
    pub nginx_mail_address: String,
    pub grafana_enable: bool,
    pub grafana_basic_dashboards: bool,
    pub grafana_basic_dashboards_language: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locales_gen: Vec<String>,
}

/// Ansible inventory: `all.hosts.<name>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub all: HostGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostGroup {
    #[serde(default)]
    pub hosts: BTreeMap<String, Host>,
}

/// One deploy target and the services placed on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(rename = "ansible_host", default)]
    pub address: String,
    #[serde(rename = "webitel_services", default)]
    pub services: Vec<String>,
}

/// Which of the two YAML documents an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKind {
    Vars,
    Hosts,
}

/// Settings plus the parsed configuration documents the UI works on.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub settings: Settings,
    pub vars_path: PathBuf,
    pub hosts_path: PathBuf,
    pub vars: Variables,
    pub inventory: Inventory,
}

impl DeployConfig {
    /// Resolve paths, materialize missing documents from templates, parse both
    /// and check that repository credentials are available.
    pub fn load(settings: Settings) -> Result<Self, ConfigError> {
        let vars_path = match &settings.vars_file {
            Some(p) => p.clone(),
            None => default_config_path("vars", &settings.repository_user)?,
        };
        let hosts_path = match &settings.hosts_file {
            Some(p) => p.clone(),
            None => default_config_path("hosts", &settings.repository_user)?,
        };
        tracing::info!(
            vars = %vars_path.display(),
            hosts = %hosts_path.display(),
            "config paths resolved"
        );

        if !vars_path.is_file() {
            let text = templates::render_vars(
                &settings.repository_user,
                &settings.repository_password,
            );
            materialize(&vars_path, &text)?;
        }
        if !hosts_path.is_file() {
            materialize(&hosts_path, templates::inventory(settings.inventory_type))?;
        }

        let mut cfg = Self {
            settings,
            vars_path,
            hosts_path,
            vars: Variables::default(),
            inventory: Inventory::default(),
        };
        for kind in [ConfigKind::Vars, ConfigKind::Hosts] {
            let text = cfg.read_raw(kind)?;
            cfg.apply_raw(kind, &text)?;
        }

        if cfg.repository_user().is_empty() || cfg.repository_password().is_empty() {
            return Err(ConfigError::MissingCredentials(cfg.vars_path.clone()));
        }
        Ok(cfg)
    }

    /// Backing file of a document.
    pub fn path(&self, kind: ConfigKind) -> &Path {
        match kind {
            ConfigKind::Vars => &self.vars_path,
            ConfigKind::Hosts => &self.hosts_path,
        }
    }

    /// Read the raw text of a document without touching the parsed state.
    pub fn read_raw(&self, kind: ConfigKind) -> Result<String, ConfigError> {
        let path = self.path(kind);
        fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse `text` and replace the in-memory document on success.
    pub fn apply_raw(&mut self, kind: ConfigKind, text: &str) -> Result<(), ConfigError> {
        let path = self.path(kind).to_path_buf();
        let parse_err = move |source| ConfigError::Parse { path, source };
        match kind {
            ConfigKind::Vars => self.vars = parse_document(text).map_err(parse_err)?,
            ConfigKind::Hosts => self.inventory = parse_document(text).map_err(parse_err)?,
        }
        Ok(())
    }

    /// Repository user from the variables file, falling back to the CLI.
    pub fn repository_user(&self) -> &str {
        non_empty_or(
            &self.vars.webitel_repository_user,
            &self.settings.repository_user,
        )
    }

    /// Repository password from the variables file, falling back to the CLI.
    pub fn repository_password(&self) -> &str {
        non_empty_or(
            &self.vars.webitel_repository_password,
            &self.settings.repository_password,
        )
    }

    /// Version tag shown in status bars.
    pub fn version_tag(&self) -> String {
        if self.vars.webitel_version.is_empty() {
            "v?".into()
        } else {
            format!("v{}", self.vars.webitel_version)
        }
    }

    /// Transcript file written by the provisioning runner.
    pub fn ansible_log_path(&self) -> PathBuf {
        self.settings.log.directory.join(ANSIBLE_LOG_FILE)
    }
}

/// Empty documents deserialize to defaults instead of failing.
fn parse_document<T: Default + for<'de> Deserialize<'de>>(
    text: &str,
) -> Result<T, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(text)
}

fn non_empty_or<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.is_empty() { fallback } else { primary }
}

/// `<data_dir>/wdeploy/<user>/<kind>/<kind>.yml`
fn default_config_path(kind: &str, user: &str) -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    let user = if user.is_empty() { "default" } else { user };
    Ok(base
        .join("wdeploy")
        .join(user)
        .join(kind)
        .join(format!("{kind}.yml")))
}

/// Write a template to `path`, creating parent directories.
fn materialize(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)?;
    tracing::info!(path = %path.display(), "created config from template");
    Ok(())
}

/// Configuration rooted in `dir`, with credentials and templates in place.
#[cfg(test)]
pub(crate) fn test_config(dir: &Path) -> DeployConfig {
    let settings = Settings {
        vars_file: Some(dir.join("vars.yml")),
        hosts_file: Some(dir.join("hosts.yml")),
        repository_user: "alice".into(),
        repository_password: "secret".into(),
        log: LogSettings {
            directory: dir.to_path_buf(),
            ..Settings::default().log
        },
        ..Settings::default()
    };
    match DeployConfig::load(settings) {
        Ok(cfg) => cfg,
        Err(e) => panic!("test config: {e}"),
    }
}
