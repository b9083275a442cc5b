//! Command line interface.

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{InventoryType, LogFormat, LogLevel, LogSettings, Settings};

#[derive(Parser, Debug)]
#[command(name = "wdeploy")]
#[command(about = "Configure and deploy Webitel from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the deploy console
    Run(RunArgs),
    /// Print the reference manual
    #[command(hide = true)]
    Man,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log verbosity
    #[arg(short = 'l', long, env = "WDEPLOY_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log file format
    #[arg(short = 'F', long, env = "WDEPLOY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Directory for wdeploy.log and ansible.log
    #[arg(short = 'L', long, env = "WDEPLOY_LOG_PATH", default_value = "./")]
    pub log_path: PathBuf,

    /// Variables file (default: <data dir>/wdeploy/<user>/vars/vars.yml)
    #[arg(short = 'V', long = "vars", env = "WDEPLOY_VARS")]
    pub vars: Option<PathBuf>,

    /// Inventory file (default: <data dir>/wdeploy/<user>/hosts/hosts.yml)
    #[arg(short = 'i', long = "inventory", env = "WDEPLOY_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Webitel repository user
    #[arg(short = 'u', long = "user", env = "WDEPLOY_USER", default_value = "")]
    pub user: String,

    /// Webitel repository password
    #[arg(
        short = 'p',
        long = "password",
        env = "WDEPLOY_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    /// Inventory template used when no inventory exists yet
    #[arg(short = 't', long = "type", env = "WDEPLOY_TYPE", value_enum, default_value_t = InventoryType::Localhost)]
    pub inventory_type: InventoryType,

    /// Playbook to run
    #[arg(long, env = "WDEPLOY_PLAYBOOK", default_value = "playbook.yml")]
    pub playbook: PathBuf,

    /// ansible-playbook executable
    #[arg(long, env = "WDEPLOY_ANSIBLE_PLAYBOOK", default_value = "ansible-playbook")]
    pub ansible_playbook: String,

    /// Key bindings file
    #[arg(long, env = "WDEPLOY_SHORTCUTS", default_value = "shortcut.toml")]
    pub shortcuts: PathBuf,
}

impl From<RunArgs> for Settings {
    fn from(args: RunArgs) -> Self {
        Settings {
            log: LogSettings {
                level: args.log_level,
                format: args.log_format,
                directory: args.log_path,
            },
            vars_file: args.vars,
            hosts_file: args.inventory,
            repository_user: args.user,
            repository_password: args.password,
            inventory_type: args.inventory_type,
            playbook: args.playbook,
            ansible_playbook: args.ansible_playbook,
            shortcuts_file: args.shortcuts,
        }
    }
}

/// Long help of the program and of every visible subcommand.
pub fn reference_doc() -> String {
    let mut cmd = Cli::command();
    let mut out = cmd.render_long_help().to_string();
    if let Some(run) = cmd.find_subcommand_mut("run") {
        out.push_str("\n\nwdeploy run\n\n");
        out.push_str(&run.render_long_help().to_string());
    }
    out
}
