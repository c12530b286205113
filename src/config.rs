//! Configuration for the localturk server.
//!
//! Settings come from the command line; a few can also be set via environment
//! variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `4321`.
//! - `LOCALTURK_USERS` - Optional. CSV file with a `uid` column listing workers
//!   allowed to log in.

use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "localturk")]
#[command(about = "Run Mechanical Turk-style labeling tasks locally", long_about = None)]
#[command(version)]
#[command(override_usage = "localturk [OPTIONS] template.html tasks.csv outputs.csv\n       localturk --write-template tasks.csv")]
pub struct Cli {
    /// HTML template (or, with --write-template, the tasks CSV)
    pub template: PathBuf,

    /// Tasks CSV, one task per row
    pub tasks: Option<PathBuf>,

    /// Outputs CSV, appended to on every submission
    pub outputs: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 4321)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Serve static content from this directory (default: the template's directory)
    #[arg(short, long)]
    pub static_dir: Option<PathBuf>,

    /// CSV file with a `uid` column; when set, only listed workers can log in
    #[arg(long, env = "LOCALTURK_USERS")]
    pub users: Option<PathBuf>,

    /// Print a stub template for the given tasks CSV and exit
    #[arg(short, long)]
    pub write_template: bool,

    /// Keep serving after every task is done instead of shutting down
    #[arg(long)]
    pub keep_running: bool,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub template: PathBuf,
    pub tasks: PathBuf,
    pub outputs: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub users: Option<PathBuf>,
    /// Shut the server down once `/task` reports that all tasks are done.
    pub exit_when_done: bool,
}

impl Config {
    /// Build a server configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingArgument` if the tasks or outputs file is not given.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let tasks = cli.tasks.ok_or(ConfigError::MissingArgument("tasks.csv"))?;
        let outputs = cli
            .outputs
            .ok_or(ConfigError::MissingArgument("outputs.csv"))?;
        let static_dir = cli
            .static_dir
            .unwrap_or_else(|| template_dir(&cli.template));

        Ok(Self {
            template: cli.template,
            tasks,
            outputs,
            host: cli.host,
            port: cli.port,
            static_dir,
            users: cli.users,
            exit_when_done: !cli.keep_running,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(template: PathBuf, tasks: PathBuf, outputs: PathBuf) -> Self {
        let static_dir = template_dir(&template);
        Self {
            template,
            tasks,
            outputs,
            host: "127.0.0.1".to_string(),
            port: 4321,
            static_dir,
            users: None,
            exit_when_done: false,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn template_dir(template: &Path) -> PathBuf {
    template
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
