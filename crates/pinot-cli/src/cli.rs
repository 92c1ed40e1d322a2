use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pinot_client::ClientConfig;
use pinot_provisioner::ResourceKind;

#[derive(Parser)]
#[command(name = "pinot-provision")]
#[command(version)]
#[command(about = "Declarative schemas, tables and users for an Apache Pinot controller", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Manifest declaring schemas, tables and users
    #[arg(short, long, global = true, env = "PINOT_MANIFEST", default_value = "pinot.json")]
    pub manifest: PathBuf,

    /// Where tracked state is kept
    #[arg(short, long, global = true, env = "PINOT_STATE", default_value = "pinot.state.json")]
    pub state: PathBuf,

    #[command(flatten)]
    pub controller: ControllerArgs,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection flags. Each one, when given, wins over the manifest's
/// `controller` block and the `PINOT_*` environment variables.
#[derive(Args, Default)]
pub struct ControllerArgs {
    /// Controller base URL, e.g. http://localhost:9000
    #[arg(long, global = true)]
    pub controller_url: Option<String>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Bearer/basic token; takes precedence over username and password
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Sent as the Database header
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

impl ControllerArgs {
    pub fn to_config(&self) -> ClientConfig {
        ClientConfig {
            controller_url: self.controller_url.clone().unwrap_or_default(),
            username: self.username.clone(),
            password: self.password.clone(),
            token: self.token.clone(),
            database: self.database.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create, update and delete resources to match the manifest
    Apply,

    /// Delete every tracked resource
    Destroy,

    /// Start tracking an existing controller object
    Import {
        #[arg(value_enum)]
        kind: KindArg,

        /// Schema name, table id (events_OFFLINE) or username|COMPONENT
        id: String,
    },

    /// List tracked resources
    State,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Schema,
    Table,
    User,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Schema => ResourceKind::Schema,
            KindArg::Table => ResourceKind::Table,
            KindArg::User => ResourceKind::User,
        }
    }
}
