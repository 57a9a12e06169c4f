//! Clap derive structures for the `nutridash` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use nutridash_core::ResourceKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nutridash -- admin CLI for the nutrition platform
#[derive(Debug, Parser)]
#[command(
    name = "nutridash",
    version,
    about = "Manage nutrition dashboard data from the command line",
    long_about = "Browse, search, and edit the conditions, allergies, ingredients, \
        and meals served by the nutrition platform's admin backend.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "NUTRIDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Admin API base URL (overrides profile)
    #[arg(long, env = "NUTRIDASH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NUTRIDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "NUTRIDASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NUTRIDASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

// ── Resource kind ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Conditions,
    Allergies,
    Ingredients,
    #[value(alias = "meals")]
    Foods,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Conditions => Self::Conditions,
            KindArg::Allergies => Self::Allergies,
            KindArg::Ingredients => Self::Ingredients,
            KindArg::Foods => Self::Foods,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show one page of a collection
    #[command(alias = "ls")]
    List(ListArgs),

    /// Page through a collection the way the dashboard scrolls
    Browse(BrowseArgs),

    /// Server-side search by name
    #[command(alias = "find")]
    Search(SearchArgs),

    /// Create an item
    Create(CreateArgs),

    /// Update an item
    Update(UpdateArgs),

    /// Delete an item
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Show summary statistics for a collection
    Stats(StatsArgs),

    /// Sign in, sign out, and inspect the stored session
    Auth(AuthArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Collection commands ──────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    pub kind: KindArg,

    /// Zero-indexed page number
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Items per page (defaults to the profile's page size)
    #[arg(long, short = 'l')]
    pub size: Option<usize>,
}

#[derive(Debug, Args)]
pub struct BrowseArgs {
    pub kind: KindArg,

    /// Stop after this many pages even if more exist
    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub kind: KindArg,

    /// Name fragment to search for
    pub query: String,
}

/// Item fields given either as flags or as a JSON file.
#[derive(Debug, Args)]
pub struct ItemFields {
    /// Read the JSON payload from a file
    #[arg(long, short = 'F', conflicts_with_all = ["name", "description"])]
    pub from_file: Option<PathBuf>,

    /// Item name
    #[arg(long)]
    pub name: Option<String>,

    /// Item description
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub kind: KindArg,

    #[command(flatten)]
    pub fields: ItemFields,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub kind: KindArg,

    pub id: String,

    #[command(flatten)]
    pub fields: ItemFields,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub kind: KindArg,

    pub id: String,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    pub kind: KindArg,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Exchange email + password for a session
    Login {
        /// Account email (defaults to the profile's email)
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "NUTRIDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a session is stored and when it expires
    Status,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// api_url, email, ca_cert, insecure, timeout, page_size,
        /// search_debounce_ms, sort, token_store
        key: String,
        value: String,
    },

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: Shell,
}
