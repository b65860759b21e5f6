//! Command-line interface definitions.
//!
//! Defines the CLI structure for the gateway using `clap`. Every subcommand
//! is a thin call into one gateway operation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{MissingActivity, Resource};

/// Cached, rate-limited access to the Politics & War API
#[derive(Parser, Debug)]
#[command(name = "orbis-gateway")]
#[command(version)]
pub struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve alliance ids, links, names or acronyms
    Resolve(ResolveArgs),

    /// List member nations of alliances
    Nations(AllianceArgs),

    /// List treaties of an alliance
    Treaties(TreatiesArgs),

    /// List recent wars of alliances, or between two sides
    Wars(WarsArgs),

    /// Show latest average trade prices
    Prices(PricesArgs),

    /// Look up one nation
    Nation(NationArgs),

    /// List active unallied nations
    Recruits(RecruitsArgs),

    /// Inspect or clear the local cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Ids, links, names or acronyms
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Show what every strategy did (single input only)
    #[arg(long)]
    pub trace: bool,
}

/// Alliances plus refresh control.
#[derive(Args, Debug)]
pub struct AllianceArgs {
    /// Alliance ids, links, names or acronyms
    #[arg(required = true)]
    pub alliances: Vec<String>,

    /// Bypass the cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for `treaties`.
#[derive(Args, Debug)]
pub struct TreatiesArgs {
    /// Alliance id, link, name or acronym
    pub alliance: String,

    /// Bypass the cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for `wars`.
#[derive(Args, Debug)]
pub struct WarsArgs {
    /// Home-side alliances
    #[arg(required = true)]
    pub alliances: Vec<String>,

    /// Only wars against these alliances
    #[arg(long, num_args = 1..)]
    pub against: Vec<String>,

    /// Look-back window such as 6h, 3d, 2w or 2m
    #[arg(long, default_value = "3d")]
    pub since: String,

    /// Bypass the cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for `prices`.
#[derive(Args, Debug)]
pub struct PricesArgs {
    /// Only these resources
    #[arg(value_parser = parse_resource)]
    pub resources: Vec<Resource>,

    /// Bypass the cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for `nation`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct NationArgs {
    /// Nation id
    #[arg(long)]
    pub id: Option<u64>,

    /// Nation name
    #[arg(long)]
    pub name: Option<String>,

    /// Leader name
    #[arg(long)]
    pub leader: Option<String>,
}

/// What to do with nations lacking an activity timestamp.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MissingActivityArg {
    Keep,
    Drop,
}

impl From<MissingActivityArg> for MissingActivity {
    fn from(arg: MissingActivityArg) -> Self {
        match arg {
            MissingActivityArg::Keep => Self::Keep,
            MissingActivityArg::Drop => Self::Drop,
        }
    }
}

/// Arguments for `recruits`.
#[derive(Args, Debug)]
pub struct RecruitsArgs {
    /// Drop nations inactive for longer than this (6h, 3d, 2w, 2m)
    #[arg(long, default_value = "7d")]
    pub inactive_after: String,

    /// Nations without an activity timestamp
    #[arg(long, value_enum)]
    pub missing_activity: MissingActivityArg,

    /// Show at most this many nations
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Bypass the cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,
}

/// Subcommands for `cache`.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached records with age and freshness
    Info,
    /// Remove cached records
    Clear(CacheClearArgs),
}

/// Arguments for `cache clear`.
#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct CacheClearArgs {
    /// Remove only this key
    #[arg(long)]
    pub key: Option<String>,

    /// Remove keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

fn parse_resource(raw: &str) -> std::result::Result<Resource, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wars_against() {
        let cli = Cli::try_parse_from([
            "orbis-gateway",
            "wars",
            "Cybertr0n",
            "--against",
            "Rose",
            "1234",
            "--since",
            "2w",
        ])
        .unwrap();
        let Commands::Wars(args) = cli.command else {
            panic!("expected wars");
        };
        assert_eq!(args.alliances, vec!["Cybertr0n"]);
        assert_eq!(args.against, vec!["Rose", "1234"]);
        assert_eq!(args.since, "2w");
    }

    #[test]
    fn nation_requires_exactly_one_selector() {
        assert!(Cli::try_parse_from(["orbis-gateway", "nation"]).is_err());
        assert!(
            Cli::try_parse_from(["orbis-gateway", "nation", "--id", "1", "--name", "x"]).is_err()
        );
        assert!(Cli::try_parse_from(["orbis-gateway", "nation", "--leader", "Bob"]).is_ok());
    }

    #[test]
    fn prices_parse_resources() {
        let cli =
            Cli::try_parse_from(["orbis-gateway", "--json", "prices", "steel", "Food"]).unwrap();
        assert!(cli.json);
        let Commands::Prices(args) = cli.command else {
            panic!("expected prices");
        };
        assert_eq!(args.resources, vec![Resource::Steel, Resource::Food]);
        assert!(Cli::try_parse_from(["orbis-gateway", "prices", "gold"]).is_err());
    }

    #[test]
    fn recruits_requires_missing_activity_choice() {
        assert!(Cli::try_parse_from(["orbis-gateway", "recruits"]).is_err());
        assert!(
            Cli::try_parse_from(["orbis-gateway", "recruits", "--missing-activity", "keep"]).is_ok()
        );
    }
}
