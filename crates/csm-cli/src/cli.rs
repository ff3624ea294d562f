use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use csm_types::Identifier;

use crate::ident_arg::parse_ident;

#[derive(Parser)]
#[command(
    name = "csm",
    about = "csm: sharded content storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Service configuration (TOML). Defaults to a filesystem driver at ./resources
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Named driver from the configuration instead of the default one
    #[arg(short, long, global = true)]
    pub driver: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report transfer progress on stderr
    #[arg(long, global = true)]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the sharded relative path of an identifier
    Shard(ShardArgs),
    /// Store a file under an identifier and name
    Put(PutArgs),
    /// Fetch stored content
    Get(GetArgs),
    /// Delete stored content
    Rm(ObjectArgs),
    /// Check whether content is stored
    Exists(ObjectArgs),
    /// Print the public URL of stored content
    Url(ObjectArgs),
    /// Copy stored content to another identifier
    Cp(CpArgs),
}

#[derive(Args)]
pub struct ShardArgs {
    /// Identifier, e.g. dir:users,dir:profile,num:180532
    #[arg(value_parser = parse_ident)]
    pub ident: Identifier,
}

#[derive(Args)]
pub struct ObjectArgs {
    #[arg(value_parser = parse_ident)]
    pub ident: Identifier,
    pub name: String,
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(value_parser = parse_ident)]
    pub ident: Identifier,
    pub name: String,
    /// File whose content is stored
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    #[arg(value_parser = parse_ident)]
    pub ident: Identifier,
    pub name: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct CpArgs {
    #[arg(value_parser = parse_ident)]
    pub ident: Identifier,
    pub name: String,
    #[arg(value_parser = parse_ident)]
    pub dest: Identifier,
    /// Name at the destination (defaults to NAME)
    #[arg(long = "as")]
    pub dest_name: Option<String>,
}
