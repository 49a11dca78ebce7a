//! Command-line and environment configuration.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trip-hub")]
#[command(about = "Per-group trip documents for the trip planner bot and web app")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Write a trip document straight into a local data directory
    Seed(SeedArgs),

    /// Replace one top-level field of a remote trip document
    Patch(PatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TRIP_HUB_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: SocketAddr,

    /// Directory holding one JSON document per chat
    #[arg(long, env = "TRIP_HUB_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    #[arg(long, env = "TRIP_HUB_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Chat id as reported by /myid; `default` targets the local test document
    #[arg(long, default_value = "default", allow_hyphen_values = true)]
    pub chat_id: String,

    /// JSON file with the full trip document
    #[arg(long)]
    pub file: PathBuf,

    /// Overwrite an existing document
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PatchArgs {
    /// Base URL of the running service
    #[arg(long, env = "TRIP_HUB_URL")]
    pub base_url: String,

    #[arg(long, allow_hyphen_values = true)]
    pub chat_id: String,

    /// Top-level field to replace, e.g. `wxLocations` or `groupChecklist`
    #[arg(long)]
    pub field: String,

    /// JSON file holding the new value of the field
    #[arg(long)]
    pub file: PathBuf,
}
