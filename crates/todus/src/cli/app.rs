use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "todus", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Phone number of the account to use.
    #[arg(short, long, global = true)]
    pub number: Option<String>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(name = "login", about = "Register a phone number with an SMS code")]
    Login,
    #[command(alias = "up", name = "upload", about = "Upload files, optionally split into parts")]
    Upload(UploadArg),
    #[command(alias = "dl", name = "download", about = "Download share links or manifest files")]
    Download(DownloadArg),
    #[command(name = "token", about = "Log in and print a fresh bearer token")]
    Token,
    #[command(alias = "ls", name = "accounts", about = "List saved accounts")]
    Accounts,
}

#[derive(Clone, Debug, Args)]
pub struct UploadArg {
    /// Split each file into parts of this many bytes.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub split: Option<u64>,

    /// Parts uploaded at the same time.
    #[arg(short = 'w', long)]
    pub max_workers: Option<usize>,

    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct DownloadArg {
    /// Files downloaded at the same time.
    #[arg(short = 'w', long)]
    pub max_workers: Option<usize>,

    /// Share links (`<url>?name=<file>`) or manifest `.txt` files.
    #[arg(required = true, value_name = "URL_OR_TXT")]
    pub inputs: Vec<String>,
}
