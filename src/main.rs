#![deny(clippy::mod_module_files)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod object;
mod pack;
mod remote;
mod storage;
mod worktree;

use commands::cat_file::CatFileMode;
use config::Config;
use storage::FilesystemStorage;

/// A minimal git: loose objects, trees, commits and non-delta pack clones
#[derive(Parser, Debug)]
#[command(name = "minigit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty repository
    Init,
    /// Print an object's contents, type or size
    CatFile {
        /// Pretty-print the contents (default)
        #[arg(short = 'p', conflicts_with_all = ["kind", "size"])]
        pretty: bool,
        /// Print the object type
        #[arg(short = 't', conflicts_with = "size")]
        kind: bool,
        /// Print the payload size
        #[arg(short = 's')]
        size: bool,
        hash: String,
    },
    /// Compute a file's blob id, optionally storing it
    HashObject {
        /// Write the blob into the object store
        #[arg(short = 'w')]
        write: bool,
        path: PathBuf,
    },
    /// List the entries of a tree
    LsTree {
        /// Print only entry names
        #[arg(long)]
        name_only: bool,
        hash: String,
    },
    /// Store the working directory as a tree
    WriteTree,
    /// Create a commit for a tree
    CommitTree {
        tree: String,
        #[arg(short = 'p')]
        parent: Option<String>,
        #[arg(short = 'm')]
        message: String,
    },
    /// Read a pack from stdin into loose objects
    UnpackObjects,
    /// Clone a repository over smart HTTP
    Clone {
        url: String,
        #[arg(id = "clone_dir", value_name = "DIR")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;

    let workdir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    tracing::debug!("working directory {:?}", workdir);

    let storage = FilesystemStorage::new(workdir.join(&config.git_dir), config.compression());
    let mut stdout = io::stdout();

    match cli.command {
        Command::Init => commands::init::handle(&storage, &config, &mut stdout)?,
        Command::CatFile {
            pretty: _,
            kind,
            size,
            hash,
        } => {
            let mode = if kind {
                CatFileMode::Type
            } else if size {
                CatFileMode::Size
            } else {
                CatFileMode::Pretty
            };
            commands::cat_file::handle(&storage, &mut stdout, &hash, mode)?;
        }
        Command::HashObject { write, path } => {
            commands::hash_object::handle(&storage, &mut stdout, &workdir.join(path), write)?
        }
        Command::LsTree { name_only, hash } => {
            commands::ls_tree::handle(&storage, &mut stdout, &hash, name_only)?
        }
        Command::WriteTree => commands::write_tree::handle(&storage, &config, &mut stdout, &workdir)?,
        Command::CommitTree {
            tree,
            parent,
            message,
        } => commands::commit_tree::handle(
            &storage,
            &config,
            &mut stdout,
            &tree,
            parent.as_deref(),
            &message,
        )?,
        Command::UnpackObjects => {
            commands::unpack_objects::handle(&storage, io::stdin().lock(), &mut stdout)?
        }
        Command::Clone { url, dir } => {
            commands::clone::handle(&config, &mut stdout, &url, &workdir.join(dir))?
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays machine-readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
