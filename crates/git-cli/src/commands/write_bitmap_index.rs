//! `gitr write-bitmap-index` — build a reachability bitmap index for a pack.

use anyhow::{bail, Result};
use clap::Args;

use git_pack::bitmap::BitmapIndexWriter;
use git_pack::pack::PackFile;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct WriteBitmapIndexArgs {
    /// Packfile to index. Defaults to the largest pack in the repository.
    pack: Option<String>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Show progress (default unless --quiet)
    #[arg(long)]
    progress: bool,

    /// Store an additional path-name hash cache for each object
    #[arg(long)]
    hash_cache: bool,

    /// Maximum number of bitmaps to store
    #[arg(long)]
    max: Option<u32>,
}

pub fn run(args: &WriteBitmapIndexArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    let pack_path = match &args.pack {
        Some(p) => std::path::PathBuf::from(p),
        None => largest_pack(&repo)?,
    };
    let pack = PackFile::open(&pack_path)?;

    let writer = BitmapIndexWriter::new(args.hash_cache, args.max.unwrap_or(0) as usize, args.quiet);

    let out_path = writer.write(&pack, |ancestor, descendant| {
        git_revwalk::is_ancestor(&repo, &ancestor, &descendant)
            .map_err(|e| git_pack::PackError::AncestryTest(e.to_string()))
    })?;

    if !args.quiet {
        eprintln!("{}", out_path.display());
    }

    Ok(0)
}

fn largest_pack(repo: &git_repository::Repository) -> Result<std::path::PathBuf> {
    let paths = repo.odb().pack_paths();
    let mut best: Option<(std::path::PathBuf, u64)> = None;
    for path in paths {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let is_bigger = match &best {
            Some((_, best_size)) => size > *best_size,
            None => true,
        };
        if is_bigger {
            best = Some((path, size));
        }
    }
    match best {
        Some((path, _)) => Ok(path),
        None => bail!("No packs found for indexing"),
    }
}
