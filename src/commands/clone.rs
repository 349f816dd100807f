use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::object::{Object, ObjectId, ObjectKind};
use crate::pack;
use crate::remote::HttpRemote;
use crate::storage::{FilesystemStorage, StorageBackend};
use crate::worktree;

/// Handle the clone command
///
/// Flow:
/// 1. Create `dest` and an empty repository inside it
/// 2. Discover the remote's refs and pick the branch to check out
/// 3. Fetch a pack for that branch's commit and unpack it
/// 4. Point the local branch and HEAD at the commit, then check out its tree
pub fn handle<W: Write>(config: &Config, output: &mut W, url: &str, dest: &Path) -> Result<()> {
    prepare_destination(dest)?;
    writeln!(output, "Cloning into '{}'...", dest.display())?;

    let storage = FilesystemStorage::new(dest.join(&config.git_dir), config.compression());
    storage
        .initialize(&config.default_branch)
        .context("Failed to initialize git directory")?;

    let remote = HttpRemote::new(url, &config.user_agent)?;
    let advertisement = remote
        .discover_refs()
        .with_context(|| format!("Failed to discover refs at {}", url))?;
    let (refname, head) = advertisement
        .default_branch()
        .context("Remote has no HEAD, main or master branch to clone")?;
    tracing::info!("cloning {} at {}", refname, head);

    let pack_stream = remote
        .fetch_pack(head)
        .with_context(|| format!("Failed to fetch pack for {}", head))?;
    let progress = unpack_progress()?;
    let objects = pack::receive_pack(pack_stream, &storage, &progress)
        .context("Failed to unpack fetched objects")?;
    let count = |kind: ObjectKind| objects.iter().filter(|o| o.kind == kind).count();
    tracing::info!(
        "received {} commits, {} trees, {} blobs ({} bytes)",
        count(ObjectKind::Commit),
        count(ObjectKind::Tree),
        count(ObjectKind::Blob),
        objects.iter().map(|o| o.size).sum::<u64>()
    );

    let files = checkout(&storage, refname, head, dest, &config.git_dir)?;
    writeln!(output, "Checked out {} files from {}", files, refname)?;
    Ok(())
}

fn prepare_destination(dest: &Path) -> Result<()> {
    if dest.exists() {
        let empty = dest.is_dir()
            && std::fs::read_dir(dest)
                .with_context(|| format!("Failed to read {:?}", dest))?
                .next()
                .is_none();
        if !empty {
            anyhow::bail!(
                "Destination path {:?} already exists and is not an empty directory",
                dest
            );
        }
    }
    std::fs::create_dir_all(dest).with_context(|| format!("Failed to create {:?}", dest))
}

fn unpack_progress() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} [{bar:40.cyan/blue}] {pos}/{len} objects")?
            .progress_chars("█▓░"),
    );
    bar.set_message("Unpacking");
    Ok(bar)
}

/// Record `head` as `refname`, point HEAD at it and write its tree into `dest`
fn checkout<S: StorageBackend>(
    storage: &S,
    refname: &str,
    head: &ObjectId,
    dest: &Path,
    git_dir: &str,
) -> Result<usize> {
    let branch = refname
        .strip_prefix("refs/heads/")
        .with_context(|| format!("Remote HEAD {} is not a branch", refname))?;

    if !storage.exists(head)? {
        anyhow::bail!("Fetched pack does not contain {}", head);
    }
    let commit = match Object::from_raw(storage.get_object(head)?)? {
        Object::Commit(commit) => commit,
        other => anyhow::bail!("{} is a {}, not a commit", head, other.kind()),
    };

    storage.write_ref(refname, head)?;
    storage.set_head(branch)?;

    worktree::checkout_tree(storage, &commit.tree, dest, git_dir)
        .with_context(|| format!("Failed to check out tree {}", commit.tree))
}
