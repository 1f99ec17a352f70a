//! Shortest-path descriptor search over candidate path lists and directory trees.

use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Pick the shallowest candidate whose final segment is exactly `target`.
///
/// Depth counts normal path segments only, so `./app.yaml` and `app.yaml`
/// are equally shallow. Ties go to the first candidate in input order.
pub fn locate<I>(target: &str, candidates: I) -> Option<I::Item>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let mut best: Option<(usize, I::Item)> = None;
    for candidate in candidates {
        let path = candidate.as_ref();
        if path.file_name().and_then(OsStr::to_str) != Some(target) {
            continue;
        }
        let depth = depth(path);
        let shallower = match &best {
            Some((best_depth, _)) => depth < *best_depth,
            None => true,
        };
        if shallower {
            best = Some((depth, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Recursively list regular files under `root` as paths relative to `root`.
///
/// Entries are visited in name order within each directory. Symlinked
/// directories are not descended into; symlinks to files are listed.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    Ok(files)
}

fn collect_files(
    root: &Path,
    current: &Path,
    out: &mut Vec<PathBuf>,
) -> Result<(), std::io::Error> {
    let mut entries = fs::read_dir(current)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let full = entry.path();
        let meta = full.symlink_metadata()?;
        if meta.is_dir() {
            collect_files(root, &full, out)?;
            continue;
        }
        let is_file = if meta.file_type().is_symlink() {
            fs::metadata(&full).is_ok_and(|target| target.is_file())
        } else {
            meta.is_file()
        };
        if is_file {
            let rel = full
                .strip_prefix(root)
                .map_err(|e| std::io::Error::other(format!("path strip: {e}")))?;
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Find the shallowest file named `target` anywhere under `root`.
pub fn locate_in_directory(target: &str, root: &Path) -> Result<Option<PathBuf>, std::io::Error> {
    let files = walk_files(root)?;
    Ok(locate(target, files).map(|rel| root.join(rel)))
}
