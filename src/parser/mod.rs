//! Turns raw resource directories into a validated `ResourceSet`.

pub mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, IoContext, Result};
use crate::model::{FolderType, ResourceFile, ResourceSet};

/// Validate every root and collect its files in canonical order.
///
/// Each root must be a readable directory whose children are resource
/// folders (`layout`, `values-fr`, …) holding plain files.
pub fn load_resource_set(
    label: &str,
    roots: &[PathBuf],
    manifest: Option<&Path>,
) -> Result<ResourceSet> {
    if roots.is_empty() {
        return Err(Error::Validation("no resource directories given".into()));
    }
    if let Some(manifest) = manifest {
        if !manifest.is_file() {
            return Err(Error::Validation(format!(
                "manifest {} does not exist",
                manifest.display()
            )));
        }
    }

    let mut files = Vec::new();
    for (idx, root) in roots.iter().enumerate() {
        if !root.is_dir() {
            return Err(Error::Validation(format!(
                "resource directory {} does not exist",
                root.display()
            )));
        }
        // Listing up front surfaces permission problems with the right path.
        fs::read_dir(root).at(root)?;

        let before = files.len();
        collect_root(idx, root, &mut files)?;
        debug!(root = %root.display(), files = files.len() - before, "scanned resource root");
    }

    files.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));
    info!(label, roots = roots.len(), files = files.len(), "resource set validated");

    Ok(ResourceSet {
        label: label.to_string(),
        roots: roots.to_vec(),
        source_roots: roots.to_vec(),
        manifest: manifest.map(Path::to_path_buf),
        files,
    })
}

fn collect_root(idx: usize, root: &Path, out: &mut Vec<ResourceFile>) -> Result<()> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e.file_name().to_string_lossy().as_ref()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            match e.into_io_error() {
                Some(source) => Error::Io { path, source },
                None => Error::Validation(format!("filesystem loop at {}", path.display())),
            }
        })?;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        match (entry.depth(), entry.file_type().is_dir()) {
            (1, true) => {
                let name = entry.file_name().to_string_lossy();
                if FolderType::parse_folder(&name).is_none() {
                    return Err(Error::Validation(format!(
                        "{} is not a resource folder",
                        path.display()
                    )));
                }
            }
            (2, false) => {
                let folder = relative
                    .parent()
                    .and_then(|p| p.to_str())
                    .and_then(FolderType::parse_folder);
                let Some((folder, qualifiers)) = folder else {
                    return Err(Error::Validation(format!(
                        "{} is not inside a resource folder",
                        path.display()
                    )));
                };
                out.push(ResourceFile {
                    root: idx,
                    path: path.to_path_buf(),
                    relative,
                    folder,
                    qualifiers,
                });
            }
            _ => {
                return Err(Error::Validation(format!(
                    "unexpected {} at {}",
                    if entry.file_type().is_dir() { "directory" } else { "file" },
                    path.display()
                )));
            }
        }
    }
    Ok(())
}

/// Hidden files and editor leftovers are never resources.
fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.ends_with('~')
}
