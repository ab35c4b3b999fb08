//! Gzip-compressed tar handling for Go release archives.
//!
//! Official archives hold a single `go/` top-level folder. It is stripped
//! during extraction so the staged tree starts at `bin/`, `src/`, and so on.

use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::errors::{GovmError, IoResultExt, Result};

/// Shape of a verified archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: u64,
    /// Folder shared by every entry, stripped on extraction.
    pub common_root: Option<PathBuf>,
}

/// Reads every entry of the archive to confirm it is structurally sound.
///
/// Each entry body is decompressed to the end, so truncated data or a bad
/// gzip checksum is caught here and not half way through installation.
///
/// # Errors
///
/// Returns [`GovmError::CorruptArchive`] if the file is not a readable tar.gz,
/// contains no entries, or contains unsafe paths.
pub fn inspect_tar_gz(archive_path: &Path) -> Result<ArchiveSummary> {
    let corrupt = |message: String| GovmError::CorruptArchive {
        path: archive_path.to_path_buf(),
        message,
    };

    let file = std::fs::File::open(archive_path)
        .io_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut entries = 0u64;
    let mut common_root: Option<PathBuf> = None;
    let mut shared = true;
    let mut nested = false;

    for entry in archive
        .entries()
        .map_err(|e| corrupt(format!("unreadable tar stream: {e}")))?
    {
        let mut entry = entry.map_err(|e| corrupt(format!("unreadable entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| corrupt(format!("unreadable entry path: {e}")))?
            .into_owned();
        check_entry_path(&path).map_err(corrupt)?;
        if let Some((link, base)) = link_of(&entry, &path).map_err(corrupt)? {
            resolve_within(base, &link).ok_or_else(|| {
                corrupt(format!(
                    "link {} points outside the archive: {}",
                    path.display(),
                    link.display()
                ))
            })?;
        }

        if path.components().count() > 1 {
            nested = true;
        }
        if let Some(first) = path.components().next() {
            let root = PathBuf::from(first.as_os_str());
            match &common_root {
                None => common_root = Some(root),
                Some(existing) if *existing != root => shared = false,
                Some(_) => {}
            }
        }

        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| corrupt(format!("truncated entry {}: {e}", path.display())))?;
        entries += 1;
    }

    if entries == 0 {
        return Err(corrupt("archive has no entries".to_string()));
    }

    // Reading past the end-of-archive blocks forces the gzip trailer check.
    io::copy(&mut archive.into_inner(), &mut io::sink())
        .map_err(|e| corrupt(format!("bad gzip trailer: {e}")))?;

    Ok(ArchiveSummary {
        entries,
        common_root: common_root.filter(|_| shared && nested),
    })
}

/// Extracts a tar.gz archive into `dest_dir`, stripping a shared top-level
/// folder when there is one.
///
/// # Errors
///
/// Returns [`GovmError::CorruptArchive`] for unreadable or unsafe entries and
/// an I/O error when writing to `dest_dir` fails.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let summary = inspect_tar_gz(archive_path)?;
    let corrupt = |message: String| GovmError::CorruptArchive {
        path: archive_path.to_path_buf(),
        message,
    };

    std::fs::create_dir_all(dest_dir)
        .io_context(|| format!("failed to create {}", dest_dir.display()))?;
    let contained_root = std::fs::canonicalize(dest_dir)
        .io_context(|| format!("failed to resolve {}", dest_dir.display()))?;
    let strip = |path: &Path| match &summary.common_root {
        Some(prefix) => path.strip_prefix(prefix).unwrap_or(path).to_path_buf(),
        None => path.to_path_buf(),
    };

    let file = std::fs::File::open(archive_path)
        .io_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive
        .entries()
        .map_err(|e| corrupt(format!("unreadable tar stream: {e}")))?
    {
        let mut entry = entry.map_err(|e| corrupt(format!("unreadable entry: {e}")))?;
        let entry_path = entry
            .path()
            .map_err(|e| corrupt(format!("unreadable entry path: {e}")))?
            .into_owned();

        let relative = strip(entry_path.as_path());
        if relative.as_os_str().is_empty() {
            continue;
        }
        let output = dest_dir.join(&relative);
        ensure_contained(&contained_root, &output).map_err(corrupt)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            std::fs::create_dir_all(&output)
                .io_context(|| format!("failed to create {}", output.display()))?;
            continue;
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .io_context(|| format!("failed to create {}", parent.display()))?;
        }

        if let Some((link, _)) = link_of(&entry, &entry_path).map_err(corrupt)? {
            // Hard link names are archive paths; symlinks resolve from their parent.
            let (base, link) = if entry_type.is_hard_link() {
                (PathBuf::new(), strip(link.as_path()))
            } else {
                (relative.parent().map(Path::to_path_buf).unwrap_or_default(), link)
            };
            let target = resolve_within(&base, &link).ok_or_else(|| {
                corrupt(format!(
                    "link {} points outside {}: {}",
                    relative.display(),
                    dest_dir.display(),
                    link.display()
                ))
            })?;
            if entry_type.is_hard_link() {
                let source = dest_dir.join(&target);
                ensure_contained(&contained_root, &source).map_err(corrupt)?;
                std::fs::hard_link(&source, &output).io_context(|| {
                    format!("failed to link {} to {}", output.display(), source.display())
                })?;
                continue;
            }
        }

        entry
            .unpack(&output)
            .io_context(|| format!("failed to extract {}", output.display()))?;
    }

    ensure_bin_executable(dest_dir)
}

/// Target of a symlink or hard link entry, with the directory a relative
/// target is resolved from.
fn link_of<'p, R: io::Read>(
    entry: &tar::Entry<'_, R>,
    path: &'p Path,
) -> std::result::Result<Option<(PathBuf, &'p Path)>, String> {
    let entry_type = entry.header().entry_type();
    if !entry_type.is_symlink() && !entry_type.is_hard_link() {
        return Ok(None);
    }
    let link = entry
        .link_name()
        .map_err(|e| format!("unreadable link target of {}: {e}", path.display()))?
        .ok_or_else(|| format!("link {} has no target", path.display()))?
        .into_owned();
    let base = if entry_type.is_symlink() {
        path.parent().unwrap_or(Path::new(""))
    } else {
        Path::new("")
    };
    Ok(Some((link, base)))
}

/// Lexically resolves `link` from the directory `base`, both relative to the
/// extraction root. `None` when the result leaves that root.
fn resolve_within(base: &Path, link: &Path) -> Option<PathBuf> {
    if link.has_root() {
        return None;
    }
    let mut resolved = PathBuf::new();
    for component in base.join(link).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Fails unless the deepest existing ancestor of `path` (or `path` itself)
/// resolves, through any symlinks, to somewhere under `root`.
fn ensure_contained(root: &Path, path: &Path) -> std::result::Result<(), String> {
    let mut existing = path;
    while std::fs::symlink_metadata(existing).is_err() {
        existing = existing
            .parent()
            .ok_or_else(|| format!("no existing ancestor of {}", path.display()))?;
    }
    let resolved = std::fs::canonicalize(existing)
        .map_err(|e| format!("cannot resolve {}: {e}", existing.display()))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(format!(
            "refusing to write {} through {}",
            path.display(),
            resolved.display()
        ))
    }
}

fn check_entry_path(path: &Path) -> std::result::Result<(), String> {
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(format!(
            "refusing entry with absolute or parent reference: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Marks every regular file in `<dir>/bin` executable.
#[cfg(unix)]
fn ensure_bin_executable(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = dir.join("bin");
    let Ok(entries) = std::fs::read_dir(&bin_dir) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let mut perms = std::fs::metadata(&path)
            .io_context(|| format!("failed to stat {}", path.display()))?
            .permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(&path, perms)
            .io_context(|| format!("failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn ensure_bin_executable(_dir: &Path) -> Result<()> {
    Ok(())
}
