use crate::error::{IoContext, Result, SaveError};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar_rs as tar;

/// Normalizes a path from a tar archive to be safe for extraction
/// Removes any attempts to escape the root directory
pub(crate) fn normalize_tar_path(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for comp in p.components() {
        match comp {
            Component::CurDir => { /* skip "." */ }
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(c) => out.push(c),
            // Ignore absolute paths and Windows prefixes
            Component::RootDir | Component::Prefix(_) => { /* ignore */ }
        }
    }

    out
}

/// Wraps an archive stream, transparently decompressing gzip input.
pub fn open_archive<'a, R: Read + 'a>(reader: R) -> std::io::Result<Box<dyn Read + 'a>> {
    let mut buf_reader = BufReader::new(reader);
    let is_gzip = buf_reader.fill_buf()?.starts_with(&[0x1f, 0x8b]);

    if is_gzip {
        Ok(Box::new(GzDecoder::new(buf_reader)))
    } else {
        Ok(Box::new(buf_reader))
    }
}

/// Hardlinks whose targets may appear later in the stream
struct PendingHardlink {
    dest: PathBuf,
    target: PathBuf,
}

/// Symlinks are created last, so no entry of the stream is written through one
struct PendingSymlink {
    dest: PathBuf,
    rel_path: PathBuf,
    target: PathBuf,
}

/// Fails unless the existing directory `dir` resolves inside `root`.
fn ensure_inside(root: &Path, dir: &Path, rel_path: &Path) -> Result<()> {
    let resolved = dir.canonicalize().at_path(dir)?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(SaveError::PathEscape {
            path: rel_path.to_string_lossy().into_owned(),
            root: root.to_path_buf(),
        })
    }
}

#[cfg(unix)]
fn create_symlink(root: &Path, symlink: &PendingSymlink) -> Result<bool> {
    let dest = &symlink.dest;
    if let Some(parent) = dest.parent() {
        ensure_inside(root, parent, &symlink.rel_path)?;
    }

    if let Ok(meta) = fs::symlink_metadata(dest) {
        if meta.is_dir() {
            log::warn!(
                "Skipping symlink over an extracted directory: {} -> {}",
                symlink.rel_path.display(),
                symlink.target.display()
            );
            return Ok(false);
        }
        fs::remove_file(dest).at_path(dest)?;
    }
    std::os::unix::fs::symlink(&symlink.target, dest).at_path(dest)?;
    Ok(true)
}

#[cfg(not(unix))]
fn create_symlink(_root: &Path, symlink: &PendingSymlink) -> Result<bool> {
    log::warn!(
        "Symlink support not implemented on this platform: {} -> {}",
        symlink.dest.display(),
        symlink.target.display()
    );
    Ok(false)
}

fn link_or_copy(target: &Path, dest: &Path) -> Result<()> {
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest).at_path(dest)?;
    }

    if let Err(e) = fs::hard_link(target, dest) {
        log::debug!(
            "hardlink failed ({}), falling back to copy: {} -> {}",
            e,
            target.display(),
            dest.display()
        );
        fs::copy(target, dest).at_path(dest)?;
    }

    Ok(())
}

/// Extracts an image export stream (plain or gzipped tar) into `extract_dir`.
///
/// Symlinks are recreated with their original targets once everything else
/// is on disk, and never where an extracted directory already stands. File
/// modes are kept with owner read/write forced on. Ownership is never
/// changed. Returns the number of entries written.
pub fn extract_stream<R: Read>(reader: R, extract_dir: &Path) -> Result<usize> {
    let stream = open_archive(reader).at_path(extract_dir)?;
    let mut archive = tar::Archive::new(stream);
    let root = extract_dir.canonicalize().at_path(extract_dir)?;

    let mut pending_hardlinks = Vec::new();
    let mut pending_symlinks = Vec::new();
    let mut extracted = 0;

    for entry_result in archive.entries().at_path(extract_dir)? {
        let mut entry = entry_result.at_path(extract_dir)?;
        let header = entry.header();
        let entry_type = header.entry_type();

        let rel_path = normalize_tar_path(&entry.path().at_path(extract_dir)?);
        if rel_path.as_os_str().is_empty() {
            continue;
        }
        let dest = extract_dir.join(&rel_path);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at_path(parent)?;
        }

        match entry_type {
            tar::EntryType::Directory => {
                fs::create_dir_all(&dest).at_path(&dest)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let mode = header.mode().unwrap_or(0o755) | 0o700;
                    if let Err(e) = fs::set_permissions(&dest, fs::Permissions::from_mode(mode)) {
                        log::warn!("Could not set mode of {}: {}", dest.display(), e);
                    }
                }
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                #[cfg(unix)]
                let mode = header.mode().ok();

                if fs::symlink_metadata(&dest).is_ok() {
                    fs::remove_file(&dest).at_path(&dest)?;
                }

                let mut out_file = File::create(&dest).at_path(&dest)?;
                std::io::copy(&mut entry, &mut out_file).at_path(&dest)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Some(mode) = mode {
                        let perms = fs::Permissions::from_mode(mode | 0o600);
                        if let Err(e) = fs::set_permissions(&dest, perms) {
                            log::warn!("Could not set mode of {}: {}", dest.display(), e);
                        }
                    }
                }
            }
            tar::EntryType::Symlink => {
                let Some(link_name) = header.link_name().at_path(&dest)? else {
                    log::warn!("Skipping symlink without target: {}", rel_path.display());
                    continue;
                };

                pending_symlinks.push(PendingSymlink {
                    dest,
                    rel_path,
                    target: link_name.into_owned(),
                });
                continue;
            }
            tar::EntryType::Link => {
                let Some(link_name) = header.link_name().at_path(&dest)? else {
                    log::warn!("Skipping hardlink without target: {}", rel_path.display());
                    continue;
                };

                pending_hardlinks.push(PendingHardlink {
                    dest,
                    target: extract_dir.join(normalize_tar_path(&link_name)),
                });
                // counted once linked
                continue;
            }
            _ => {
                log::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    entry_type,
                    rel_path.display()
                );
                continue;
            }
        }

        extracted += 1;
    }

    for hardlink in pending_hardlinks {
        if !hardlink.target.exists() {
            log::warn!(
                "Skipping broken hardlink (target missing): {} -> {}",
                hardlink.dest.display(),
                hardlink.target.display()
            );
            continue;
        }
        link_or_copy(&hardlink.target, &hardlink.dest)?;
        extracted += 1;
    }

    for symlink in pending_symlinks {
        if create_symlink(&root, &symlink)? {
            extracted += 1;
        }
    }

    log::debug!("Extracted {} entries into {}", extracted, extract_dir.display());
    Ok(extracted)
}
