use std::fs::File;
use std::path::{Component, Path, PathBuf};

use docket_core::{DocketError, Result};
use ignore::WalkBuilder;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Deflate level used for archive entries.
const COMPRESSION_LEVEL: i64 = 9;

/// Zip every file under `source_dir` into a sibling `<dirname>.zip`,
/// replacing any existing archive, and return the archive path.
///
/// Entry names are the files' paths relative to `source_dir`, joined with
/// `/`. The source directory is left in place. On error nothing is written
/// to `<dirname>.zip` and a previous archive there is kept.
pub fn zip_directory(source_dir: &Path) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(DocketError::DirectoryNotFound(source_dir.to_path_buf()));
    }

    let source = source_dir.canonicalize()?;
    let zip_path = sibling_archive_path(&source)?;

    let walker = WalkBuilder::new(&source)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| DocketError::Internal(format!("walk failed: {e}")))?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            files.push(entry.into_path());
        }
    }

    write_archive(&source, &files, &zip_path)?;

    info!(path = %zip_path.display(), entries = files.len(), "created archive");
    Ok(zip_path)
}

/// Build the archive in a temp file beside `zip_path` and move it into place
/// only once every entry has been written.
fn write_archive(root: &Path, files: &[PathBuf], zip_path: &Path) -> Result<()> {
    let dir = zip_path.parent().unwrap_or(root);
    let staging = tempfile::Builder::new()
        .prefix(".docket-")
        .suffix(".zip.part")
        .tempfile_in(dir)?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut zip = ZipWriter::new(staging);
    for path in files {
        let name = entry_name(root, path)?;
        let mut file = File::open(path)?;
        debug!(entry = %name, "adding archive entry");

        zip.start_file(name, options)?;
        std::io::copy(&mut file, &mut zip)?;
    }

    let staging = zip.finish()?;
    staging
        .persist(zip_path)
        .map_err(|e| DocketError::Io(e.error))?;
    Ok(())
}

/// `<parent>/<dirname>.zip` for a canonical directory path.
fn sibling_archive_path(source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| DocketError::InvalidFolderName(source.display().to_string()))?;
    let parent = source.parent().unwrap_or(source);
    Ok(parent.join(format!("{}.zip", name.to_string_lossy())))
}

/// Relative path of `path` under `root` with `/` separators.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| DocketError::Internal(format!("{} outside archive root: {e}", path.display())))?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(parts.join("/"))
}

/// Validate a caller-supplied export folder name: one or more plain path
/// segments, nothing absolute, no `..`.
pub fn validate_folder_name(folder_name: &str) -> Result<&Path> {
    let path = Path::new(folder_name);
    let plain = !folder_name.trim().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if plain {
        Ok(path)
    } else {
        Err(DocketError::InvalidFolderName(folder_name.to_string()))
    }
}
