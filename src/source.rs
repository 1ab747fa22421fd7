use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::SourceImage;

/// Immediate subdirectories of the source root, one per physical book, sorted by name.
pub fn discover_book_folders(source_root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();

    let entries = fs::read_dir(source_root)
        .with_context(|| format!("failed to read {}", source_root.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_root.display()))?;
        let path = entry.path();

        if entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_dir()
        {
            folders.push(path);
        }
    }

    folders.sort();
    Ok(folders)
}

pub fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Allow-listed images in a book folder, in lexical file-name order.
pub fn list_source_images(book_folder: &Path, extensions: &[String]) -> Result<Vec<SourceImage>> {
    let mut images = Vec::new();

    let entries = fs::read_dir(book_folder)
        .with_context(|| format!("failed to read {}", book_folder.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", book_folder.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let Some(extension) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
        else {
            continue;
        };

        if !extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            continue;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        images.push(SourceImage {
            name: name.to_string(),
            ordinal: 0,
            extension,
            path: path.clone(),
        });
    }

    images.sort_by(|a, b| a.name.cmp(&b.name));
    for (ordinal, image) in images.iter_mut().enumerate() {
        image.ordinal = ordinal;
    }

    Ok(images)
}
