use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::error::{ConvError, ConvResult};

/// List the immediate children of `dir`, sorted by file name.
///
/// Sorting pins down the order the OS would otherwise choose, which decides
/// both fragment order and which data directory wins.
pub fn list_children(dir: &Path) -> ConvResult<Vec<PathBuf>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut children = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| ConvError::Listing {
            path: dir.to_path_buf(),
            source,
        })?;
        children.push(entry.into_path());
    }
    Ok(children)
}

/// Immediate child directories of `dir`, in file name order
pub fn list_child_dirs(dir: &Path) -> ConvResult<Vec<PathBuf>> {
    Ok(list_children(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}
