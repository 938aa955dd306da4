use std::path::{Component, Path};

use crate::error::{IndexError, Result};

/// Remote key for `path`: relative to `root`, `/`-separated, lower-cased.
pub fn resolve_identity(path: &Path, root: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| IndexError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect();

    Ok(parts.join("/"))
}
