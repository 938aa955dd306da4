use std::path::{Component, Path, PathBuf};

use super::error::ApiError;

/// Joins a client-supplied relative path onto the shared folder. Anything
/// that could climb out of the folder is rejected.
pub fn join_relative(root: &Path, relative: &str) -> Result<PathBuf, ApiError> {
    let mut path = root.to_path_buf();
    for component in Path::new(relative.trim_start_matches(['/', '\\'])).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApiError::BadRequest(format!(
                    "path {relative} is outside the shared folder"
                )));
            }
        }
    }
    Ok(path)
}

/// Finds `path` on disk, falling back to a case-insensitive match of every
/// component below `root` so links keep working on case-sensitive
/// filesystems.
pub async fn resolve_case_insensitive(root: &Path, path: &Path) -> Option<PathBuf> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Some(path.to_path_buf());
    }

    let relative = path.strip_prefix(root).ok()?;
    let mut current = root.to_path_buf();
    for component in relative.components() {
        let wanted = component.as_os_str().to_string_lossy().to_lowercase();
        let mut entries = tokio::fs::read_dir(&current).await.ok()?;
        let mut found = None;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().to_lowercase() == wanted {
                found = Some(entry.path());
                break;
            }
        }
        current = found?;
    }
    Some(current)
}
