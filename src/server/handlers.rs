use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Query, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::error::ApiError;
use super::paths::{join_relative, resolve_case_insensitive};
use super::AppState;
use crate::indexing::junk::is_junk;
use crate::types::FileType;

#[derive(Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

const SUCCESS: Success = Success { success: true };

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    parent_folder_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    file_path: Option<String>,
    new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    directory_path: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

async fn existing_file(state: &AppState, relative: &str) -> Result<PathBuf, ApiError> {
    let path = join_relative(&state.root, relative)?;
    resolve_case_insensitive(&state.root, &path)
        .await
        .ok_or(ApiError::NotFound)
}

pub async fn index() -> Html<&'static str> {
    Html("<h1>GM's Notebook Local File Server</h1>")
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    let dir = match query.parent_folder_path.as_deref() {
        Some(parent) if !parent.is_empty() => join_relative(&state.root, parent)?,
        _ => state.root.to_path_buf(),
    };

    let mut reader = tokio::fs::read_dir(&dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_junk(&name) {
            continue;
        }
        let metadata = tokio::fs::metadata(entry.path()).await?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(DirectoryEntry { name, kind });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(entries))
}

pub async fn get_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<FileDetails>, ApiError> {
    let relative = required(query.file_path, "filePath")?;
    let path = existing_file(&state, &relative).await?;
    if tokio::fs::metadata(&path).await?.is_dir() {
        return Err(ApiError::BadRequest(format!("{relative} is a directory")));
    }

    let file_type = FileType::from_path(&path);
    let contents = if file_type.is_text() {
        Some(String::from_utf8_lossy(&tokio::fs::read(&path).await?).into_owned())
    } else {
        None
    };

    Ok(Json(FileDetails {
        name: file_name(&path),
        kind: EntryKind::File,
        file_type,
        contents,
        download_url: format!(
            "http://localhost:{}/download/{}",
            state.port,
            relative.trim_start_matches('/')
        ),
    }))
}

pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    mut multipart: Multipart,
) -> Result<Json<Success>, ApiError> {
    let relative = required(query.file_path, "filePath")?;
    let requested = join_relative(&state.root, &relative)?;
    let path = resolve_case_insensitive(&state.root, &requested)
        .await
        .unwrap_or(requested);

    let staging = staging_path(&path);
    match receive_upload(&mut multipart, &staging).await {
        Ok(written) => {
            tokio::fs::rename(&staging, &path).await?;
            info!("Uploaded {} ({} bytes)", path.display(), written);
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
    }
    Ok(Json(SUCCESS))
}

/// Streams the single `file` part to `staging` and returns its size.
async fn receive_upload(multipart: &mut Multipart, staging: &Path) -> Result<u64, ApiError> {
    let mut written = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if written.is_some() {
            return Err(ApiError::BadRequest("only one file may be uploaded".to_string()));
        }
        written = Some(write_field(&mut field, staging).await?);
    }
    written.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))
}

async fn write_field(field: &mut Field<'_>, dest: &Path) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Hidden sibling the upload lands in before it replaces the target.
fn staging_path(path: &Path) -> PathBuf {
    path.with_file_name(format!(".{}.upload", file_name(path)))
}

pub async fn rename_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Success>, ApiError> {
    let relative = required(query.file_path, "filePath")?;
    let new_name = required(query.new_name, "newName")?;
    if new_name.contains(['/', '\\']) || new_name == "." || new_name == ".." {
        return Err(ApiError::BadRequest(format!("{new_name} is not a valid file name")));
    }

    let path = existing_file(&state, &relative).await?;
    let new_path = match path.parent() {
        Some(parent) if path != *state.root => parent.join(&new_name),
        _ => return Err(ApiError::BadRequest("cannot rename the shared folder".to_string())),
    };

    tokio::fs::rename(&path, &new_path).await?;
    info!("Renamed {} to {}", path.display(), new_path.display());
    Ok(Json(SUCCESS))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<Success>, ApiError> {
    let relative = required(query.file_path, "filePath")?;
    let path = existing_file(&state, &relative).await?;

    tokio::fs::remove_file(&path).await?;
    info!("Deleted {}", path.display());
    Ok(Json(SUCCESS))
}

pub async fn create_directory(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Success>, ApiError> {
    let relative = required(query.directory_path, "directoryPath")?;
    let path = join_relative(&state.root, &relative)?;

    tokio::fs::create_dir_all(&path).await?;
    Ok(Json(SUCCESS))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
