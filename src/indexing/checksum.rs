use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{IndexError, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hex BLAKE3 digest of the file's raw bytes, read in fixed-size chunks.
pub async fn checksum_file(path: &Path) -> Result<String> {
    let checksum_err = |source| IndexError::Checksum {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(checksum_err)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await.map_err(checksum_err)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
