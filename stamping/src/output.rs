use std::{io::Write, path::Path};

use atomic_write_file::AtomicWriteFile;

use crate::error::{Result, StampError};

/// Creates `dir` and its parents if missing.
pub fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| StampError::OutputWrite {
        path: dir.to_owned(),
        source,
    })
}

/// Writes `bytes` to `path`, replacing the file atomically so that readers never observe a
/// partially written file.
///
/// Fails with [StampError::OutputPathCollision] if `path` exists and `overwrite_existing` is
/// `false`.
pub fn write_output(path: &Path, bytes: &[u8], overwrite_existing: bool) -> Result<()> {
    if !overwrite_existing && path.exists() {
        return Err(StampError::OutputPathCollision {
            path: path.to_owned(),
        });
    }

    let write = || -> std::io::Result<()> {
        let mut file = AtomicWriteFile::open(path)?;
        file.write_all(bytes)?;
        file.commit()
    };
    write().map_err(|source| StampError::OutputWrite {
        path: path.to_owned(),
        source,
    })?;
    log::debug!("Wrote {} bytes to {path:?}.", bytes.len());
    Ok(())
}
