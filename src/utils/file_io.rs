use std::fs::create_dir_all;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::error;

use crate::Result;
use crate::StorageError;

pub fn create_parent_dir_if_not_exist(path: &PathBuf) -> Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.exists() {
            if let Err(e) = create_dir_all(parent_dir) {
                error!("Failed to create log directory: {:?}", e);
                return Err(StorageError::IoError(e).into());
            }
        }
    }
    Ok(())
}

pub fn open_file_for_append(path: PathBuf) -> Result<File> {
    create_parent_dir_if_not_exist(&path)?;
    let log_file = match OpenOptions::new().append(true).create(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            return Err(StorageError::IoError(e).into());
        }
    };
    Ok(log_file)
}
