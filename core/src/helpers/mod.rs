use std::{
    env, fs,
    path::{Path, PathBuf},
};

use rand::{distr::Alphanumeric, Rng};
use tracing::debug;

pub fn generate_random_id(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Full path to a temporary file, without creating it.
///
/// No extension on purpose, the file is only ever consumed by bcp.
pub fn temp_file_path(directory: Option<&Path>) -> PathBuf {
    let dir = directory.map(Path::to_path_buf).unwrap_or_else(env::temp_dir);
    dir.join(generate_random_id(21))
}

pub(crate) fn cleanup_temp_files(paths: &[&Path], keep: bool) {
    if keep {
        for path in paths {
            debug!("Debug mode, keeping temp file at {}", path.display());
        }
        return;
    }

    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            debug!("Could not remove temp file {}: {}", path.display(), e);
        }
    }
}
