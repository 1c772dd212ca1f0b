use std::fs;
use std::io;

use camino::Utf8Path;

use crate::error::RetrieverError;

/// Removes a downloaded `.sra` file and then its directory, which must be
/// empty afterwards. Both steps are attempted; the first failure is returned.
pub fn remove_download(sra_file: &Utf8Path, sra_dir: &Utf8Path) -> Result<(), RetrieverError> {
    let file_result = fs::remove_file(sra_file.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(format!("remove {sra_file}: {err}")));
    let dir_result = fs::remove_dir(sra_dir.as_std_path())
        .map_err(|err| RetrieverError::Filesystem(format!("remove {sra_dir}: {err}")));
    file_result.and(dir_result)
}

/// Removes `dir` if it exists and is empty.
pub fn remove_empty_dir(dir: &Utf8Path) -> io::Result<()> {
    match fs::remove_dir(dir.as_std_path()) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
