use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("input is empty")]
    Empty,
}

/// Read the whole input; `-` reads stdin.
pub fn load_input(path: &Path) -> Result<Vec<u8>, InputError> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .map_err(|source| InputError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        buf
    } else {
        fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?
    };
    if bytes.is_empty() {
        return Err(InputError::Empty);
    }
    tracing::debug!(bytes = bytes.len(), path = %path.display(), "input loaded");
    Ok(bytes)
}

/// `load_input`, exiting with status 1 on failure.
pub fn load_or_exit(path: &Path) -> Vec<u8> {
    load_input(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}
