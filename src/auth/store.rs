//! Session persistence.
//!
//! The library only reads and writes JSON streams; where they are backed is
//! the caller's choice. File helpers cover the common case used by the CLI.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::config_root_dir;
use crate::error::SessionError;

use super::types::Session;

/// Returns the default session path (`~/.config/gconnect/session.json`) when available.
pub fn default_session_path() -> Option<PathBuf> {
    config_root_dir().map(|dir| dir.join("gconnect").join("session.json"))
}

/// Serialize a session as JSON onto `writer`.
pub fn write_session<W: Write>(session: &Session, mut writer: W) -> Result<(), SessionError> {
    serde_json::to_writer_pretty(&mut writer, session)?;
    writer.flush()?;
    Ok(())
}

/// Deserialize a session from a JSON stream.
pub fn read_session<R: Read>(reader: R) -> Result<Session, SessionError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load a session file; a missing file is `Ok(None)`.
pub fn load_session_file(path: &Path) -> Result<Option<Session>, SessionError> {
    match std::fs::File::open(path) {
        Ok(file) => read_session(std::io::BufReader::new(file)).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SessionError::Io(err)),
    }
}

/// Persist a session file with owner-only permissions.
pub fn save_session_file(path: &Path, session: &Session) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
        }
    }

    let mut options = std::fs::OpenOptions::new();
    options.create(true).truncate(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;
    write_session(session, std::io::BufWriter::new(file))?;
    #[cfg(unix)]
    {
        // Re-assert in case the file pre-existed with wider permissions.
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

/// Delete a session file. Returns `true` when a file was removed.
pub fn remove_session_file(path: &Path) -> Result<bool, SessionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(SessionError::Io(err)),
    }
}
