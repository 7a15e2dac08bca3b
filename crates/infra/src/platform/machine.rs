//! Machine identity lookup.

use std::path::Path;

use deskauth_domain::{AuthError, Result};

const MACHINE_ID_FILES: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Stable identifier for this machine.
///
/// The value is not secret; it binds the token cache key to the machine so
/// a copied cache file cannot be decrypted elsewhere.
///
/// # Errors
/// Returns `AuthError::Internal` if no source yields a non-empty value.
pub fn machine_identity() -> Result<String> {
    if cfg!(windows) {
        if let Some(name) = std::env::var("COMPUTERNAME").ok().and_then(non_empty) {
            return Ok(name);
        }
    }

    if let Some(id) = MACHINE_ID_FILES.iter().find_map(|path| read_id_file(Path::new(path))) {
        return Ok(id);
    }

    hostname::get()
        .ok()
        .and_then(|name| non_empty(name.to_string_lossy().into_owned()))
        .ok_or_else(|| AuthError::Internal("unable to determine machine identity".to_string()))
}

fn read_id_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_id_file_trims_and_skips_blank() {
        let dir = tempfile::tempdir().unwrap();
        let id_path = dir.path().join("machine-id");
        let blank_path = dir.path().join("blank");
        std::fs::write(&id_path, "4c4c4544004d3510\n").unwrap();
        std::fs::write(&blank_path, "  \n").unwrap();

        assert_eq!(read_id_file(&id_path).as_deref(), Some("4c4c4544004d3510"));
        assert!(read_id_file(&blank_path).is_none());
        assert!(read_id_file(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_machine_identity_is_stable() {
        let first = machine_identity().expect("some identity source should exist");
        let second = machine_identity().unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
