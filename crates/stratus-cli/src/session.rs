//! Identity session file

use anyhow::Context as _;
use std::fs;
use std::io::Write;
use std::path::Path;
use stratus_client::IdentitySnapshot;
use tracing::{debug, warn};

/// Read a saved session; a missing or unreadable file means no session
pub fn load(path: &Path) -> anyhow::Result<Option<IdentitySnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;

    match serde_json::from_str(&text) {
        Ok(snapshot) => {
            debug!(path = %path.display(), "loaded session");
            Ok(Some(snapshot))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
            Ok(None)
        }
    }
}

/// Write a session, readable by the owner only
pub fn save(path: &Path, snapshot: &IdentitySnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(snapshot)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to open session file {}", path.display()))?;

    // `mode` only applies to new files; tighten an existing one before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(json.as_bytes())
        .with_context(|| format!("failed to write session file {}", path.display()))?;

    debug!(path = %path.display(), "saved session");
    Ok(())
}
