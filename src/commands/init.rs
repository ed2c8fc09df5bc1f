//! `devopscli init`: write a starter config file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::{Config, DEFAULT_CONFIG_TEMPLATE};

/// Whether `init` wrote a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyExists,
}

pub fn handle_init(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    match write_default_config(&path)? {
        InitOutcome::Created => println!("✅ Config initialized at {}", path.display()),
        InitOutcome::AlreadyExists => {
            println!("⚠️  Config file already exists at {}", path.display())
        }
    }
    Ok(())
}

/// Write the default template unless a file is already there.
pub fn write_default_config(path: &Path) -> Result<InitOutcome> {
    if path.exists() {
        debug!("Leaving existing config at {}", path.display());
        return Ok(InitOutcome::AlreadyExists);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory: {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Error writing config file: {}", path.display()))?;
    Ok(InitOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_config_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devopscli/config.yaml");

        assert_eq!(write_default_config(&path).unwrap(), InitOutcome::Created);
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.openwebui.host, "http://localhost:3000");
    }

    #[test]
    fn test_existing_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "debug: true\n").unwrap();

        assert_eq!(
            write_default_config(&path).unwrap(),
            InitOutcome::AlreadyExists
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "debug: true\n");
    }
}
