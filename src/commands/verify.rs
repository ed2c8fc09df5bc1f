//! `devopscli verify tools`: check that required tools are on `PATH`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::debug;

use crate::config::Config;

/// Presence of one required tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: String,
    pub location: Option<PathBuf>,
}

pub fn handle_verify_tools(config: &Config) -> Result<()> {
    let required = &config.tools.required;
    if required.is_empty() {
        bail!("No tools defined in config.yaml");
    }

    let path_var = std::env::var_os("PATH");
    println!("\n🔍 Verifying Required Tools:\n");
    for status in check_tools(required, path_var.as_deref()) {
        match status.location {
            Some(_) => println!("✅ {}", status.name),
            None => println!("❌ {} (Not Installed)", status.name),
        }
    }
    println!();
    Ok(())
}

pub fn check_tools(tools: &[String], path_var: Option<&OsStr>) -> Vec<ToolStatus> {
    tools
        .iter()
        .map(|name| {
            let location = find_executable(name, path_var);
            debug!("{} -> {:?}", name, location);
            ToolStatus {
                name: name.clone(),
                location,
            }
        })
        .collect()
}

/// Resolve a tool the way a shell would. Names containing a path separator
/// are checked directly instead of being searched for.
pub fn find_executable(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    std::env::split_paths(path_var?)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| executable_names(name).map(move |n| dir.join(n)))
        .find(|path| is_executable(path))
}

#[cfg(windows)]
fn executable_names(name: &str) -> impl Iterator<Item = String> + '_ {
    let extensions = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".into());
    std::iter::once(name.to_string()).chain(
        extensions
            .split(';')
            .filter(|e| !e.is_empty())
            .map(move |e| format!("{name}{}", e.to_ascii_lowercase()))
            .collect::<Vec<_>>(),
    )
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn make_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_finds_executable_on_path() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = make_file(second.path(), "kubectl", 0o755);

        let path_var =
            std::env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(
            find_executable("kubectl", Some(path_var.as_os_str())),
            Some(expected)
        );
    }

    #[test]
    fn test_skips_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        make_file(dir.path(), "terraform", 0o644);

        let path_var = dir.path().as_os_str().to_os_string();
        assert_eq!(find_executable("terraform", Some(path_var.as_os_str())), None);
    }

    #[test]
    fn test_missing_path_variable() {
        assert_eq!(find_executable("git", None), None);
        assert_eq!(find_executable("", None), None);
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_file(dir.path(), "helm", 0o755);
        let name = tool.to_str().unwrap();
        assert_eq!(find_executable(name, None), Some(tool.clone()));
    }

    #[test]
    fn test_check_tools_reports_each() {
        let dir = tempfile::tempdir().unwrap();
        make_file(dir.path(), "git", 0o755);
        let path_var = dir.path().as_os_str().to_os_string();

        let tools = vec!["git".to_string(), "docker".to_string()];
        let statuses = check_tools(&tools, Some(path_var.as_os_str()));
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].location.is_some());
        assert_eq!(statuses[1].name, "docker");
        assert!(statuses[1].location.is_none());
    }

    #[test]
    fn test_no_tools_is_error() {
        let err = handle_verify_tools(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No tools defined"));
    }
}
