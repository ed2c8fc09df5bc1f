//! `devopscli version`

use crate::config::Config;

pub fn handle_version(config: &Config) {
    for line in version_lines(config) {
        println!("{line}");
    }
}

fn version_lines(config: &Config) -> Vec<String> {
    let mut lines = Vec::new();
    if config.debug {
        lines.push("DevOps AI CLI - Debug Mode".to_string());
    }
    lines.push(format!("DevOps AI CLI v{}", config.version()));
    lines
}
