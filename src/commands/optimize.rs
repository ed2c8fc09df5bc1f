//! `devopscli optimize -f <file>`
//!
//! Sends a code or configuration file to the backend and prints the
//! suggested improvements.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::client::ChatTransport;
use crate::config::Config;
use crate::protocol::Turn;

pub async fn handle_optimize(config: &Config, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Error reading file: {}", file.display()))?;

    let client = super::connect(config)?;
    let reply = optimize(&client, file, &content).await?;
    super::print_markdown(&reply);
    Ok(())
}

pub async fn optimize<T>(transport: &T, file: &Path, content: &str) -> Result<String>
where
    T: ChatTransport + ?Sized,
{
    let file_type = detect_file_type(file);
    debug!(
        "optimize: using {} model for {}",
        transport.model(),
        file_type
    );

    transport
        .send_chat(&[Turn::user(build_prompt(file_type, content))])
        .await
        .context("Error from AI")
}

/// Describe a file by its extension, to give the model some context.
pub fn detect_file_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml" | "yml") => "Kubernetes YAML",
        Some("json") => "JSON configuration",
        Some("tf") => "Terraform script",
        Some("sh") => "Shell script",
        Some("py") => "Python script",
        _ => "Unknown format",
    }
}

fn build_prompt(file_type: &str, content: &str) -> String {
    format!("Optimize this {file_type}:\n\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::ScriptedTransport;

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type(Path::new("deploy.yaml")), "Kubernetes YAML");
        assert_eq!(detect_file_type(Path::new("a/b/values.YML")), "Kubernetes YAML");
        assert_eq!(detect_file_type(Path::new("package.json")), "JSON configuration");
        assert_eq!(detect_file_type(Path::new("main.tf")), "Terraform script");
        assert_eq!(detect_file_type(Path::new("run.sh")), "Shell script");
        assert_eq!(detect_file_type(Path::new("app.py")), "Python script");
        assert_eq!(detect_file_type(Path::new("Dockerfile")), "Unknown format");
        assert_eq!(detect_file_type(Path::new(".yaml")), "Unknown format");
    }

    #[tokio::test]
    async fn test_optimize_prompt() {
        let transport = ScriptedTransport::replying("## Suggestions");
        let reply = optimize(&transport, Path::new("main.tf"), "resource {}")
            .await
            .unwrap();

        assert_eq!(reply, "## Suggestions");
        assert_eq!(
            transport.sent(),
            vec![vec![Turn::user("Optimize this Terraform script:\n\nresource {}")]]
        );
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = handle_optimize(&Config::default(), &dir.path().join("nope.sh"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Error reading file"));
    }
}
