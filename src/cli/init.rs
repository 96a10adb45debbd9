//! Init command - write a starter scm-activity.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use scm_activity::config::{guess_url, PROJECT_CONFIG_FILE};

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let basedir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !basedir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", basedir.display());
    }

    let config_path = basedir.join(PROJECT_CONFIG_FILE);
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, starter_config(guess_url(&basedir).as_deref()))
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    Ok(())
}

fn starter_config(guessed_url: Option<&str>) -> String {
    let url_line = match guessed_url {
        Some(url) => format!("url = \"{}\"", url),
        None => "# url = \"scm:git:https://example.com/project.git\"".to_string(),
    };
    format!(
        r#"# scm-activity configuration
# Environment variables SCM_URL, SCM_PROVIDER, SCM_USER and SCM_PASSWORD
# override these values.

[scm]
# Connection URL: scm:<provider>:<provider-specific part>
{url_line}

# Provider override (git, svn, hg, cvs). Defaults to the URL's provider.
# provider = "git"

# Credentials, applied only when user is not blank
# user = ""
# password = ""
"#
    )
}
