//! Config command - show the effective SCM settings

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use scm_activity::config::ScmConfiguration;

/// Run the config command
pub fn run(path: &Path) -> Result<()> {
    let basedir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    let config = ScmConfiguration::load(&basedir);

    println!("{}", style("SCM configuration").bold());
    if let Some(user_path) = ScmConfiguration::user_config_path() {
        println!("  user config: {}", style(user_path.display()).dim());
    }
    println!("  url:         {}", config.url().unwrap_or("(none)"));
    println!(
        "  provider:    {}",
        config
            .provider()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  user:        {}", config.user().unwrap_or("(none)"));
    println!(
        "  password:    {}",
        if config.password().is_some() { "****" } else { "(none)" }
    );

    Ok(())
}
