//! Configuration module for scm-activity
//!
//! This module handles:
//! - SCM connection settings (URL, provider, credentials)
//! - Connection URL guessing from the project layout

mod scm_config;

pub use scm_config::{guess_url, ScmConfiguration, PROJECT_CONFIG_FILE};
