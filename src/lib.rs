//! scm-activity - per-line SCM measures for analyzed source files
//!
//! Resolves the analyzed project's repository once, runs blame for each
//! file, and folds the result into author, date and revision measures.

pub mod activity;
pub mod config;
pub mod measures;
pub mod scm;
