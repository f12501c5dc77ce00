//! Clients for the external tools that `publish` drives.
//!
//! - [`git`]: the `git` command-line tool (init, remotes, staging, commits,
//!   branches, pushing, config)
//!
//! The client sits behind a trait so the publish pipeline can be exercised
//! against a mock in tests.

pub mod git;
