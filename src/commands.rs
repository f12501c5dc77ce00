//! The CLI commands, each implemented as a method on [`crate::App`].
//!
//! - [`publish`]: init, remote, stage, commit, branch and push in one run
//! - [`init`]: store the publish configuration in `.git/config`

pub mod init;
pub mod publish;
