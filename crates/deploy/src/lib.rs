//! Deploy flow: upload, environment file, compose build, readiness check.
//!
//! Library crate with no SSH dependency. The binary opens a session and
//! passes it in as a [`RemoteTransport`](shipwright_uploader::RemoteTransport).
//!
//! # Pipeline
//!
//! 1. **Scan**: walk the project directory
//! 2. **Prepare**: ensure the remote project directory exists
//! 3. **Upload**: replicate the tree, skipping failed files
//! 4. **Env**: write a freshly generated environment file
//! 5. **Compose**: build and start containers, streaming output
//! 6. **Status**: list containers

pub mod check;
pub mod compose;
pub mod deploy;
pub mod env;
pub mod error;
pub mod types;

pub use check::{
    CheckReport, CheckSection, CommandCheck, SectionReport, check_host, default_sections,
};
pub use compose::{ComposeSpec, shell_quote};
pub use deploy::Deployer;
pub use env::{EnvSpec, generate_secret, render_env_file};
pub use error::DeployError;
pub use types::{DEFAULT_EXCLUDES, DeployEvent, DeployOutcome, DeployPlan, DeployStep};
