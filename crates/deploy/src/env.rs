//! Remote environment file rendering.

use std::collections::HashSet;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Secret length in bytes (produces 128 hex characters).
const SECRET_BYTES: usize = 64;

/// Contents of the environment file written next to the compose project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSpec {
    /// File name relative to the remote project directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Literal `KEY = VALUE` pairs, written in order.
    #[serde(default)]
    pub vars: Vec<(String, String)>,

    /// Keys that receive a fresh random secret on every deploy.
    #[serde(default)]
    pub generated: Vec<String>,
}

fn default_file_name() -> String {
    ".env".into()
}

impl Default for EnvSpec {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            vars: Vec::new(),
            generated: Vec::new(),
        }
    }
}

/// Generates a CSPRNG secret as a 128-character lowercase hex string.
pub fn generate_secret() -> String {
    let mut bytes = vec![0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Renders `spec` as `KEY=VALUE` lines.
///
/// Literal pairs come first, then one line per generated key. Keys must
/// be non-empty, unique, and free of `=` and whitespace; values must be
/// single-line.
pub fn render_env_file(spec: &EnvSpec) -> Result<String, DeployError> {
    let mut seen = HashSet::new();
    let mut out = String::new();

    let generated = spec
        .generated
        .iter()
        .map(|key| (key.as_str(), generate_secret()));
    let literal = spec
        .vars
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()));

    for (key, value) in literal.chain(generated) {
        validate_key(key)?;
        if !seen.insert(key) {
            return Err(DeployError::InvalidEnv(format!("duplicate key: {key}")));
        }
        if value.contains('\n') || value.contains('\r') {
            return Err(DeployError::InvalidEnv(format!(
                "value for {key} spans multiple lines"
            )));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }

    Ok(out)
}

fn validate_key(key: &str) -> Result<(), DeployError> {
    if key.is_empty() {
        return Err(DeployError::InvalidEnv("empty key".into()));
    }
    if key.contains('=') || key.chars().any(char::is_whitespace) {
        return Err(DeployError::InvalidEnv(format!("malformed key: {key:?}")));
    }
    Ok(())
}
