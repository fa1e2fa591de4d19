//! Token signing key loading.
//!
//! The key is read from `AUTH_KEY_FILE`. Debug builds, or release builds
//! with `AUTH_ALLOW_EPHEMERAL=1`, fall back to a random per-process key and
//! log a warning; every issued token dies with the process.

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use mockable::Env;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use zeroize::Zeroizing;

const AUTH_KEY_DEFAULT_PATH: &str = "/var/run/secrets/auth_key";
/// Release builds refuse shorter keys.
pub const AUTH_KEY_MIN_LEN: usize = 32;
const KEY_FILE_ENV: &str = "AUTH_KEY_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "AUTH_ALLOW_EPHEMERAL";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for key validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Missing or malformed toggles are tolerated with a warning.
    Debug,
    /// Toggles must be present and valid.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// ```rust
    /// use tourbook::inbound::http::auth_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Secret bytes used to sign bearer tokens.
pub struct AuthKey {
    bytes: Zeroizing<Vec<u8>>,
    ephemeral: bool,
}

impl AuthKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the key was generated for this process only.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0_u8; AUTH_KEY_MIN_LEN * 2]);
        OsRng.fill_bytes(&mut bytes);
        Self {
            bytes,
            ephemeral: true,
        }
    }
}

/// Errors raised while loading the signing key.
#[derive(thiserror::Error, Debug)]
pub enum AuthConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read auth key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("auth key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("AUTH_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Load the signing key according to the environment and build mode.
///
/// # Errors
///
/// Release builds fail when a toggle is missing or invalid, when the key
/// file cannot be read, or when it is shorter than [`AUTH_KEY_MIN_LEN`].
pub fn auth_key_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<AuthKey, AuthConfigError> {
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| AUTH_KEY_DEFAULT_PATH.to_owned()),
    );

    match read_key_file(&path) {
        Ok(bytes) => {
            let length = bytes.len();
            if mode == BuildMode::Release && length < AUTH_KEY_MIN_LEN {
                return Err(AuthConfigError::KeyTooShort {
                    path,
                    length,
                    min_len: AUTH_KEY_MIN_LEN,
                });
            }
            Ok(AuthKey {
                bytes,
                ephemeral: false,
            })
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary auth key; tokens will not survive a restart"
            );
            Ok(AuthKey::generate())
        }
        Err(error) => Err(AuthConfigError::KeyRead {
            path,
            source: error,
        }),
    }
}

fn read_key_file(path: &Path) -> std::io::Result<Zeroizing<Vec<u8>>> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "key path has no file name")
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read(file_name).map(Zeroizing::new)
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, AuthConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        if mode.is_debug() {
            return Ok(false);
        }
        return Err(AuthConfigError::MissingEnv {
            name: ALLOW_EPHEMERAL_ENV,
        });
    };
    match (parse_bool(&value), mode) {
        (Some(true), BuildMode::Release) => Err(AuthConfigError::EphemeralNotAllowed),
        (Some(flag), _) => Ok(flag),
        (None, BuildMode::Debug) => {
            warn!(%value, "invalid AUTH_ALLOW_EPHEMERAL; defaulting to disabled");
            Ok(false)
        }
        (None, BuildMode::Release) => Err(AuthConfigError::InvalidEnv {
            name: ALLOW_EPHEMERAL_ENV,
            value,
            expected: BOOL_EXPECTED,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
