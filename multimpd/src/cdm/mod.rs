//! Content decryption module capability.
//!
//! The license exchange itself (request encoding, key unwrapping) is done by a CDM
//! implementation behind the [`Cdm`] trait. [`Session`] enforces the session life cycle
//! on top of it and [`ProfileStore`] picks the device profile a CDM is loaded for.
//!
//! [`LocalBackend`] loads the device file itself, [`RemoteBackend`] asks a
//! `pywidevine serve` instance holding a device of the same name.

mod local;
mod profile;
mod remote;
mod session;

pub use local::{LocalBackend, LocalCdm};
pub use profile::{Profile, ProfileStore};
pub use remote::{RemoteBackend, RemoteCdm};
pub use session::{Session, SessionState};

use crate::protection::ProtectionHeader;
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdmError {
    #[error("cannot read device file {}: {source}", .path.display())]
    Profile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Widevine(#[from] drm_widevine::CdmError),

    #[error("no cdm session {0}")]
    UnknownSession(String),

    #[error("cdm request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cdm responded with {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("cannot decode cdm response: {0}")]
    Decode(String),

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// Class of a key released by a license.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyType {
    Signing,
    Content,
    KeyControl,
    OperatorSession,
    Entitlement,
    OemContent,
    Other(String),
}

impl KeyType {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "SIGNING" => Self::Signing,
            "CONTENT" => Self::Content,
            "KEY_CONTROL" => Self::KeyControl,
            "OPERATOR_SESSION" => Self::OperatorSession,
            "ENTITLEMENT" => Self::Entitlement,
            "OEM_CONTENT" => Self::OemContent,
            _ => Self::Other(name.to_owned()),
        }
    }
}

impl FromStr for KeyType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                KeyType::Signing => "SIGNING",
                KeyType::Content => "CONTENT",
                KeyType::KeyControl => "KEY_CONTROL",
                KeyType::OperatorSession => "OPERATOR_SESSION",
                KeyType::Entitlement => "ENTITLEMENT",
                KeyType::OemContent => "OEM_CONTENT",
                KeyType::Other(x) => x,
            }
        )
    }
}

/// Key released by a parsed license.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    pub kid: Vec<u8>,
    pub key: Vec<u8>,
    pub typ: KeyType,
}

/// Operations a content decryption module offers for one loaded device profile.
///
/// Session ids are opaque strings handed out by [`Cdm::open`].
pub trait Cdm {
    fn open(&self) -> Result<String, CdmError>;

    fn license_challenge(
        &self,
        session_id: &str,
        pssh: &ProtectionHeader,
    ) -> Result<Vec<u8>, CdmError>;

    fn parse_license(&self, session_id: &str, license: &[u8]) -> Result<(), CdmError>;

    fn keys(&self, session_id: &str) -> Result<Vec<Key>, CdmError>;

    fn close(&self, session_id: &str) -> Result<(), CdmError>;
}

/// Loads a [`Cdm`] for a device profile.
pub trait CdmBackend {
    type Cdm: Cdm;

    fn load(&self, profile: &Profile) -> Result<Self::Cdm, CdmError>;
}
