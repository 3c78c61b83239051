//! Parser for mp4 `pssh` (protection system specific header) boxes.
//!
//! A `pssh` box carries the DRM system id, an optional list of key ids (version 1 boxes)
//! and a system specific payload. Manifests usually embed the whole box base64 encoded,
//! which is what license servers expect as init data.
//!
//! ```
//! use multimpd_pssh::{PsshBox, SystemId};
//!
//! let pssh = PsshBox::from_base64(
//!     "AAAAInBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7QAAAAISNA==",
//! ).unwrap();
//! assert_eq!(pssh.system_id, SystemId::Widevine);
//! assert_eq!(pssh.data, vec![0x12, 0x34]);
//! ```

mod error;
mod reader;

pub use error::Error;
pub use reader::Reader;

use base64::Engine;

/// A `Result` alias where the `Err` case is `multimpd_pssh::Error`.
pub type Result<T> = std::result::Result<T, Error>;

const COMMON_SYSTEM_ID: &str = "1077efecc0b24d02ace33c1e52e2fb4b";
const PLAYREADY_SYSTEM_ID: &str = "9a04f07998404286ab92e65be0885f95";
const WIDEVINE_SYSTEM_ID: &str = "edef8ba979d64acea3c827dcd51d21ed";

/// DRM system which produced a `pssh` box.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SystemId {
    Common,
    Other(String),
    PlayReady,
    Widevine,
}

impl SystemId {
    /// Build from a 32 character hex system id, dashes are ignored.
    pub fn from_hex(value: &str) -> Self {
        let value = value.replace('-', "").to_ascii_lowercase();

        match value.as_str() {
            COMMON_SYSTEM_ID => Self::Common,
            PLAYREADY_SYSTEM_ID => Self::PlayReady,
            WIDEVINE_SYSTEM_ID => Self::Widevine,
            _ => Self::Other(value),
        }
    }

    /// Build from a DASH `schemeIdUri` such as `urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed`.
    pub fn from_scheme_uri(uri: &str) -> Option<Self> {
        let lower = uri.to_ascii_lowercase();
        let uuid = lower.strip_prefix("urn:uuid:")?;

        if uuid.replace('-', "").len() != 32 {
            return None;
        }

        Some(Self::from_hex(uuid))
    }

    /// System id in hex without dashes.
    pub fn hex(&self) -> &str {
        match self {
            Self::Common => COMMON_SYSTEM_ID,
            Self::Other(x) => x,
            Self::PlayReady => PLAYREADY_SYSTEM_ID,
            Self::Widevine => WIDEVINE_SYSTEM_ID,
        }
    }

    /// `urn:uuid:` form used by DASH manifests.
    pub fn scheme_uri(&self) -> String {
        format!("urn:uuid:{}", uuid(self.hex()))
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SystemId::Common => "common",
                SystemId::Other(x) => x,
                SystemId::PlayReady => "playready",
                SystemId::Widevine => "widevine",
            }
        )
    }
}

/// Key id listed in a version 1 `pssh` box.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyId(pub String);

impl KeyId {
    pub fn uuid(&self) -> String {
        uuid(&self.0)
    }
}

fn uuid(value: &str) -> String {
    if value.len() != 32 || !value.is_ascii() {
        return value.to_owned();
    }

    format!(
        "{}-{}-{}-{}-{}",
        &value[..8],
        &value[8..12],
        &value[12..16],
        &value[16..20],
        &value[20..]
    )
}

/// A parsed `pssh` box.
#[derive(Clone, Debug)]
pub struct PsshBox {
    pub version: u8,
    pub system_id: SystemId,
    pub key_ids: Vec<KeyId>,
    /// System specific payload.
    pub data: Vec<u8>,
}

impl PsshBox {
    /// Parse base64 encoded `pssh` box, surrounding whitespace is ignored.
    pub fn from_base64(input: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(input.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Parse the `pssh` box at the start of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 {
            return Err(Error::TooShort(bytes.len()));
        }

        let mut reader = Reader::new(bytes.to_vec());
        let mut size = reader.read_u32()? as u64;
        let box_type = reader.read_bytes_u8(4)?;

        if box_type != b"pssh" {
            return Err(Error::NotPssh(String::from_utf8_lossy(&box_type).into_owned()));
        }

        if size == 1 {
            size = reader.read_u64()?;
        } else if size == 0 {
            size = reader.get_length();
        }

        if size < 32 || size > reader.get_length() {
            return Err(Error::SizeMismatch {
                declared: size,
                available: reader.get_length(),
            });
        }

        let version = (reader.read_u32()? >> 24) as u8;

        if version > 1 {
            return Err(Error::UnsupportedVersion(version));
        }

        let system_id = SystemId::from_hex(&hex::encode(reader.read_bytes_u8(16)?));
        let mut key_ids = vec![];

        if version > 0 {
            let num_key_ids = reader.read_u32()?;

            for _ in 0..num_key_ids {
                key_ids.push(KeyId(hex::encode(reader.read_bytes_u8(16)?)));
            }
        }

        let data_size = reader.read_u32()?;
        let data = reader.read_bytes_u8(data_size as usize)?;

        Ok(Self {
            version,
            system_id,
            key_ids,
            data,
        })
    }
}
