use thiserror::Error;

/// The errors that may occur when parsing a `pssh` box.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read pssh box: {0}")]
    Read(#[from] std::io::Error),

    #[error("Cannot decode base64 pssh data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Data too short to be a valid pssh box ({0} bytes).")]
    TooShort(usize),

    #[error("Expected 'pssh' box type but found '{0}'.")]
    NotPssh(String),

    #[error("Box size {declared} does not match available data ({available} bytes).")]
    SizeMismatch { declared: u64, available: u64 },

    #[error("Unrecognized pssh box version {0}.")]
    UnsupportedVersion(u8),
}
