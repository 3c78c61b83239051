use crate::{cdm::CdmError, fetch::FetchError, media::TrackKind};
use multimpd_pssh::SystemId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors which abort a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No MPD URL or media files provided.")]
    NoInput,

    #[error("{0}")]
    Input(String),

    #[error("Unable to download media: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("No PSSH found or provided.")]
    MissingPssh,

    #[error("No license URL provided.")]
    MissingLicenseUrl,

    #[error(transparent)]
    License(#[from] LicenseError),

    #[error("Failed decrypting {track} track: {message}")]
    Decryption { track: TrackKind, message: String },

    #[error("Muxing failed: {0}")]
    Mux(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Unable to fetch manifest: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Manifest request failed with status {status}.")]
    Status { status: u16 },

    #[error("Unable to parse manifest: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("Manifest PSSH cannot be decoded: {0}")]
    InvalidPssh(#[from] multimpd_pssh::Error),
}

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("{0} PSSH is not supported, only widevine headers can be licensed.")]
    UnsupportedSystem(SystemId),

    #[error("No .wvd files found in {} directory.", .0.display())]
    NoCdmProfile(PathBuf),

    #[error("Unable to open CDM session: {0}")]
    CdmOpen(#[source] CdmError),

    #[error("Unable to build license challenge: {0}")]
    Challenge(#[source] CdmError),

    #[error("License request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unable to obtain decryption keys, got error code {status}: '{body}'")]
    LicenseServer { status: u16, body: String },

    #[error("Unable to parse license: {0}")]
    LicenseParse(#[source] CdmError),

    #[error("Unable to extract key(s), license contains no content keys.")]
    NoKeys,
}
