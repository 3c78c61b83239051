//! Widevine protected DASH downloads: PSSH discovery, license exchange through a
//! CDM, per track decryption with `mp4decrypt` and stream copy muxing with `ffmpeg`.
//!
//! The [`pipeline::Pipeline`] sequences every stage over capability traits
//! ([`fetch::Fetcher`], [`license::KeySource`], [`decrypt::Decryptor`] and
//! [`mux::Muxer`]) and reports through [`pipeline::Event`]s.

pub mod cdm;
mod commands;
pub mod decrypt;
pub mod error;
pub mod export;
pub mod fetch;
pub mod history;
pub mod key;
pub mod license;
mod logger;
pub mod manifest;
pub mod media;
pub mod mux;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod protection;
pub mod utils;

#[doc(hidden)]
pub use commands::Args;
pub use error::{Error, LicenseError, ManifestError};
pub use logger::Logger;
pub use multimpd_pssh as pssh;
pub use reqwest;
