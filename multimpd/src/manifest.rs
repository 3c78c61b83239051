//! Locate the Widevine protection header of a DASH manifest.
//!
//! Only the parts of the MPD needed to find `cenc:pssh` values are modelled. Every element
//! which may repeat is a [`Vec`], so a lone element and a list of elements end up with the
//! same shape before any matching runs.

// REFERENCES: https://github.com/emarsden/dash-mpd-rs

use crate::{error::ManifestError, protection::ProtectionHeader};
use log::debug;
use multimpd_pssh::SystemId;
use reqwest::{Url, blocking::Client, header::HeaderMap};
use serde::Deserialize;

pub const VIDEO_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, Default, Deserialize)]
pub struct Mpd {
    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Period {
    #[serde(rename = "AdaptationSet", default)]
    pub adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "ContentProtection", default)]
    pub content_protections: Vec<ContentProtection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentProtection {
    #[serde(rename = "@schemeIdUri")]
    pub scheme_id_uri: Option<String>,
    #[serde(rename = "cenc:pssh", default)]
    pub cenc_pssh: Vec<Pssh>,
    /// Same element without the namespace prefix, as some packagers write it.
    #[serde(rename = "pssh", default)]
    pub pssh: Vec<Pssh>,
}

impl ContentProtection {
    fn is_widevine(&self) -> bool {
        self.scheme_id_uri
            .as_deref()
            .and_then(SystemId::from_scheme_uri)
            .is_some_and(|x| x == SystemId::Widevine)
    }

    fn pssh_value(&self) -> Option<&str> {
        self.cenc_pssh
            .iter()
            .chain(&self.pssh)
            .map(|x| x.value.trim())
            .find(|x| !x.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Pssh {
    #[serde(rename = "$text", default)]
    pub value: String,
}

pub fn parse(text: &str) -> Result<Mpd, ManifestError> {
    Ok(quick_xml::de::from_str::<Mpd>(text)?)
}

/// Widevine header of the video adaptation sets.
///
/// When several adaptation sets carry one, the last in document order is returned, even
/// when an earlier one would decode and the last would not. Sets and protection entries
/// with missing attributes are skipped.
pub fn scan(mpd: &Mpd) -> Result<Option<ProtectionHeader>, ManifestError> {
    let mut value = None;

    for (period_index, period) in mpd.periods.iter().enumerate() {
        for adaptation_set in &period.adaptation_sets {
            if adaptation_set.mime_type.as_deref() != Some(VIDEO_MIME_TYPE) {
                continue;
            }

            for content_protection in &adaptation_set.content_protections {
                if !content_protection.is_widevine() {
                    continue;
                }

                match content_protection.pssh_value() {
                    Some(x) => value = Some(x),
                    None => debug!("period {} has a widevine entry without cenc:pssh", period_index),
                }
            }
        }
    }

    Ok(value.map(ProtectionHeader::from_base64).transpose()?)
}

pub fn scan_str(text: &str) -> Result<Option<ProtectionHeader>, ManifestError> {
    scan(&parse(text)?)
}

/// GET the manifest text, any non 2xx status is an error.
pub fn fetch(client: &Client, url: &Url, headers: &HeaderMap) -> Result<String, ManifestError> {
    debug!("fetching manifest {}", url);
    let response = client.get(url.clone()).headers(headers.clone()).send()?;
    let status = response.status();

    if !status.is_success() {
        return Err(ManifestError::Status {
            status: status.as_u16(),
        });
    }

    Ok(response.text()?)
}
