//! Widevine license exchange.

use crate::{
    cdm::{CdmBackend, KeyType, ProfileStore, Session},
    error::LicenseError,
    key::ContentKey,
    protection::ProtectionHeader,
};
use log::{debug, warn};
use multimpd_pssh::SystemId;
use reqwest::{Url, blocking::Client, header::HeaderMap};

/// Status and body of a license server reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends the raw license challenge to the license server.
pub trait Transport {
    fn post(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<HttpResponse, reqwest::Error>;
}

impl Transport for Client {
    fn post(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = Client::post(self, url.clone())
            .headers(headers.clone())
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Anything that turns a protection header into content keys.
pub trait KeySource {
    fn acquire_keys(
        &self,
        header: &ProtectionHeader,
        license_url: &Url,
        headers: &HeaderMap,
    ) -> Result<Vec<ContentKey>, LicenseError>;
}

/// Performs the license exchange through a CDM loaded for any installed profile.
pub struct LicenseClient<B, T> {
    profiles: ProfileStore,
    backend: B,
    transport: T,
}

impl<B: CdmBackend, T: Transport> LicenseClient<B, T> {
    pub fn new(profiles: ProfileStore, backend: B, transport: T) -> Self {
        Self {
            profiles,
            backend,
            transport,
        }
    }
}

impl<B: CdmBackend, T: Transport> KeySource for LicenseClient<B, T> {
    fn acquire_keys(
        &self,
        header: &ProtectionHeader,
        license_url: &Url,
        headers: &HeaderMap,
    ) -> Result<Vec<ContentKey>, LicenseError> {
        if header.system() != &SystemId::Widevine {
            return Err(LicenseError::UnsupportedSystem(header.system().clone()));
        }

        let profile = self
            .profiles
            .select()
            .ok_or_else(|| LicenseError::NoCdmProfile(self.profiles.directory().to_owned()))?;
        debug!("using cdm profile {}", profile.path.display());

        let cdm = self.backend.load(&profile).map_err(LicenseError::CdmOpen)?;
        let mut session = Session::open(&cdm).map_err(LicenseError::CdmOpen)?;
        let challenge = session.challenge(header).map_err(LicenseError::Challenge)?;

        debug!("posting {} byte challenge to {}", challenge.len(), license_url);
        let response = self.transport.post(license_url, headers, challenge)?;

        if !(200..=299).contains(&response.status) {
            return Err(LicenseError::LicenseServer {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        session
            .parse_license(&response.body)
            .map_err(LicenseError::LicenseParse)?;

        let keys = session
            .keys()
            .map_err(LicenseError::LicenseParse)?
            .into_iter()
            .filter(|x| x.typ == KeyType::Content)
            .map(|x| ContentKey::new(&x.kid, &x.key))
            .collect::<Vec<_>>();

        if let Err(e) = session.close() {
            warn!("Unable to close CDM session: {}", e);
        }

        if keys.is_empty() {
            return Err(LicenseError::NoKeys);
        }

        Ok(keys)
    }
}
