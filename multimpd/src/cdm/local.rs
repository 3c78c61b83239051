use super::{Cdm, CdmBackend, CdmError, Key, KeyType, Profile};
use crate::protection::ProtectionHeader;
use drm_widevine::{
    Device, LicenseType,
    core::{self, PsshBox},
};
use log::debug;
use std::{cell::RefCell, collections::HashMap, fs};

/// Runs the Widevine exchange in process with the device stored in the profile file.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalBackend;

impl CdmBackend for LocalBackend {
    type Cdm = LocalCdm;

    fn load(&self, profile: &Profile) -> Result<Self::Cdm, CdmError> {
        let data = fs::read(&profile.path).map_err(|e| CdmError::Profile {
            path: profile.path.clone(),
            source: e,
        })?;
        let device = Device::from_bytes(&data)?;
        debug!(
            "loaded {:?} {:?} device {}",
            device.security_level,
            device.device_type,
            profile.path.display()
        );

        Ok(LocalCdm {
            device,
            sessions: RefCell::default(),
        })
    }
}

/// One `.wvd` device and the sessions opened on it.
pub struct LocalCdm {
    device: Device,
    sessions: RefCell<HashMap<String, LocalSession>>,
}

struct LocalSession {
    session: drm_widevine::Session,
    keys: Vec<Key>,
}

impl LocalCdm {
    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut LocalSession) -> Result<T, CdmError>,
    ) -> Result<T, CdmError> {
        let mut sessions = self.sessions.borrow_mut();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CdmError::UnknownSession(session_id.to_owned()))?;
        f(session)
    }
}

impl Cdm for LocalCdm {
    fn open(&self) -> Result<String, CdmError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.borrow_mut().insert(
            id.clone(),
            LocalSession {
                session: drm_widevine::Session::new(self.device.clone()),
                keys: Vec::new(),
            },
        );
        Ok(id)
    }

    fn license_challenge(
        &self,
        session_id: &str,
        pssh: &ProtectionHeader,
    ) -> Result<Vec<u8>, CdmError> {
        let pssh = PsshBox::from_bytes(&widevine_box(pssh.data()))
            .map_err(drm_widevine::CdmError::from)?;

        self.with_session(session_id, |x| {
            Ok(x.session
                .build_license_challenge(&pssh, LicenseType::Streaming)?)
        })
    }

    fn parse_license(&self, session_id: &str, license: &[u8]) -> Result<(), CdmError> {
        self.with_session(session_id, |x| {
            let keys = x
                .session
                .parse_license_response(license)?
                .iter()
                .map(|k| Key {
                    kid: k.kid().to_vec(),
                    key: k.key().to_vec(),
                    typ: key_type(k.key_type()),
                })
                .collect::<Vec<_>>();
            x.keys = keys;
            Ok(())
        })
    }

    fn keys(&self, session_id: &str) -> Result<Vec<Key>, CdmError> {
        self.with_session(session_id, |x| Ok(x.keys.clone()))
    }

    fn close(&self, session_id: &str) -> Result<(), CdmError> {
        self.sessions
            .borrow_mut()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| CdmError::UnknownSession(session_id.to_owned()))
    }
}

fn key_type(typ: core::KeyType) -> KeyType {
    match typ {
        core::KeyType::Signing => KeyType::Signing,
        core::KeyType::Content => KeyType::Content,
        core::KeyType::KeyControl => KeyType::KeyControl,
        core::KeyType::OperatorSession => KeyType::OperatorSession,
        core::KeyType::Entitlement => KeyType::Entitlement,
        core::KeyType::OemContent => KeyType::OemContent,
    }
}

/// Complete `pssh` box for the init data. Data which already is a box is returned as is.
fn widevine_box(data: &[u8]) -> Vec<u8> {
    if data.get(4..8) == Some(b"pssh".as_slice()) {
        return data.to_vec();
    }

    let size = (32 + data.len()) as u32;
    let mut bytes = size.to_be_bytes().to_vec();
    bytes.extend(b"pssh");
    bytes.extend([0u8; 4]);
    bytes.extend(core::WIDEVINE_SYSTEM_ID);
    bytes.extend((data.len() as u32).to_be_bytes());
    bytes.extend(data);
    bytes
}
