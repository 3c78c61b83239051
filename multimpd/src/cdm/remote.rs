/*
    REFERENCES
    ----------

    1. https://github.com/devine-dl/pywidevine/blob/master/pywidevine/serve.py
    2. https://github.com/devine-dl/pywidevine/blob/master/pywidevine/remotecdm.py

*/

use super::{Cdm, CdmBackend, CdmError, Key, KeyType, Profile};
use crate::protection::ProtectionHeader;
use base64::Engine;
use log::debug;
use reqwest::{
    Url,
    blocking::{Client, RequestBuilder},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

const SECRET_HEADER: &str = "X-Secret-Key";

/// Connection settings of a `pywidevine serve` compatible CDM API.
#[derive(Clone, Debug)]
pub struct RemoteBackend {
    client: Client,
    host: Url,
    secret: Option<String>,
}

impl RemoteBackend {
    pub fn new(client: Client, mut host: Url, secret: Option<String>) -> Self {
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        Self {
            client,
            host,
            secret,
        }
    }
}

impl CdmBackend for RemoteBackend {
    type Cdm = RemoteCdm;

    fn load(&self, profile: &Profile) -> Result<Self::Cdm, CdmError> {
        let base = self
            .host
            .join(&format!("{}/", profile.name))
            .map_err(|e| CdmError::Decode(format!("invalid device name '{}': {}", profile.name, e)))?;

        Ok(RemoteCdm {
            client: self.client.clone(),
            base,
            secret: self.secret.clone(),
        })
    }
}

/// One device served by a remote CDM API.
pub struct RemoteCdm {
    client: Client,
    base: Url,
    secret: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: u16,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct OpenData {
    session_id: String,
}

#[derive(Deserialize)]
struct ChallengeData {
    challenge_b64: String,
}

#[derive(Deserialize)]
struct KeysData {
    keys: Vec<RemoteKey>,
}

#[derive(Deserialize)]
struct RemoteKey {
    key_id: String,
    key: String,
    #[serde(rename = "type")]
    typ: String,
}

impl RemoteCdm {
    fn url(&self, path: &str) -> Result<Url, CdmError> {
        self.base
            .join(path)
            .map_err(|e| CdmError::Decode(format!("invalid cdm endpoint '{}': {}", path, e)))
    }

    fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, CdmError> {
        let request = match &self.secret {
            Some(secret) => request.header(SECRET_HEADER, secret),
            None => request,
        };

        let response = request.send()?;
        let status = response.status();
        let body = response.bytes()?;
        decode_envelope(status.as_u16(), &body)
    }

    fn call_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CdmError> {
        self.call(request)?
            .ok_or_else(|| CdmError::Decode("response has no data".to_owned()))
    }
}

fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<Option<T>, CdmError> {
    let envelope = serde_json::from_slice::<Envelope<T>>(body).map_err(|e| {
        if (200..=299).contains(&status) {
            CdmError::Decode(e.to_string())
        } else {
            CdmError::Remote {
                status,
                message: String::from_utf8_lossy(body).trim().to_owned(),
            }
        }
    })?;

    if !(200..=299).contains(&status) || envelope.status != 200 {
        return Err(CdmError::Remote {
            status: envelope.status,
            message: envelope.message,
        });
    }

    Ok(envelope.data)
}

fn decode_keys(data: KeysData) -> Result<Vec<Key>, CdmError> {
    data.keys
        .into_iter()
        .map(|x| {
            Ok(Key {
                kid: hex::decode(x.key_id.replace('-', ""))
                    .map_err(|e| CdmError::Decode(format!("key id '{}': {}", x.key_id, e)))?,
                key: hex::decode(&x.key)
                    .map_err(|e| CdmError::Decode(format!("key for '{}': {}", x.key_id, e)))?,
                typ: KeyType::from_name(&x.typ),
            })
        })
        .collect()
}

impl Cdm for RemoteCdm {
    fn open(&self) -> Result<String, CdmError> {
        let data: OpenData = self.call_data(self.client.get(self.url("open")?))?;
        Ok(data.session_id)
    }

    fn license_challenge(
        &self,
        session_id: &str,
        pssh: &ProtectionHeader,
    ) -> Result<Vec<u8>, CdmError> {
        debug!("requesting license challenge from {}", self.base);
        let data: ChallengeData = self.call_data(
            self.client
                .post(self.url("get_license_challenge/STREAMING")?)
                .json(&json!({
                    "session_id": session_id,
                    "init_data": pssh.to_base64(),
                    "privacy_mode": true,
                })),
        )?;

        base64::engine::general_purpose::STANDARD
            .decode(&data.challenge_b64)
            .map_err(|e| CdmError::Decode(format!("challenge: {}", e)))
    }

    fn parse_license(&self, session_id: &str, license: &[u8]) -> Result<(), CdmError> {
        self.call::<serde_json::Value>(self.client.post(self.url("parse_license")?).json(
            &json!({
                "session_id": session_id,
                "license_message": base64::engine::general_purpose::STANDARD.encode(license),
            }),
        ))?;
        Ok(())
    }

    fn keys(&self, session_id: &str) -> Result<Vec<Key>, CdmError> {
        let data: KeysData = self.call_data(
            self.client
                .post(self.url("get_keys/ALL")?)
                .json(&json!({ "session_id": session_id })),
        )?;
        decode_keys(data)
    }

    fn close(&self, session_id: &str) -> Result<(), CdmError> {
        self.call::<serde_json::Value>(
            self.client
                .get(self.url(&format!("close/{}", session_id))?),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_urls() {
        let backend = RemoteBackend::new(
            Client::new(),
            "http://127.0.0.1:8786/cdm".parse().unwrap(),
            None,
        );
        assert_eq!(backend.host.as_str(), "http://127.0.0.1:8786/cdm/");

        let cdm = backend
            .load(&Profile::from_path("CDM/android_l3.wvd").unwrap())
            .unwrap();
        assert_eq!(
            cdm.url("get_keys/ALL").unwrap().as_str(),
            "http://127.0.0.1:8786/cdm/android_l3/get_keys/ALL"
        );
    }

    #[test]
    fn test_decode_envelope() {
        let data: Option<OpenData> = decode_envelope(
            200,
            br#"{"status": 200, "message": "Success", "data": {"session_id": "abcd"}}"#,
        )
        .unwrap();
        assert_eq!(data.unwrap().session_id, "abcd");
    }

    #[test]
    fn test_decode_error_envelope() {
        let result = decode_envelope::<OpenData>(
            401,
            br#"{"status": 401, "message": "Secret Key is Invalid"}"#,
        );
        assert!(matches!(
            result,
            Err(CdmError::Remote { status: 401, message }) if message == "Secret Key is Invalid"
        ));

        let result = decode_envelope::<OpenData>(502, b"Bad Gateway");
        assert!(matches!(result, Err(CdmError::Remote { status: 502, .. })));
    }

    #[test]
    fn test_decode_keys() {
        let data: Option<KeysData> = decode_envelope(
            200,
            br#"{"status": 200, "message": "Success", "data": {"keys": [
                {"key_id": "00000000-0000-0000-0000-000000000000", "key": "aabb", "type": "SIGNING", "permissions": []},
                {"key_id": "eb676abbcb345e96bbcf616630f1a3da", "key": "100b6c20940f779a4589152b57d2dacb", "type": "CONTENT", "permissions": []}
            ]}}"#,
        )
        .unwrap();

        let keys = decode_keys(data.unwrap()).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].typ, KeyType::Signing);
        assert_eq!(keys[0].kid, vec![0; 16]);
        assert_eq!(keys[1].typ, KeyType::Content);
        assert_eq!(hex::encode(&keys[1].key), "100b6c20940f779a4589152b57d2dacb");
    }
}
