#![allow(dead_code)]

use multimpd::{
    LicenseError,
    cdm::{Cdm, CdmBackend, CdmError, Key, KeyType, Profile},
    decrypt::Decryptor,
    error::ManifestError,
    fetch::{FetchError, FetchProgress, FetchedMedia, Fetcher},
    key::ContentKey,
    license::{HttpResponse, KeySource, Transport},
    media::{PipelineRun, TrackKind},
    mux::Muxer,
    process::ToolOutput,
    protection::ProtectionHeader,
    reqwest::{Url, header::HeaderMap},
};
use std::{
    cell::{Cell, RefCell},
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

pub const WIDEVINE: &str = "urn:uuid:EDEF8BA9-79D6-4ACE-A3C8-27DCD51D21ED";

pub fn manifest(pssh: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:cenc="urn:mpeg:cenc:2013">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc"/>
      <ContentProtection schemeIdUri="{}">
        <cenc:pssh>{}</cenc:pssh>
      </ContentProtection>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4"/>
  </Period>
</MPD>"#,
        WIDEVINE, pssh
    )
}

pub fn key(s: &str) -> ContentKey {
    s.parse().unwrap()
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Names of the files left in `directory`, sorted.
pub fn listing(directory: &Path) -> Vec<String> {
    let mut names = fs::read_dir(directory)
        .unwrap()
        .map(|x| x.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

/// Writes one encrypted file per requested track into the run directory.
/// With `fail` set the download ends like a yt-dlp run with a non zero exit code.
pub struct FakeFetcher {
    pub manifest: String,
    pub tracks: Vec<TrackKind>,
    pub fail: bool,
    pub manifest_calls: Cell<usize>,
    pub media_calls: Cell<usize>,
}

impl FakeFetcher {
    pub fn new(manifest: String) -> Self {
        Self {
            manifest,
            tracks: vec![TrackKind::Video, TrackKind::Audio],
            fail: false,
            manifest_calls: Cell::new(0),
            media_calls: Cell::new(0),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn manifest(&self, _: &Url) -> Result<String, ManifestError> {
        self.manifest_calls.set(self.manifest_calls.get() + 1);
        Ok(self.manifest.clone())
    }

    fn media(
        &self,
        _: &Url,
        run: &PipelineRun,
        progress: &mut dyn FnMut(FetchProgress),
    ) -> Result<FetchedMedia, FetchError> {
        self.media_calls.set(self.media_calls.get() + 1);

        if self.fail {
            return Err(FetchError::Failed {
                code: Some(1),
                message: "ERROR: Unable to download webpage: HTTP Error 403: Forbidden".to_owned(),
            });
        }

        let mut media = FetchedMedia::default();

        for (i, kind) in self.tracks.iter().enumerate() {
            let path = run.directory.join(format!(
                "{}.f{}.{}",
                run.id,
                i + 1,
                match kind {
                    TrackKind::Video => "mp4",
                    TrackKind::Audio => "m4a",
                }
            ));
            fs::write(&path, format!("encrypted {}", kind))?;

            progress(FetchProgress {
                kind: *kind,
                finished: true,
                downloaded_bytes: Some(16),
                total_bytes: Some(16),
                eta: None,
                speed: None,
                fragment_index: None,
                fragment_count: None,
            });
            media.assign(Some(*kind), path);
        }

        Ok(media)
    }
}

pub struct FakeKeySource {
    pub keys: Vec<ContentKey>,
    pub headers: RefCell<Vec<ProtectionHeader>>,
}

impl FakeKeySource {
    pub fn new(keys: Vec<ContentKey>) -> Self {
        Self {
            keys,
            headers: RefCell::new(Vec::new()),
        }
    }
}

impl KeySource for FakeKeySource {
    fn acquire_keys(
        &self,
        header: &ProtectionHeader,
        _: &Url,
        _: &HeaderMap,
    ) -> Result<Vec<ContentKey>, LicenseError> {
        self.headers.borrow_mut().push(header.clone());
        Ok(self.keys.clone())
    }
}

/// Copies the input to the output, or fails through stderr for `fail`.
#[derive(Default)]
pub struct FakeDecryptor {
    pub fail: Option<TrackKind>,
    pub calls: RefCell<Vec<(Vec<ContentKey>, PathBuf, PathBuf)>>,
}

impl Decryptor for FakeDecryptor {
    fn decrypt(
        &self,
        keys: &[ContentKey],
        input: &Path,
        output: &Path,
    ) -> io::Result<ToolOutput> {
        self.calls
            .borrow_mut()
            .push((keys.to_vec(), input.to_owned(), output.to_owned()));

        let name = output.to_string_lossy();
        if let Some(kind) = self.fail {
            if name.contains(&format!(".{}.", kind)) {
                return Ok(ToolOutput {
                    code: Some(0),
                    stdout: Vec::new(),
                    stderr: b"ERROR: invalid key".to_vec(),
                });
            }
        }

        let data = fs::read_to_string(input)?;
        fs::write(output, data.replace("encrypted", "decrypted"))?;
        Ok(ToolOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct FakeMuxer {
    pub fail: bool,
    pub calls: Cell<usize>,
}

impl Muxer for FakeMuxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> io::Result<ToolOutput> {
        self.calls.set(self.calls.get() + 1);

        if self.fail {
            return Ok(ToolOutput {
                code: Some(1),
                stdout: Vec::new(),
                stderr: b"Invalid data found when processing input".to_vec(),
            });
        }

        let data = fs::read_to_string(video)? + &fs::read_to_string(audio)?;
        fs::write(output, data)?;
        Ok(ToolOutput {
            code: Some(0),
            ..Default::default()
        })
    }
}

/// Cdm whose calls are recorded in a shared log.
#[derive(Clone, Default)]
pub struct FakeCdm {
    pub log: Rc<RefCell<Vec<String>>>,
    pub keys: Vec<Key>,
    pub reject_license: bool,
}

impl FakeCdm {
    pub fn with_keys(keys: Vec<Key>) -> Self {
        Self {
            keys,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.log.borrow().iter().filter(|x| *x == call).count()
    }
}

impl Cdm for FakeCdm {
    fn open(&self) -> Result<String, CdmError> {
        self.log.borrow_mut().push("open".to_owned());
        Ok("session".to_owned())
    }

    fn license_challenge(&self, _: &str, _: &ProtectionHeader) -> Result<Vec<u8>, CdmError> {
        self.log.borrow_mut().push("challenge".to_owned());
        Ok(b"challenge".to_vec())
    }

    fn parse_license(&self, _: &str, _: &[u8]) -> Result<(), CdmError> {
        self.log.borrow_mut().push("parse".to_owned());

        if self.reject_license {
            return Err(CdmError::Remote {
                status: 400,
                message: "invalid license message".to_owned(),
            });
        }

        Ok(())
    }

    fn keys(&self, _: &str) -> Result<Vec<Key>, CdmError> {
        self.log.borrow_mut().push("keys".to_owned());
        Ok(self.keys.clone())
    }

    fn close(&self, _: &str) -> Result<(), CdmError> {
        self.log.borrow_mut().push("close".to_owned());
        Ok(())
    }
}

pub struct FakeBackend(pub FakeCdm);

impl CdmBackend for FakeBackend {
    type Cdm = FakeCdm;

    fn load(&self, _: &Profile) -> Result<Self::Cdm, CdmError> {
        Ok(self.0.clone())
    }
}

/// Backend whose device cannot be loaded.
pub struct BrokenBackend(pub FakeCdm);

impl CdmBackend for BrokenBackend {
    type Cdm = FakeCdm;

    fn load(&self, profile: &Profile) -> Result<Self::Cdm, CdmError> {
        self.0.log.borrow_mut().push("load".to_owned());
        Err(CdmError::Decode(format!("{} is not a device file", profile.name)))
    }
}

/// Backend whose sessions cannot be opened.
pub struct ClosedBackend(pub FakeCdm);

impl CdmBackend for ClosedBackend {
    type Cdm = UnopenableCdm;

    fn load(&self, _: &Profile) -> Result<Self::Cdm, CdmError> {
        Ok(UnopenableCdm(self.0.clone()))
    }
}

pub struct UnopenableCdm(pub FakeCdm);

impl Cdm for UnopenableCdm {
    fn open(&self) -> Result<String, CdmError> {
        self.0.log.borrow_mut().push("open".to_owned());
        Err(CdmError::Remote {
            status: 401,
            message: "Secret Key is Invalid".to_owned(),
        })
    }

    fn license_challenge(&self, id: &str, header: &ProtectionHeader) -> Result<Vec<u8>, CdmError> {
        self.0.license_challenge(id, header)
    }

    fn parse_license(&self, id: &str, license: &[u8]) -> Result<(), CdmError> {
        self.0.parse_license(id, license)
    }

    fn keys(&self, id: &str) -> Result<Vec<Key>, CdmError> {
        self.0.keys(id)
    }

    fn close(&self, id: &str) -> Result<(), CdmError> {
        self.0.close(id)
    }
}

/// License server reply, the headers of every post are kept.
#[derive(Clone)]
pub struct FakeTransport {
    pub status: u16,
    pub body: Vec<u8>,
    pub posts: Rc<Cell<usize>>,
    pub headers: Rc<RefCell<Vec<HeaderMap>>>,
}

impl FakeTransport {
    pub fn new(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            posts: Rc::new(Cell::new(0)),
            headers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Transport for FakeTransport {
    fn post(
        &self,
        _: &Url,
        headers: &HeaderMap,
        _: Vec<u8>,
    ) -> Result<HttpResponse, multimpd::reqwest::Error> {
        self.posts.set(self.posts.get() + 1);
        self.headers.borrow_mut().push(headers.clone());
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

pub fn content_key(kid: u8, key: u8) -> Key {
    Key {
        kid: vec![kid; 16],
        key: vec![key; 16],
        typ: KeyType::Content,
    }
}

pub fn signing_key() -> Key {
    Key {
        kid: vec![0; 16],
        key: vec![0xff; 32],
        typ: KeyType::Signing,
    }
}

/// Directory holding one empty device file.
pub fn profile_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("device.wvd"), b"").unwrap();
    dir
}
