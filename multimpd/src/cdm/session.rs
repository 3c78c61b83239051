use super::{Cdm, CdmError, Key};
use crate::protection::ProtectionHeader;
use log::{debug, warn};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Opened,
    Challenged,
    Parsed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SessionState::Opened => "opened",
                SessionState::Challenged => "challenged",
                SessionState::Parsed => "parsed",
                SessionState::Closed => "closed",
            }
        )
    }
}

/// An open CDM session.
///
/// Allows exactly one challenge followed by exactly one license parse. The session is
/// closed by [`Session::close`] or, on any other path, when dropped.
pub struct Session<'a, C: Cdm> {
    cdm: &'a C,
    id: String,
    state: SessionState,
}

impl<'a, C: Cdm> Session<'a, C> {
    pub fn open(cdm: &'a C) -> Result<Self, CdmError> {
        let id = cdm.open()?;
        debug!("opened cdm session {}", id);

        Ok(Self {
            cdm,
            id,
            state: SessionState::Opened,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn require(&self, state: SessionState, operation: &'static str) -> Result<(), CdmError> {
        if self.state == state {
            Ok(())
        } else {
            Err(CdmError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    pub fn challenge(&mut self, pssh: &ProtectionHeader) -> Result<Vec<u8>, CdmError> {
        self.require(SessionState::Opened, "generate a challenge")?;
        let challenge = self.cdm.license_challenge(&self.id, pssh)?;
        self.state = SessionState::Challenged;
        Ok(challenge)
    }

    pub fn parse_license(&mut self, license: &[u8]) -> Result<(), CdmError> {
        self.require(SessionState::Challenged, "parse a license")?;
        self.cdm.parse_license(&self.id, license)?;
        self.state = SessionState::Parsed;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<Key>, CdmError> {
        self.require(SessionState::Parsed, "list keys")?;
        self.cdm.keys(&self.id)
    }

    pub fn close(mut self) -> Result<(), CdmError> {
        self.state = SessionState::Closed;
        debug!("closing cdm session {}", self.id);
        self.cdm.close(&self.id)
    }
}

impl<C: Cdm> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            debug!("closing abandoned cdm session {}", self.id);

            if let Err(e) = self.cdm.close(&self.id) {
                warn!("Unable to close CDM session {}: {}", self.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multimpd_pssh::SystemId;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl Cdm for Recorder {
        fn open(&self) -> Result<String, CdmError> {
            self.calls.borrow_mut().push("open".to_owned());
            Ok("s1".to_owned())
        }

        fn license_challenge(&self, id: &str, _: &ProtectionHeader) -> Result<Vec<u8>, CdmError> {
            self.calls.borrow_mut().push(format!("challenge {}", id));
            Ok(vec![1, 2, 3])
        }

        fn parse_license(&self, id: &str, _: &[u8]) -> Result<(), CdmError> {
            self.calls.borrow_mut().push(format!("parse {}", id));
            Ok(())
        }

        fn keys(&self, _: &str) -> Result<Vec<Key>, CdmError> {
            Ok(vec![])
        }

        fn close(&self, id: &str) -> Result<(), CdmError> {
            self.calls.borrow_mut().push(format!("close {}", id));
            Ok(())
        }
    }

    fn header() -> ProtectionHeader {
        ProtectionHeader::new(SystemId::Widevine, vec![0])
    }

    #[test]
    fn test_full_life_cycle() {
        let cdm = Recorder::default();
        let mut session = Session::open(&cdm).unwrap();
        assert_eq!(session.challenge(&header()).unwrap(), vec![1, 2, 3]);
        session.parse_license(b"license").unwrap();
        assert_eq!(session.state(), SessionState::Parsed);
        assert!(session.keys().unwrap().is_empty());
        session.close().unwrap();

        assert_eq!(
            *cdm.calls.borrow(),
            vec!["open", "challenge s1", "parse s1", "close s1"]
        );
    }

    #[test]
    fn test_single_challenge() {
        let cdm = Recorder::default();
        let mut session = Session::open(&cdm).unwrap();
        session.challenge(&header()).unwrap();

        assert!(matches!(
            session.challenge(&header()),
            Err(CdmError::InvalidState {
                state: SessionState::Challenged,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_requires_challenge() {
        let cdm = Recorder::default();
        let mut session = Session::open(&cdm).unwrap();
        assert!(session.parse_license(b"license").is_err());
        assert!(session.keys().is_err());
    }

    #[test]
    fn test_drop_closes_once() {
        let cdm = Recorder::default();
        {
            let mut session = Session::open(&cdm).unwrap();
            session.challenge(&header()).unwrap();
        }

        let calls = cdm.calls.borrow();
        assert_eq!(calls.iter().filter(|x| x.starts_with("close")).count(), 1);
        assert_eq!(calls.last().unwrap(), "close s1");
    }
}
