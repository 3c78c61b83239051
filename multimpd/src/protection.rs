use base64::Engine;
use log::debug;
use multimpd_pssh::{KeyId, PsshBox, SystemId};

/// Protection system specific header handed to the CDM as init data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectionHeader {
    system: SystemId,
    data: Vec<u8>,
}

impl ProtectionHeader {
    pub fn new(system: SystemId, data: Vec<u8>) -> Self {
        Self { system, data }
    }

    /// Decode a base64 header. A complete `pssh` box is tagged with its own system id,
    /// anything else is kept as raw Widevine init data.
    pub fn from_base64(input: &str) -> Result<Self, multimpd_pssh::Error> {
        let data = base64::engine::general_purpose::STANDARD.decode(input.trim())?;

        match PsshBox::from_bytes(&data) {
            Ok(pssh) => Ok(Self::new(pssh.system_id, data)),
            Err(e) => {
                debug!("PSSH is not a complete box ({}), treating it as widevine init data", e);
                Ok(Self::new(SystemId::Widevine, data))
            }
        }
    }

    pub fn system(&self) -> &SystemId {
        &self.system
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Key ids listed in a version 1 box, none for raw init data.
    pub fn key_ids(&self) -> Vec<KeyId> {
        PsshBox::from_bytes(&self.data)
            .map(|x| x.key_ids)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_from_box() {
        let header = ProtectionHeader::from_base64(
            "AAAAInBzc2gAAAAAmgTweZhAQoarkuZb4IhflQAAAAISNA==",
        )
        .unwrap();
        assert_eq!(header.system(), &SystemId::PlayReady);
        assert_eq!(header.data().len(), 34);
    }

    #[test]
    fn test_raw_init_data() {
        let header = ProtectionHeader::from_base64("AAAA").unwrap();
        assert_eq!(header.system(), &SystemId::Widevine);
        assert_eq!(header.to_base64(), "AAAA");
        assert!(header.key_ids().is_empty());
    }

    #[test]
    fn test_key_ids_of_v1_box() {
        let header = ProtectionHeader::from_base64(
            "AAAANnBzc2gBAAAA7e+LqXnWSs6jyCfc1R0h7QAAAAHrZ2q7yzRelrvPYWYw8aPaAAAAAhI0",
        )
        .unwrap();
        assert_eq!(header.system(), &SystemId::Widevine);

        let kids = header.key_ids();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].uuid(), "eb676abb-cb34-5e96-bbcf-616630f1a3da");
    }

    #[test]
    fn test_invalid_base64() {
        assert!(ProtectionHeader::from_base64("not base64!").is_err());
    }
}
