use std::{fmt, str::FromStr};

/// Content decryption key in hex, rendered as `kid:key`.
///
/// The kid may also be a decimal track id, which `mp4decrypt` accepts in place of a
/// 128-bit key id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub kid: String,
    pub key: String,
}

impl ContentKey {
    pub fn new(kid: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> Self {
        Self {
            kid: hex::encode(kid),
            key: hex::encode(key),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kid, self.key)
    }
}

impl FromStr for ContentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kid, key)) = s.trim().split_once(':') else {
            return Err(format!("expected 'KID:KEY' but found '{}'.", s));
        };

        let kid = kid.replace('-', "").to_ascii_lowercase();
        let key = key.replace('-', "").to_ascii_lowercase();

        let kid_is_hex = kid.len() == 32 && kid.chars().all(|c| c.is_ascii_hexdigit());
        let kid_is_track = !kid.is_empty() && kid.chars().all(|c| c.is_ascii_digit());

        if !(kid_is_hex || kid_is_track) {
            return Err(format!("invalid kid '{}' in key pair.", kid));
        }

        if key.len() != 32 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid key '{}' in key pair.", key));
        }

        Ok(Self { kid, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_pair() {
        let key = "EB676ABB-CB34-5E96-BBCF-616630F1A3DA:100b6c20940f779a4589152b57d2dacb"
            .parse::<ContentKey>()
            .unwrap();
        assert_eq!(key.kid, "eb676abbcb345e96bbcf616630f1a3da");
        assert_eq!(
            key.to_string(),
            "eb676abbcb345e96bbcf616630f1a3da:100b6c20940f779a4589152b57d2dacb"
        );
    }

    #[test]
    fn test_parse_track_id() {
        let key = "1:100b6c20940f779a4589152b57d2dacb"
            .parse::<ContentKey>()
            .unwrap();
        assert_eq!(key.kid, "1");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("eb676abbcb345e96bbcf616630f1a3da".parse::<ContentKey>().is_err());
        assert!("eb676abb:100b6c20940f779a4589152b57d2dacb".parse::<ContentKey>().is_err());
        assert!("eb676abbcb345e96bbcf616630f1a3da:100b".parse::<ContentKey>().is_err());
        assert!("zz676abbcb345e96bbcf616630f1a3da:100b6c20940f779a4589152b57d2dacb"
            .parse::<ContentKey>()
            .is_err());
    }

    #[test]
    fn test_from_bytes() {
        let key = ContentKey::new([0xab, 0x01], [0xff]);
        assert_eq!(key.to_string(), "ab01:ff");
    }
}
