use std::fmt;

/// Width of a reader inventory UID, in bytes.
pub const UID_LEN: usize = 12;

/// Tag identifier as reported by the reader. The all-zero value is the
/// reader's "no tag in field" sentinel and never names a real tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TagUid([u8; UID_LEN]);

impl TagUid {
    pub const ZERO: TagUid = TagUid([0; UID_LEN]);

    pub fn new(bytes: [u8; UID_LEN]) -> Self {
        TagUid(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; UID_LEN]
    }

    /// Uppercase hex, two characters per byte, no separators.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Parses the 24-character hex form produced by `to_hex`.
    pub fn from_hex(s: &str) -> Option<TagUid> {
        if s.len() != UID_LEN * 2 {
            return None;
        }
        let mut bytes = [0u8; UID_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char).to_digit(16)?;
            let lo = (chunk[1] as char).to_digit(16)?;
            bytes[i] = ((hi << 4) | lo) as u8;
        }
        Some(TagUid::new(bytes))
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}
