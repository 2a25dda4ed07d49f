use serde::{Deserialize, Serialize};

/// Opaque, source-specific marker passed to a source at open time so a new
/// run can continue after the last committed record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken(pub Vec<u8>);

impl ResumeToken {
    /// Token for sources that resume by record offset (8 bytes, big-endian).
    pub fn from_offset(offset: u64) -> Self {
        ResumeToken(offset.to_be_bytes().to_vec())
    }

    /// Decodes an offset token. `None` when the token is not an offset.
    pub fn as_offset(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.0.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_token_decodes() {
        assert_eq!(ResumeToken::from_offset(5000).as_offset(), Some(5000));
        assert_eq!(ResumeToken(vec![1, 2, 3]).as_offset(), None);
    }
}
