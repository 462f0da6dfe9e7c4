//! パス接頭辞によるフレーム除外

use framescope_host::{ByteString, Result};

/// `candidate` が `prefix` で始まるかどうか
///
/// 比較前にエンコーディングの互換性を確認し、互換でなければ
/// `EncodingMismatch` を返します。空の接頭辞は常に一致します。
pub fn starts_with(candidate: &ByteString, prefix: &ByteString) -> Result<bool> {
    candidate.compatible_encoding(prefix)?;
    Ok(candidate.as_bytes().starts_with(prefix.as_bytes()))
}

/// 除外するパス接頭辞
///
/// 空の接頭辞は「フィルタなし」として扱います。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    prefix: Option<ByteString>,
}

impl PathFilter {
    pub fn new(prefix: Option<ByteString>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
        }
    }

    /// フィルタなし
    pub fn none() -> Self {
        Self::default()
    }

    pub fn prefix(&self) -> Option<&ByteString> {
        self.prefix.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.prefix.is_some()
    }

    /// パスが除外対象かどうか
    pub fn excludes(&self, path: &ByteString) -> Result<bool> {
        match &self.prefix {
            Some(prefix) => starts_with(path, prefix),
            None => Ok(false),
        }
    }
}
