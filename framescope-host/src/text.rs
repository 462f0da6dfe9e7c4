//! エンコーディング付きバイト列

use crate::{HostError, Result};
use std::fmt;

/// 文字エンコーディング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    UsAscii,
    /// ASCII-8BIT（バイナリ）
    Binary,
    EucJp,
    ShiftJis,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// エンコーディング名
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Binary => "ASCII-8BIT",
            Encoding::EucJp => "EUC-JP",
            Encoding::ShiftJis => "Shift_JIS",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
        }
    }

    /// ASCII互換（0x00-0x7F がASCIIと同じ意味を持つ）かどうか
    pub fn is_ascii_compatible(self) -> bool {
        !matches!(self, Encoding::Utf16Le | Encoding::Utf16Be)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// エンコーディング情報を持つバイト列
///
/// ソースファイルのパスなど、ホストから受け取る文字列を表します。
/// 比較はバイト単位で行い、事前にエンコーディングの互換性を確認します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteString {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl ByteString {
    /// バイト列とエンコーディングから作成する
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// UTF-8文字列から作成する
    pub fn utf8(s: &str) -> Self {
        Self::new(s.as_bytes(), Encoding::Utf8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 7bit ASCIIのみで構成されているかどうか
    pub fn is_ascii_only(&self) -> bool {
        self.encoding.is_ascii_compatible() && self.bytes.is_ascii()
    }

    /// 表示用の文字列（不正なバイトは置換文字になる）
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// 2つのバイト列を比較できる共通のエンコーディングを求める
    ///
    /// 同一エンコーディング、片方が空、または両方ASCII互換で片方がASCIIのみ
    /// の場合に互換とみなします。それ以外は `EncodingMismatch` になります。
    pub fn compatible_encoding(&self, other: &ByteString) -> Result<Encoding> {
        if self.encoding == other.encoding {
            return Ok(self.encoding);
        }
        if other.is_empty() {
            return Ok(self.encoding);
        }
        if self.is_empty() {
            return Ok(other.encoding);
        }
        if self.encoding.is_ascii_compatible() && other.encoding.is_ascii_compatible() {
            if other.is_ascii_only() {
                return Ok(self.encoding);
            }
            if self.is_ascii_only() {
                return Ok(other.encoding);
            }
        }
        Err(HostError::EncodingMismatch {
            left: self.encoding,
            right: other.encoding,
        })
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        Self::utf8(s)
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
