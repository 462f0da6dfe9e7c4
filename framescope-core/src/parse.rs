//! パース関連のユーティリティ関数

use anyhow::Result;

/// フレーム番号をパース
///
/// `3` のような10進数と、バックトレース表示と同じ `#3` 形式をサポート
///
/// # Examples
/// ```
/// use framescope_core::parse::parse_frame_index;
///
/// assert_eq!(parse_frame_index("3").unwrap(), 3);
/// assert_eq!(parse_frame_index("#3").unwrap(), 3);
/// ```
pub fn parse_frame_index(s: &str) -> Result<usize> {
    let s = s.trim();
    let digits = s.strip_prefix('#').unwrap_or(s);

    digits
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("Invalid frame index '{}': {}", s, e))
}
