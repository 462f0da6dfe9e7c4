//! ホストランタイムのエラー

use crate::Encoding;
use thiserror::Error;

/// ホストランタイムおよびフレームキャプチャのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// 有効な実行コンテキストの外でスタック検査が要求された
    #[error("invalid execution context: no active call stack")]
    InvalidExecutionContext,

    /// 互換性のないエンコーディング同士を比較しようとした
    #[error("incompatible character encodings: {left} and {right}")]
    EncodingMismatch { left: Encoding, right: Encoding },

    /// 検査スコープ内で範囲外のフレームを参照した
    #[error("frame index {index} out of range (backtrace has {len} frames)")]
    FrameOutOfRange { index: usize, len: usize },

    /// バインディングに存在しないローカル変数を参照した
    #[error("local variable '{0}' is not defined")]
    UnknownVariable(String),
}
