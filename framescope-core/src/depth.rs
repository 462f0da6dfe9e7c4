//! コールスタックの深さ

use framescope_host::{HostRuntime, Result};

/// スタックの深さを調べる
pub struct DepthProbe<'h, H: HostRuntime> {
    host: &'h H,
}

impl<'h, H: HostRuntime> DepthProbe<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// 現在の完全なバックトレースのフレーム数（取得の入口フレームを含む）
    pub fn current_depth(&self) -> Result<usize> {
        // TODO: バックトレースを作らずにフレーム数だけ数えるAPIをHostRuntimeに追加する
        Ok(self.host.current_full_backtrace()?.len())
    }
}
