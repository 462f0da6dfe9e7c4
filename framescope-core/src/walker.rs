//! コールスタックの走査とフレームキャプチャ

use crate::path_filter::starts_with;
use crate::FrameRecord;
use framescope_host::{ByteString, HostRuntime, Inspector, Result};
use tracing::{debug, trace};

/// スタック走査器
///
/// 呼び出し元から見たコールスタックを、呼び出し元に近い順に `FrameRecord` の列にします。
pub struct StackWalker<'h, H: HostRuntime> {
    host: &'h H,
}

impl<'h, H: HostRuntime> StackWalker<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// 現在のコールスタックをキャプチャする
    ///
    /// インデックス0（検査の入口自身）は常に除外します。
    /// `skip_path_prefix` があれば、実行単位の実パスがその接頭辞で始まるフレームを除外します。
    /// 実行単位を持たないフレームは除外されません。
    ///
    /// 深さはフィルタ前の位置（`全フレーム数 - インデックス`）で決まるため、
    /// 除外されたフレームの分だけ値が飛ぶことがあります。
    pub fn capture_frames(&self, skip_path_prefix: Option<&ByteString>) -> Result<Vec<FrameRecord>> {
        self.host
            .open_inspection(|inspector| self.collect(inspector, skip_path_prefix))
    }

    fn collect(&self, inspector: &dyn Inspector, skip_path_prefix: Option<&ByteString>) -> Result<Vec<FrameRecord>> {
        let locations = inspector.backtrace_locations();
        let len = locations.len();
        let mut frames = Vec::with_capacity(len.saturating_sub(1));

        for (index, location) in locations.iter().enumerate().skip(1) {
            let code_unit = inspector.frame_code_unit(index)?;

            if let (Some(unit), Some(prefix)) = (&code_unit, skip_path_prefix) {
                if let Some(path) = self.host.resolve_real_path(unit) {
                    if starts_with(&path, prefix)? {
                        trace!("skip frame {} ({})", index, path);
                        continue;
                    }
                }
            }

            frames.push(FrameRecord::new(
                location.clone(),
                inspector.frame_self(index)?,
                inspector.frame_binding(index)?,
                code_unit,
                inspector.frame_enclosing_type(index)?,
                len - index,
            ));
        }

        debug!("captured {} of {} frames", frames.len(), len.saturating_sub(1));
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framescope_host::{CodeUnit, CodeUnitKind, FrameSpec, HostError, Vm};

    fn method(label: &str, path: &str) -> FrameSpec {
        FrameSpec::method(
            CodeUnit::builder(label, CodeUnitKind::Method)
                .path(path)
                .lines(1, 10)
                .build(),
        )
    }

    #[test]
    fn test_capture_outside_context() {
        let vm = Vm::new();
        let walker = StackWalker::new(&vm);
        assert_eq!(walker.capture_frames(None).unwrap_err(), HostError::InvalidExecutionContext);
    }

    #[test]
    fn test_capture_single_frame() {
        let vm = Vm::new();
        let frames = vm
            .call(method("<main>", "/app/main.rb"), |vm| StackWalker::new(vm).capture_frames(None))
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].label(), "<main>");
        assert_eq!(frames[0].depth(), 1);
    }

    #[test]
    fn test_prefix_skips_internal_frames() {
        let vm = Vm::new();
        let prefix = ByteString::utf8("internal/");
        let frames = vm
            .call(method("<main>", "/app/main.rb"), |vm| {
                vm.call(method("enter", "internal/debugger.rb"), |vm| {
                    StackWalker::new(vm).capture_frames(Some(&prefix))
                })
            })
            .unwrap();
        let labels: Vec<_> = frames.iter().map(|f| f.label()).collect();
        assert_eq!(labels, vec!["<main>"]);
        assert_eq!(frames[0].depth(), 1);
    }

    #[test]
    fn test_encoding_mismatch_propagates() {
        let vm = Vm::new();
        let prefix = ByteString::new(vec![0xff, 0xfe], framescope_host::Encoding::Utf16Le);
        let err = vm
            .call(method("<main>", "/app/main.rb"), |vm| {
                StackWalker::new(vm).capture_frames(Some(&prefix))
            })
            .unwrap_err();
        assert!(matches!(err, HostError::EncodingMismatch { .. }));
    }
}
