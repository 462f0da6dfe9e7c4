//! デバッガのメインロジック

use crate::errors::{ERR_FRAME_NOT_FOUND, ERR_NO_CAPTURE, ERR_TRACKER_NOT_CREATED};
use crate::tracker::SINGLETON_METHOD_ADDED;
use crate::{create_tracker, DepthProbe, FrameRecord, PathFilter, Result, StackWalker, TrackerHandle};
use framescope_host::{ByteString, Event, HostRuntime, LocationRef, Symbol, Value};
use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// キャプチャ設定
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// バックトレースから除外するパス接頭辞（空ならフィルタなし）
    pub skip_path_prefix: Option<ByteString>,
    /// 作成時にメソッド定義トラッキングを有効にするか
    pub track_method_definitions: bool,
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_path_prefix(mut self, prefix: impl Into<ByteString>) -> Self {
        self.skip_path_prefix = Some(prefix.into());
        self
    }

    pub fn with_method_tracking(mut self, enabled: bool) -> Self {
        self.track_method_definitions = enabled;
        self
    }

    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(self.skip_path_prefix.clone())
    }
}

/// 記録されたメソッド定義
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// 定義されたメソッド名
    pub name: Option<String>,
    pub singleton: bool,
    /// メソッドが定義されたクラスまたはオブジェクト
    pub receiver: Value,
    pub location: LocationRef,
}

struct RecordedDefinition {
    method: Option<Symbol>,
    singleton: bool,
    receiver: Value,
    location: LocationRef,
}

/// デバッガ
///
/// ホストランタイムに対するフレームキャプチャ、深さの取得、
/// メソッド定義トラッキングをまとめて扱います。
pub struct Debugger<'h, H: HostRuntime> {
    /// 検査対象のホストランタイム
    host: &'h H,
    /// キャプチャ設定
    config: CaptureConfig,
    /// 最後にキャプチャしたフレーム
    frames: Option<Vec<FrameRecord>>,
    /// メソッド定義トラッカー
    tracker: Option<TrackerHandle>,
    /// トラッカーが記録したメソッド定義
    definitions: Rc<RefCell<Vec<RecordedDefinition>>>,
}

impl<'h, H: HostRuntime> Debugger<'h, H> {
    /// 新しいデバッガを作成する
    pub fn new(host: &'h H, config: CaptureConfig) -> Self {
        let track = config.track_method_definitions;
        let mut debugger = Self {
            host,
            config,
            frames: None,
            tracker: None,
            definitions: Rc::new(RefCell::new(Vec::new())),
        };
        if track {
            debugger.enable_method_tracking();
        }
        debugger
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// 除外するパス接頭辞を変更する
    pub fn set_skip_path_prefix(&mut self, prefix: Option<ByteString>) {
        self.config.skip_path_prefix = prefix;
    }

    /// 設定に従ってフレームをキャプチャする
    pub fn capture(&mut self) -> Result<&[FrameRecord]> {
        let filter = self.config.path_filter();
        self.capture_with(&filter)
    }

    /// フィルタなしでフレームをキャプチャする
    pub fn capture_all(&mut self) -> Result<&[FrameRecord]> {
        self.capture_with(&PathFilter::none())
    }

    /// 指定したフィルタでフレームをキャプチャする
    pub fn capture_with(&mut self, filter: &PathFilter) -> Result<&[FrameRecord]> {
        let frames = StackWalker::new(self.host).capture_frames(filter.prefix())?;
        debug!("debugger captured {} frames", frames.len());
        Ok(self.frames.insert(frames).as_slice())
    }

    /// 最後にキャプチャしたフレーム
    pub fn frames(&self) -> Result<&[FrameRecord]> {
        self.frames
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!(ERR_NO_CAPTURE))
    }

    /// 最後にキャプチャしたフレームを番号で取得する
    pub fn frame(&self, index: usize) -> Result<&FrameRecord> {
        self.frames()?
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("{}: #{}", ERR_FRAME_NOT_FOUND, index))
    }

    /// 最後にキャプチャしたフレームを可変参照で取得する
    pub fn frame_mut(&mut self, index: usize) -> Result<&mut FrameRecord> {
        self.frames
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!(ERR_NO_CAPTURE))?
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("{}: #{}", ERR_FRAME_NOT_FOUND, index))
    }

    /// フレームのローカル変数を取得する
    pub fn locals(&mut self, index: usize) -> Result<Vec<(String, Value)>> {
        Ok(self.frame_mut(index)?.local_variables().to_vec())
    }

    /// ラベルが正規表現にマッチするフレームを検索する
    pub fn find_frames(&self, pattern: &str) -> Result<Vec<(usize, &FrameRecord)>> {
        let re = Regex::new(pattern)?;
        Ok(self
            .frames()?
            .iter()
            .enumerate()
            .filter(|(_, frame)| re.is_match(frame.label()))
            .collect())
    }

    /// 現在のスタックの深さ
    pub fn depth(&self) -> Result<usize> {
        Ok(DepthProbe::new(self.host).current_depth()?)
    }

    /// メソッド定義トラッキングを有効にする（初回はトラッカーを作成する）
    pub fn enable_method_tracking(&mut self) {
        if self.tracker.is_none() {
            let log = self.definitions.clone();
            let singleton = self.host.intern(SINGLETON_METHOD_ADDED);
            self.tracker = Some(create_tracker(self.host, move |event: &Event| {
                if let Event::Call(info) = event {
                    let method = info.args.iter().find_map(|arg| match arg {
                        Value::Symbol(sym) => Some(*sym),
                        _ => None,
                    });
                    log.borrow_mut().push(RecordedDefinition {
                        method,
                        singleton: info.callee_id == singleton,
                        receiver: info.receiver.clone(),
                        location: info.location.clone(),
                    });
                }
            }));
        }
        if let Some(tracker) = &self.tracker {
            tracker.enable();
        }
    }

    /// メソッド定義トラッキングを無効にする
    pub fn disable_method_tracking(&mut self) -> Result<()> {
        self.tracker
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!(ERR_TRACKER_NOT_CREATED))?
            .disable();
        Ok(())
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.as_ref().is_some_and(TrackerHandle::is_enabled)
    }

    /// 記録したメソッド定義の一覧
    pub fn method_definitions(&self) -> Vec<MethodDefinition> {
        self.definitions
            .borrow()
            .iter()
            .map(|d| MethodDefinition {
                name: d.method.and_then(|sym| self.host.symbol_name(sym)),
                singleton: d.singleton,
                receiver: d.receiver.clone(),
                location: d.location.clone(),
            })
            .collect()
    }

    /// 値を表示用の文字列にする（シンボルは名前で表示する）
    pub fn describe_value(&self, value: &Value) -> String {
        match value {
            Value::Symbol(sym) => match self.host.symbol_name(*sym) {
                Some(name) => format!(":{}", name),
                None => value.to_string(),
            },
            _ => value.to_string(),
        }
    }
}
