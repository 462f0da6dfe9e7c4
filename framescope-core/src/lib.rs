//! framescope のコア機能
//!
//! このクレートは、実行中プログラムのコールスタックをキャプチャする中核ロジックを提供します。
//! フレームの走査とパス接頭辞による除外、スタックの深さの取得、
//! メソッド定義イベントのトラッキングを行います。

pub mod code_unit;
pub mod command;
pub mod debugger;
pub mod depth;
pub mod errors;
pub mod frame;
pub mod parse;
pub mod path_filter;
pub mod tracker;
pub mod walker;

pub use code_unit::CodeUnitExt;
pub use command::{BacktraceFilter, Command, TrackAction};
pub use debugger::{CaptureConfig, Debugger, MethodDefinition};
pub use depth::DepthProbe;
pub use frame::{FrameAnnotations, FrameKind, FrameRecord};
pub use path_filter::{starts_with, PathFilter};
pub use tracker::{create_tracker, MethodDefinitionTracker, TrackerHandle};
pub use walker::StackWalker;

// 他のクレートから使用するために再エクスポート
pub use framescope_host::{ByteString, HostError, HostRuntime, Value};

/// デバッガの結果型
pub type Result<T> = anyhow::Result<T>;
