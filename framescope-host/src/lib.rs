//! framescope ホストランタイムインターフェース
//!
//! このクレートは、フレームキャプチャのコアが必要とするホストランタイム側の機能を定義します。
//! スタック検査スコープ、バックトレース、ローカル変数環境（バインディング）、
//! 呼び出しイベントの購読などを提供し、テストとCLIのための参照実装 `Vm` も含みます。

pub mod error;
pub mod text;
pub mod value;
pub mod code_unit;
pub mod location;
pub mod binding;
pub mod event;
pub mod host;
pub mod thread;
pub mod vm;

pub use error::HostError;
pub use text::{ByteString, Encoding};
pub use value::{Class, ClassRef, Object, Symbol, SymbolTable, Value};
pub use code_unit::{CodeUnit, CodeUnitBuilder, CodeUnitKind, CodeUnitRef, ParamKind, Parameter};
pub use location::{Location, LocationRef};
pub use binding::BindingRef;
pub use event::{CallInfo, Event, EventClass, EventHandler, EventHub, LineInfo, ReturnInfo, SubscriptionHandle};
pub use host::{HostRuntime, Inspector};
pub use thread::ThreadId;
pub use vm::{FrameSpec, Vm};

/// ホスト操作の結果型
pub type Result<T> = std::result::Result<T, HostError>;
