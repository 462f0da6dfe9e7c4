//! ホストランタイムとのインターフェース

use crate::{
    BindingRef, ByteString, ClassRef, CodeUnitRef, EventClass, EventHandler, LocationRef, Result,
    Symbol, SubscriptionHandle, Value,
};

/// スタック検査ハンドル
///
/// `HostRuntime::open_inspection` のクロージャの中でだけ参照できます。
/// インデックス0は検査の入口自身のフレームで、値が大きいほどプログラムの入口側になります。
pub trait Inspector {
    /// 検査開始時点のバックトレース
    fn backtrace_locations(&self) -> &[LocationRef];

    /// フレームの self
    fn frame_self(&self, index: usize) -> Result<Value>;

    /// フレームのローカル変数環境
    fn frame_binding(&self, index: usize) -> Result<BindingRef>;

    /// フレームの実行単位（ネイティブフレームでは None）
    fn frame_code_unit(&self, index: usize) -> Result<Option<CodeUnitRef>>;

    /// フレームのクラスコンテキスト
    fn frame_enclosing_type(&self, index: usize) -> Result<Option<ClassRef>>;
}

/// フレームキャプチャが必要とするホストランタイムの機能
pub trait HostRuntime {
    /// スタック検査スコープを開いて `body` を実行する
    ///
    /// `body` の実行中はスタックの一貫したビューが保証されます。
    /// 有効な実行コンテキストがない場合は `InvalidExecutionContext` で失敗します。
    fn open_inspection<R>(&self, body: impl FnOnce(&dyn Inspector) -> Result<R>) -> Result<R>;

    /// 現在の完全なバックトレース（フィルタなし）
    fn current_full_backtrace(&self) -> Result<Vec<LocationRef>>;

    /// 実行単位の実パスを解決する
    fn resolve_real_path(&self, unit: &CodeUnitRef) -> Option<ByteString> {
        unit.real_path().cloned()
    }

    /// 名前をシンボルにインターンする
    fn intern(&self, name: &str) -> Symbol;

    /// シンボルの名前を取得する
    fn symbol_name(&self, sym: Symbol) -> Option<String>;

    /// イベントを購読する（ハンドルは無効状態で返る）
    fn subscribe(&self, class: EventClass, handler: EventHandler) -> SubscriptionHandle;
}
