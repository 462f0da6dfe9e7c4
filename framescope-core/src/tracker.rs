//! メソッド定義イベントのトラッカー
//!
//! すべての `Call` イベントを受け取り、呼び出し先が `method_added` または
//! `singleton_method_added` のときだけ登録されたコールバックを呼びます。

use framescope_host::{Event, EventClass, HostRuntime, Symbol, SubscriptionHandle};
use tracing::debug;

/// メソッド定義フックの名前
pub const METHOD_ADDED: &str = "method_added";

/// 特異メソッド定義フックの名前
pub const SINGLETON_METHOD_ADDED: &str = "singleton_method_added";

/// メソッド定義イベントの判定とコールバック呼び出し
pub struct MethodDefinitionTracker<F> {
    method_added: Symbol,
    singleton_method_added: Symbol,
    callback: F,
}

impl<F: Fn(&Event)> MethodDefinitionTracker<F> {
    /// フック名をインターンしてトラッカーを作成する
    pub fn new<H: HostRuntime>(host: &H, callback: F) -> Self {
        Self {
            method_added: host.intern(METHOD_ADDED),
            singleton_method_added: host.intern(SINGLETON_METHOD_ADDED),
            callback,
        }
    }

    /// メソッド定義フックの呼び出しイベントかどうか
    #[inline]
    pub fn is_definition_event(&self, event: &Event) -> bool {
        match event {
            Event::Call(info) => {
                info.callee_id == self.method_added || info.callee_id == self.singleton_method_added
            }
            _ => false,
        }
    }

    /// 特異メソッドの定義イベントかどうか
    pub fn is_singleton_definition(&self, event: &Event) -> bool {
        event.invoked_symbol_name() == Some(self.singleton_method_added)
    }

    /// イベントを1件処理する
    pub fn on_event(&self, event: &Event) {
        if self.is_definition_event(event) {
            (self.callback)(event);
        }
    }
}

/// トラッカーの購読ハンドル
///
/// 作成直後は無効です。ハンドルを破棄すると購読も解除されます。
#[derive(Debug)]
pub struct TrackerHandle {
    subscription: SubscriptionHandle,
}

impl TrackerHandle {
    pub fn enable(&self) {
        debug!("method definition tracker enabled");
        self.subscription.enable();
    }

    pub fn disable(&self) {
        debug!("method definition tracker disabled");
        self.subscription.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.subscription.is_enabled()
    }
}

/// メソッド定義トラッカーを作成してホストの `Call` イベントを購読する
pub fn create_tracker<H, F>(host: &H, on_method_defined: F) -> TrackerHandle
where
    H: HostRuntime,
    F: Fn(&Event) + 'static,
{
    let tracker = MethodDefinitionTracker::new(host, on_method_defined);
    let subscription = host.subscribe(EventClass::Call, Box::new(move |event: &Event| tracker.on_event(event)));
    TrackerHandle { subscription }
}
