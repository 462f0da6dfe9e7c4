//! 呼び出しイベントと購読

use crate::{ClassRef, LocationRef, Symbol, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::trace;

/// イベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// メソッド呼び出しへの進入
    Call,
    /// メソッドからの復帰
    Return,
    /// 新しい行の実行
    Line,
}

/// 呼び出しイベントの内容
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// 呼び出されたメソッド名
    pub callee_id: Symbol,
    pub receiver: Value,
    pub defined_class: Option<ClassRef>,
    pub location: LocationRef,
    pub args: Vec<Value>,
}

/// 復帰イベントの内容
#[derive(Debug, Clone)]
pub struct ReturnInfo {
    pub callee_id: Symbol,
    pub return_value: Value,
    pub location: LocationRef,
}

/// 行イベントの内容
#[derive(Debug, Clone)]
pub struct LineInfo {
    pub location: LocationRef,
}

/// ホストランタイムが発行するイベント
#[derive(Debug, Clone)]
pub enum Event {
    Call(CallInfo),
    Return(ReturnInfo),
    Line(LineInfo),
}

impl Event {
    /// イベントの種類を取得する
    pub fn class(&self) -> EventClass {
        match self {
            Event::Call(_) => EventClass::Call,
            Event::Return(_) => EventClass::Return,
            Event::Line(_) => EventClass::Line,
        }
    }

    /// 呼び出し・復帰対象のメソッド名
    pub fn invoked_symbol_name(&self) -> Option<Symbol> {
        match self {
            Event::Call(info) => Some(info.callee_id),
            Event::Return(info) => Some(info.callee_id),
            Event::Line(_) => None,
        }
    }

    pub fn location(&self) -> &LocationRef {
        match self {
            Event::Call(info) => &info.location,
            Event::Return(info) => &info.location,
            Event::Line(info) => &info.location,
        }
    }
}

/// イベントハンドラ
pub type EventHandler = Box<dyn Fn(&Event)>;

struct Subscription {
    class: EventClass,
    enabled: Cell<bool>,
    handler: EventHandler,
}

/// 購読ハンドル
///
/// 作成直後は無効です。ハンドルを破棄すると購読も解除されます。
pub struct SubscriptionHandle {
    inner: Rc<Subscription>,
}

impl SubscriptionHandle {
    pub fn enable(&self) {
        self.inner.enabled.set(true);
    }

    pub fn disable(&self) {
        self.inner.enabled.set(false);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    pub fn event_class(&self) -> EventClass {
        self.inner.class
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("class", &self.inner.class)
            .field("enabled", &self.inner.enabled.get())
            .finish()
    }
}

/// ハンドラ実行中フラグを戻すガード
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// イベントの配送
///
/// ハンドラ実行中に発生したイベントは配送しません。
#[derive(Default)]
pub struct EventHub {
    subscriptions: RefCell<Vec<Weak<Subscription>>>,
    dispatching: Cell<bool>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した種類のイベントを購読する（無効状態で開始）
    pub fn subscribe(&self, class: EventClass, handler: EventHandler) -> SubscriptionHandle {
        let inner = Rc::new(Subscription {
            class,
            enabled: Cell::new(false),
            handler,
        });
        let mut subs = self.subscriptions.borrow_mut();
        subs.retain(|w| w.strong_count() > 0);
        subs.push(Rc::downgrade(&inner));
        SubscriptionHandle { inner }
    }

    /// 指定した種類の有効な購読があるかどうか
    pub fn has_active(&self, class: EventClass) -> bool {
        !self.dispatching.get()
            && self
                .subscriptions
                .borrow()
                .iter()
                .filter_map(Weak::upgrade)
                .any(|s| s.class == class && s.enabled.get())
    }

    /// 有効な購読数（解除済みのものは含まない）
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// イベントを配送する
    pub fn emit(&self, event: &Event) {
        if self.dispatching.get() {
            trace!("suppressing {:?} event raised inside a hook", event.class());
            return;
        }

        let targets: Vec<Rc<Subscription>> = {
            let mut subs = self.subscriptions.borrow_mut();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter()
                .filter_map(Weak::upgrade)
                .filter(|s| s.class == event.class() && s.enabled.get())
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        self.dispatching.set(true);
        let _guard = DispatchGuard(&self.dispatching);
        for sub in targets {
            (sub.handler)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;

    fn line_event() -> Event {
        Event::Line(LineInfo {
            location: Location::new("/app/main.rb", 3, "<main>"),
        })
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned_on_subscribe() {
        let hub = EventHub::new();
        for _ in 0..1000 {
            drop(hub.subscribe(EventClass::Call, Box::new(|_: &Event| {})));
        }
        let handle = hub.subscribe(EventClass::Line, Box::new(|_: &Event| {}));
        assert_eq!(hub.subscriptions.borrow().len(), 1);
        assert_eq!(hub.subscriber_count(), 1);
        drop(handle);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_starts_disabled() {
        let hub = EventHub::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = hub.subscribe(EventClass::Line, Box::new(move |_: &Event| h.set(h.get() + 1)));

        hub.emit(&line_event());
        assert_eq!(hits.get(), 0);

        handle.enable();
        hub.emit(&line_event());
        assert_eq!(hits.get(), 1);

        handle.disable();
        hub.emit(&line_event());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = EventHub::new();
        let handle = hub.subscribe(EventClass::Line, Box::new(|_: &Event| {}));
        assert_eq!(hub.subscriber_count(), 1);
        drop(handle);
        assert_eq!(hub.subscriber_count(), 0);
        hub.emit(&line_event());
    }

    #[test]
    fn test_class_filtering() {
        let hub = EventHub::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = hub.subscribe(EventClass::Call, Box::new(move |_: &Event| h.set(h.get() + 1)));
        handle.enable();
        hub.emit(&line_event());
        assert_eq!(hits.get(), 0);
        assert!(hub.has_active(EventClass::Call));
        assert!(!hub.has_active(EventClass::Line));
    }
}
