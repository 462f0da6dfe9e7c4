//! 参照用ホストランタイム
//!
//! テストとCLIのための、シングルスレッドで動く簡易インタプリタです。
//! 命令の解釈は行わず、呼び出しフレームの積み下ろし、ローカル変数、
//! 呼び出しイベントの発行だけを再現します。

use crate::binding::{Environment, FrameToken};
use crate::{
    BindingRef, CallInfo, ClassRef, CodeUnitRef, Event, EventClass, EventHandler, EventHub,
    HostError, HostRuntime, Inspector, LineInfo, Location, LocationRef, Object, Result,
    ReturnInfo, SubscriptionHandle, Symbol, SymbolTable, ThreadId, Value,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// 検査の入口フレームのラベル
const INSPECTION_ENTRY_LABEL: &str = "open_inspection";

/// バックトレース取得の入口フレームのラベル
const BACKTRACE_ENTRY_LABEL: &str = "backtrace";

/// ネイティブフレームの既定パス
const NATIVE_PATH: &str = "<internal>";

/// 積まれているフレーム
struct Frame {
    label: String,
    path: String,
    lineno: u32,
    receiver: Value,
    env: Rc<RefCell<Environment>>,
    code_unit: Option<CodeUnitRef>,
    enclosing_type: Option<ClassRef>,
    token: Rc<FrameToken>,
}

impl Frame {
    fn location(&self) -> LocationRef {
        Location::new(self.path.clone(), self.lineno, self.label.clone())
    }

    fn binding(&self) -> BindingRef {
        BindingRef::new(self.env.clone(), self.receiver.clone(), &self.token)
    }
}

/// 呼び出すフレームの指定
#[derive(Debug, Clone)]
pub struct FrameSpec {
    label: String,
    code_unit: Option<CodeUnitRef>,
    receiver: Value,
    enclosing_type: Option<ClassRef>,
    locals: Vec<(String, Value)>,
    args: Vec<Value>,
    line: Option<u32>,
}

impl FrameSpec {
    /// 実行単位を持つフレーム
    pub fn method(unit: CodeUnitRef) -> Self {
        let (first_line, _) = unit.code_location();
        Self {
            label: unit.label().to_string(),
            code_unit: Some(unit),
            receiver: Value::Nil,
            enclosing_type: None,
            locals: Vec::new(),
            args: Vec::new(),
            line: Some(first_line),
        }
    }

    /// 実行単位を持たないネイティブフレーム
    pub fn native(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code_unit: None,
            receiver: Value::Nil,
            enclosing_type: None,
            locals: Vec::new(),
            args: Vec::new(),
            line: None,
        }
    }

    pub fn receiver(mut self, receiver: Value) -> Self {
        self.receiver = receiver;
        self
    }

    pub fn class(mut self, class: ClassRef) -> Self {
        self.enclosing_type = Some(class);
        self
    }

    pub fn local(mut self, name: impl Into<String>, value: Value) -> Self {
        self.locals.push((name.into(), value));
        self
    }

    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// フレームを必ずポップするガード
struct PopGuard<'a> {
    vm: &'a Vm,
    thread: ThreadId,
}

impl Drop for PopGuard<'_> {
    fn drop(&mut self) {
        let mut stacks = self.vm.stacks.borrow_mut();
        if let Some(frame) = stacks.get_mut(&self.thread).and_then(Vec::pop) {
            trace!("pop frame '{}' (serial={}) on thread {}", frame.label, frame.token.serial, self.thread);
        }
    }
}

/// 検査スコープ内で参照されるスタックのスナップショット
struct Snapshot {
    locations: Vec<LocationRef>,
    frames: Vec<FrameView>,
    /// 入口フレームはスコープの間だけ生存する
    _entry_token: Rc<FrameToken>,
}

struct FrameView {
    receiver: Value,
    binding: BindingRef,
    code_unit: Option<CodeUnitRef>,
    enclosing_type: Option<ClassRef>,
}

impl Snapshot {
    fn frame(&self, index: usize) -> Result<&FrameView> {
        self.frames.get(index).ok_or(HostError::FrameOutOfRange {
            index,
            len: self.frames.len(),
        })
    }
}

impl Inspector for Snapshot {
    fn backtrace_locations(&self) -> &[LocationRef] {
        &self.locations
    }

    fn frame_self(&self, index: usize) -> Result<Value> {
        Ok(self.frame(index)?.receiver.clone())
    }

    fn frame_binding(&self, index: usize) -> Result<BindingRef> {
        Ok(self.frame(index)?.binding.clone())
    }

    fn frame_code_unit(&self, index: usize) -> Result<Option<CodeUnitRef>> {
        Ok(self.frame(index)?.code_unit.clone())
    }

    fn frame_enclosing_type(&self, index: usize) -> Result<Option<ClassRef>> {
        Ok(self.frame(index)?.enclosing_type.clone())
    }
}

/// 参照用ホストランタイム
pub struct Vm {
    symbols: SymbolTable,
    events: EventHub,
    stacks: RefCell<HashMap<ThreadId, Vec<Frame>>>,
    current: Cell<ThreadId>,
    next_thread: Cell<u32>,
    next_serial: Cell<u64>,
    next_object: Cell<u64>,
}

impl Vm {
    /// メインスレッドだけを持つランタイムを作成する
    pub fn new() -> Self {
        let mut stacks = HashMap::new();
        stacks.insert(ThreadId::MAIN, Vec::new());
        Self {
            symbols: SymbolTable::new(),
            events: EventHub::new(),
            stacks: RefCell::new(stacks),
            current: Cell::new(ThreadId::MAIN),
            next_thread: Cell::new(1),
            next_serial: Cell::new(1),
            next_object: Cell::new(1),
        }
    }

    /// オブジェクトを作成する
    pub fn new_object(&self, class: &ClassRef) -> Value {
        let id = self.next_object.get();
        self.next_object.set(id + 1);
        Value::Object(Rc::new(Object {
            id,
            class: class.clone(),
        }))
    }

    /// 現在のスレッド
    pub fn current_thread(&self) -> ThreadId {
        self.current.get()
    }

    /// 新しいコールスタックを持つスレッドを作成する
    pub fn spawn_thread(&self) -> ThreadId {
        let tid = ThreadId(self.next_thread.get());
        self.next_thread.set(tid.0 + 1);
        self.stacks.borrow_mut().insert(tid, Vec::new());
        debug!("spawned thread {}", tid);
        tid
    }

    /// 指定したスレッドを現在のスレッドにして `body` を実行する
    pub fn with_thread<R>(&self, tid: ThreadId, body: impl FnOnce(&Vm) -> R) -> R {
        struct Restore<'a>(&'a Cell<ThreadId>, ThreadId);
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.0.set(self.1);
            }
        }

        self.stacks.borrow_mut().entry(tid).or_default();
        let _restore = Restore(&self.current, self.current.replace(tid));
        body(self)
    }

    /// 現在のスレッドに積まれているフレーム数
    pub fn stack_len(&self) -> usize {
        self.stacks
            .borrow()
            .get(&self.current.get())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// フレームを積んで `body` を実行する
    ///
    /// 進入時に `Call`、正常終了時に `Return` イベントを発行します（復帰値は nil）。
    pub fn call<R>(&self, spec: FrameSpec, body: impl FnOnce(&Vm) -> Result<R>) -> Result<R> {
        self.invoke(spec, body, |_| Value::Nil)
    }

    /// `call` と同じだが、`body` の値を `Return` イベントの復帰値として報告する
    pub fn call_value(&self, spec: FrameSpec, body: impl FnOnce(&Vm) -> Result<Value>) -> Result<Value> {
        self.invoke(spec, body, Value::clone)
    }

    fn invoke<R>(
        &self,
        spec: FrameSpec,
        body: impl FnOnce(&Vm) -> Result<R>,
        return_value: impl Fn(&R) -> Value,
    ) -> Result<R> {
        let thread = self.current.get();
        let callee_id = self.symbols.intern(&spec.label);
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);

        let frame = {
            let stacks = self.stacks.borrow();
            let caller = stacks.get(&thread).and_then(|s| s.last());
            let path = match (&spec.code_unit, caller) {
                (Some(unit), _) => unit.path().to_string(),
                (None, Some(caller)) => caller.path.clone(),
                (None, None) => NATIVE_PATH.to_string(),
            };
            let lineno = spec
                .line
                .or_else(|| caller.map(|c| c.lineno))
                .unwrap_or(0);
            Frame {
                label: spec.label,
                path,
                lineno,
                receiver: spec.receiver,
                env: Rc::new(RefCell::new(Environment::new(spec.locals))),
                code_unit: spec.code_unit,
                enclosing_type: spec.enclosing_type,
                token: Rc::new(FrameToken { serial }),
            }
        };

        let call_event = self.events.has_active(EventClass::Call).then(|| {
            Event::Call(CallInfo {
                callee_id,
                receiver: frame.receiver.clone(),
                defined_class: frame.enclosing_type.clone(),
                location: frame.location(),
                args: spec.args,
            })
        });

        trace!("push frame '{}' (serial={}) on thread {}", frame.label, serial, thread);
        self.stacks.borrow_mut().entry(thread).or_default().push(frame);
        let _guard = PopGuard { vm: self, thread };

        if let Some(event) = call_event {
            self.events.emit(&event);
        }

        let result = body(self)?;

        if self.events.has_active(EventClass::Return) {
            let location = self.top_frame(thread, Frame::location)?;
            self.events.emit(&Event::Return(ReturnInfo {
                callee_id,
                return_value: return_value(&result),
                location,
            }));
        }

        Ok(result)
    }

    fn top_frame<T>(&self, thread: ThreadId, f: impl FnOnce(&Frame) -> T) -> Result<T> {
        self.stacks
            .borrow()
            .get(&thread)
            .and_then(|s| s.last())
            .map(f)
            .ok_or(HostError::InvalidExecutionContext)
    }

    /// 現在のフレームの実行行を進めて `Line` イベントを発行する
    pub fn set_line(&self, lineno: u32) -> Result<()> {
        let thread = self.current.get();
        let location = {
            let mut stacks = self.stacks.borrow_mut();
            let frame = stacks
                .get_mut(&thread)
                .and_then(|s| s.last_mut())
                .ok_or(HostError::InvalidExecutionContext)?;
            frame.lineno = lineno;
            frame.location()
        };
        if self.events.has_active(EventClass::Line) {
            self.events.emit(&Event::Line(LineInfo { location }));
        }
        Ok(())
    }

    /// 現在のフレームのローカル変数を設定する
    pub fn set_local(&self, name: &str, value: Value) -> Result<()> {
        self.top_frame(self.current.get(), |frame| {
            frame.env.borrow_mut().set(name, value);
        })
    }

    /// 現在のフレームのバインディング
    pub fn current_binding(&self) -> Result<BindingRef> {
        self.top_frame(self.current.get(), Frame::binding)
    }

    /// メソッド定義を通知する（`method_added` フックの呼び出し）
    pub fn define_method(&self, name: &str) -> Result<()> {
        self.dispatch_definition_hook("method_added", name)
    }

    /// 特異メソッド定義を通知する（`singleton_method_added` フックの呼び出し）
    pub fn define_singleton_method(&self, name: &str) -> Result<()> {
        self.dispatch_definition_hook("singleton_method_added", name)
    }

    fn dispatch_definition_hook(&self, hook: &str, name: &str) -> Result<()> {
        let (receiver, class) = self.top_frame(self.current.get(), |frame| {
            (frame.receiver.clone(), frame.enclosing_type.clone())
        })?;
        let mut spec = FrameSpec::native(hook)
            .receiver(receiver)
            .arg(Value::Symbol(self.symbols.intern(name)));
        if let Some(class) = class {
            spec = spec.class(class);
        }
        debug!("dispatching {} for '{}'", hook, name);
        self.call(spec, |_| Ok(()))
    }

    /// 現在のスレッドのバックトレースを入口フレーム付きで作成する
    fn backtrace_with_entry(&self, entry_label: &str) -> Result<(Vec<LocationRef>, Vec<FrameView>, Rc<FrameToken>)> {
        let stacks = self.stacks.borrow();
        let stack = stacks
            .get(&self.current.get())
            .filter(|s| !s.is_empty())
            .ok_or(HostError::InvalidExecutionContext)?;

        let top = stack.last().ok_or(HostError::InvalidExecutionContext)?;
        let entry_token = Rc::new(FrameToken { serial: 0 });
        let entry_receiver = Value::Nil;
        let entry_binding = BindingRef::new(
            Rc::new(RefCell::new(Environment::default())),
            entry_receiver.clone(),
            &entry_token,
        );

        let mut locations = Vec::with_capacity(stack.len() + 1);
        let mut frames = Vec::with_capacity(stack.len() + 1);
        locations.push(Location::new(top.path.clone(), top.lineno, entry_label));
        frames.push(FrameView {
            receiver: entry_receiver,
            binding: entry_binding,
            code_unit: None,
            enclosing_type: None,
        });

        for frame in stack.iter().rev() {
            locations.push(frame.location());
            frames.push(FrameView {
                receiver: frame.receiver.clone(),
                binding: frame.binding(),
                code_unit: frame.code_unit.clone(),
                enclosing_type: frame.enclosing_type.clone(),
            });
        }

        Ok((locations, frames, entry_token))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for Vm {
    fn open_inspection<R>(&self, body: impl FnOnce(&dyn Inspector) -> Result<R>) -> Result<R> {
        let (locations, frames, entry_token) = self.backtrace_with_entry(INSPECTION_ENTRY_LABEL)?;
        trace!("inspection opened over {} frames", locations.len());
        let snapshot = Snapshot {
            locations,
            frames,
            _entry_token: entry_token,
        };
        body(&snapshot)
    }

    fn current_full_backtrace(&self) -> Result<Vec<LocationRef>> {
        let (locations, _, _) = self.backtrace_with_entry(BACKTRACE_ENTRY_LABEL)?;
        Ok(locations)
    }

    fn intern(&self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    fn symbol_name(&self, sym: Symbol) -> Option<String> {
        self.symbols.name(sym)
    }

    fn subscribe(&self, class: EventClass, handler: EventHandler) -> SubscriptionHandle {
        self.events.subscribe(class, handler)
    }
}
