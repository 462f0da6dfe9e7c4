//! 参照ランタイム上でのフレームキャプチャのテスト

use framescope_core::{create_tracker, CaptureConfig, Debugger, DepthProbe, FrameRecord, StackWalker};
use framescope_host::{
    BindingRef, ByteString, Class, ClassRef, CodeUnit, CodeUnitKind, CodeUnitRef, Encoding, Event,
    EventClass, EventHandler, EventHub, FrameSpec, HostError, HostRuntime, Inspector, Location,
    LocationRef, Result, SubscriptionHandle, Symbol, SymbolTable, Value, Vm,
};
use std::cell::RefCell;
use std::rc::Rc;

fn method(label: &str, path: &str) -> FrameSpec {
    FrameSpec::method(
        CodeUnit::builder(label, CodeUnitKind::Method)
            .path(path)
            .lines(1, 40)
            .build(),
    )
}

/// `specs` を外側から順に積み、最も内側で `at_top` を実行する
fn nested<R>(vm: &Vm, specs: &[FrameSpec], at_top: &dyn Fn(&Vm) -> Result<R>) -> Result<R> {
    match specs.split_first() {
        None => at_top(vm),
        Some((first, rest)) => vm.call(first.clone(), |vm| nested(vm, rest, at_top)),
    }
}

fn capture(vm: &Vm, prefix: Option<&ByteString>) -> Result<Vec<FrameRecord>> {
    StackWalker::new(vm).capture_frames(prefix)
}

#[test]
fn test_unfiltered_capture_returns_all_but_entry() {
    let vm = Vm::new();
    for n in 1..=6 {
        let specs: Vec<FrameSpec> = (0..n)
            .map(|i| method(&format!("level{}", i), "/app/main.rb"))
            .collect();

        let (depth, frames) = nested(&vm, &specs, &|vm| {
            let depth = DepthProbe::new(vm).current_depth()?;
            Ok((depth, capture(vm, None)?))
        })
        .unwrap();

        assert_eq!(frames.len(), depth - 1);
        assert_eq!(frames.len(), n);
        let depths: Vec<usize> = frames.iter().map(FrameRecord::depth).collect();
        let expected: Vec<usize> = (1..=n).rev().collect();
        assert_eq!(depths, expected);
        // 先頭は直接の呼び出し元
        assert_eq!(frames[0].label(), format!("level{}", n - 1));
    }
}

#[test]
fn test_scenario_internal_frame_hidden_without_renumbering() {
    let vm = Vm::new();
    let specs = [
        method("C", "/app/util"),
        method("B", "/app/main"),
        method("A", "internal/debugger.lib"),
    ];
    let prefix = ByteString::utf8("internal/");

    let frames = nested(&vm, &specs, &|vm| capture(vm, Some(&prefix))).unwrap();
    let summary: Vec<(&str, usize)> = frames.iter().map(|f| (f.label(), f.depth())).collect();
    assert_eq!(summary, vec![("B", 2), ("C", 1)]);

    let all = nested(&vm, &specs, &|vm| capture(vm, None)).unwrap();
    let summary: Vec<(&str, usize)> = all.iter().map(|f| (f.label(), f.depth())).collect();
    assert_eq!(summary, vec![("A", 3), ("B", 2), ("C", 1)]);
}

#[test]
fn test_filtering_leaves_depth_gaps() {
    let vm = Vm::new();
    let specs = [
        method("<main>", "/app/main.rb"),
        method("enter", "internal/session.rb"),
        method("run", "/app/app.rb"),
        method("hook", "internal/hook.rb"),
        method("compute", "/app/util.rb"),
    ];
    let prefix = ByteString::utf8("internal/");
    let frames = nested(&vm, &specs, &|vm| capture(vm, Some(&prefix))).unwrap();

    let depths: Vec<usize> = frames.iter().map(FrameRecord::depth).collect();
    assert_eq!(depths, vec![5, 3, 1]);
    for frame in &frames {
        let path = frame.realpath().unwrap();
        assert!(!path.as_bytes().starts_with(prefix.as_bytes()));
    }
}

#[test]
fn test_native_frames_are_never_excluded() {
    let vm = Vm::new();
    let specs = [
        method("<main>", "/app/main.rb"),
        method("enter", "internal/session.rb"),
        // 呼び出し元の位置を引き継ぐので internal/ のパスを持つ
        FrameSpec::native("instance_eval"),
    ];
    let prefix = ByteString::utf8("internal/");
    let frames = nested(&vm, &specs, &|vm| capture(vm, Some(&prefix))).unwrap();

    let labels: Vec<&str> = frames.iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["instance_eval", "<main>"]);
    assert!(frames[0].is_native());
    assert_eq!(frames[0].path(), "internal/session.rb");
}

#[test]
fn test_units_without_real_path_are_kept() {
    let vm = Vm::new();
    let eval_unit = CodeUnit::builder("<eval>", CodeUnitKind::Eval)
        .path("internal/eval")
        .real_path(None)
        .build();
    let specs = [method("<main>", "/app/main.rb"), FrameSpec::method(eval_unit)];
    let prefix = ByteString::utf8("internal/");
    let frames = nested(&vm, &specs, &|vm| capture(vm, Some(&prefix))).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].label(), "<eval>");
}

/// 検査の入口フレームだけを持つホスト
#[derive(Default)]
struct EntryOnlyHost {
    symbols: SymbolTable,
    events: EventHub,
}

struct EntryOnlyInspector {
    locations: Vec<LocationRef>,
}

impl EntryOnlyInspector {
    fn out_of_range<T>(&self, index: usize) -> Result<T> {
        Err(HostError::FrameOutOfRange {
            index,
            len: self.locations.len(),
        })
    }
}

impl Inspector for EntryOnlyInspector {
    fn backtrace_locations(&self) -> &[LocationRef] {
        &self.locations
    }

    fn frame_self(&self, index: usize) -> Result<Value> {
        self.out_of_range(index)
    }

    fn frame_binding(&self, index: usize) -> Result<BindingRef> {
        self.out_of_range(index)
    }

    fn frame_code_unit(&self, index: usize) -> Result<Option<CodeUnitRef>> {
        self.out_of_range(index)
    }

    fn frame_enclosing_type(&self, index: usize) -> Result<Option<ClassRef>> {
        self.out_of_range(index)
    }
}

impl HostRuntime for EntryOnlyHost {
    fn open_inspection<R>(&self, body: impl FnOnce(&dyn Inspector) -> Result<R>) -> Result<R> {
        let inspector = EntryOnlyInspector {
            locations: self.current_full_backtrace()?,
        };
        body(&inspector)
    }

    fn current_full_backtrace(&self) -> Result<Vec<LocationRef>> {
        Ok(vec![Location::new("<internal>", 0, "open_inspection")])
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

#[test]
fn test_capture_outside_context() {
    let vm = Vm::new();
    assert_eq!(capture(&vm, None).unwrap_err(), HostError::InvalidExecutionContext);
}

#[test]
fn test_empty_stack_beyond_entry() {
    let host = EntryOnlyHost::default();
    let walker = StackWalker::new(&host);
    assert!(walker.capture_frames(None).unwrap().is_empty());

    let prefix = ByteString::utf8("internal/");
    assert!(walker.capture_frames(Some(&prefix)).unwrap().is_empty());
    assert_eq!(DepthProbe::new(&host).current_depth().unwrap(), 1);
}

#[test]
fn test_frame_fields() {
    let vm = Vm::new();
    let class = Class::new("Calculator");
    let receiver = vm.new_object(&class);
    let spec = method("add", "/app/calc.rb")
        .receiver(receiver.clone())
        .class(class.clone())
        .local("a", Value::Integer(1))
        .line(12);

    let frames = vm
        .call(method("<main>", "/app/main.rb"), |vm| {
            vm.call(spec, |vm| capture(vm, None))
        })
        .unwrap();

    let add = &frames[0];
    assert_eq!(add.self_value(), &receiver);
    assert!(Rc::ptr_eq(add.enclosing_type().unwrap(), &class));
    assert_eq!(add.code_unit().unwrap().label(), "add");
    assert_eq!(add.lineno(), 12);
    assert_eq!(add.path(), "/app/calc.rb");
    assert_eq!(add.binding().receiver(), &receiver);
    assert!(frames[1].enclosing_type().is_none());
}

#[test]
fn test_binding_survives_frame_pop() {
    let vm = Vm::new();
    let frames = vm
        .call(method("<main>", "/app/main.rb"), |vm| {
            vm.call(method("compute", "/app/util.rb").local("x", Value::Integer(10)), |vm| {
                let frames = capture(vm, None)?;
                assert!(frames[0].binding().is_frame_live());
                Ok(frames)
            })
        })
        .unwrap();

    let binding = frames[0].binding();
    assert!(!binding.is_frame_live());
    assert_eq!(binding.local_variable_get("x"), Ok(Value::Integer(10)));
    binding.local_variable_set("x", Value::Integer(11));
    assert_eq!(binding.local_variable_get("x"), Ok(Value::Integer(11)));
}

#[test]
fn test_records_are_fresh_per_capture() {
    let vm = Vm::new();
    vm.call(method("<main>", "/app/main.rb"), |vm| {
        let first = capture(vm, None)?;
        vm.set_line(20)?;
        let second = vm.call(method("inner", "/app/main.rb"), |vm| capture(vm, None))?;

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].lineno(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].lineno(), 20);
        assert!(second[1].binding().same_environment(first[0].binding()));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_capture_is_scoped_to_current_thread() {
    let vm = Vm::new();
    let worker = vm.spawn_thread();
    vm.call(method("<main>", "/app/main.rb"), |vm| {
        vm.call(method("spawn", "/app/main.rb"), |vm| {
            let frames = vm.with_thread(worker, |vm| {
                vm.call(method("work", "/app/worker.rb"), |vm| capture(vm, None))
            })?;
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].label(), "work");
            assert_eq!(capture(vm, None)?.len(), 2);
            Ok(())
        })
    })
    .unwrap();
}

#[test]
fn test_depth_probe_is_stable() {
    let vm = Vm::new();
    vm.call(method("<main>", "/app/main.rb"), |vm| {
        let probe = DepthProbe::new(vm);
        let a = probe.current_depth()?;
        let b = probe.current_depth()?;
        assert_eq!(a, b);
        assert!(a >= 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_tracker_on_live_call_events() {
    let vm = Vm::new();
    let seen: Rc<RefCell<Vec<Event>>> = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let handle = create_tracker(&vm, move |event: &Event| s.borrow_mut().push(event.clone()));

    let class = Class::new("App");
    let run_program = |vm: &Vm| {
        vm.call(FrameSpec::native("<class:App>").receiver(Value::Class(class.clone())).class(class.clone()), |vm| {
            for name in ["puts", "require", "attr_reader"] {
                vm.call(FrameSpec::native(name), |_| Ok(()))?;
            }
            vm.define_method("run")?;
            for name in ["new", "each", "map"] {
                vm.call(FrameSpec::native(name), |_| Ok(()))?;
            }
            vm.define_singleton_method("build")?;
            vm.call(FrameSpec::native("freeze"), |_| Ok(()))
        })
    };

    // 無効な間は何も届かない
    run_program(&vm).unwrap();
    assert!(seen.borrow().is_empty());

    handle.enable();
    run_program(&vm).unwrap();
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        let callees: Vec<Option<String>> = seen
            .iter()
            .map(|e| e.invoked_symbol_name().and_then(|s| vm.symbol_name(s)))
            .collect();
        assert_eq!(
            callees,
            vec![Some("method_added".to_string()), Some("singleton_method_added".to_string())]
        );
        match &seen[0] {
            Event::Call(info) => {
                assert_eq!(info.args, vec![Value::Symbol(vm.intern("run"))]);
                assert_eq!(info.receiver, Value::Class(class.clone()));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    handle.disable();
    run_program(&vm).unwrap();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_tracker_callback_does_not_recurse() {
    let vm = Rc::new(Vm::new());
    let hits = Rc::new(RefCell::new(0));
    let h = hits.clone();
    let inner = vm.clone();
    let handle = create_tracker(&*vm, move |_: &Event| {
        *h.borrow_mut() += 1;
        // フックの中でのメソッド定義は再度フックを起動しない
        let _ = inner.call(FrameSpec::native("hook"), |vm| vm.define_method("nested"));
    });
    handle.enable();

    vm.call(FrameSpec::native("<main>"), |vm| vm.define_method("outer"))
        .unwrap();
    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn test_encoding_mismatch_through_debugger() {
    let vm = Vm::new();
    let err = vm
        .call(method("<main>", "/app/main.rb"), |vm| {
            let prefix = ByteString::new(vec![0x00, 0x2f], Encoding::Utf16Be);
            let mut debugger = Debugger::new(vm, CaptureConfig::new().with_skip_path_prefix(prefix));
            Ok(debugger.capture().map(|frames| frames.len()).unwrap_err())
        })
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<HostError>(),
        Some(HostError::EncodingMismatch { .. })
    ));
}

#[test]
fn test_debugger_uses_configured_prefix() {
    let vm = Vm::new();
    let specs = [
        method("<main>", "/app/main.rb"),
        method("run", "/app/app.rb"),
        method("enter", "internal/session.rb"),
    ];
    let labels = nested(&vm, &specs, &|vm| {
        let mut debugger = Debugger::new(vm, CaptureConfig::new().with_skip_path_prefix("internal/"));
        let filtered: Vec<String> = debugger.capture().unwrap().iter().map(|f| f.label().to_string()).collect();
        let all = debugger.capture_all().unwrap().len();
        let depth = debugger.depth().unwrap();
        Ok((filtered, all, depth))
    })
    .unwrap();
    assert_eq!(labels.0, vec!["run", "<main>"]);
    assert_eq!(labels.1, 3);
    assert_eq!(labels.2, 4);
}
