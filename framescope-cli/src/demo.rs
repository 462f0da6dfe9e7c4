//! 参照ランタイム上で動かすデモプログラム
//!
//! アプリケーションのフレームの上に `internal/debugger/` 配下のフレームが積まれた状態で
//! 停止し、そこでデバッガを動かします。

use framescope_host::{
    ByteString, Class, ClassRef, CodeUnit, CodeUnitKind, CodeUnitRef, FrameSpec, ParamKind,
    Parameter, Result, Value, Vm,
};

/// デバッガ自身のファイルが置かれる場所
pub const DEFAULT_SKIP_PATH: &str = "internal/debugger/";

const MAIN_PATH: &str = "/app/main.rb";
const APP_PATH: &str = "/app/app.rb";
const UTIL_PATH: &str = "/app/util.rb";
const SESSION_PATH: &str = "internal/debugger/session.rb";

fn unit(label: &str, kind: CodeUnitKind, path: &str, first: u32, last: u32) -> CodeUnitRef {
    CodeUnit::builder(label, kind).path(path).lines(first, last).build()
}

struct Program {
    app: ClassRef,
    util: ClassRef,
    session: ClassRef,
}

impl Program {
    fn new() -> Self {
        Self {
            app: Class::new("App"),
            util: Class::new("Util"),
            session: Class::new("Session"),
        }
    }

    /// クラス定義（メソッド定義フックが呼ばれる）
    fn define_classes(&self, vm: &Vm) -> Result<()> {
        let app_body = FrameSpec::method(unit("<class:App>", CodeUnitKind::Class, APP_PATH, 1, 20))
            .receiver(Value::Class(self.app.clone()))
            .class(self.app.clone());
        vm.call(app_body, |vm| {
            vm.set_line(2)?;
            vm.define_method("initialize")?;
            vm.set_line(6)?;
            vm.define_method("run")?;
            vm.set_line(15)?;
            vm.define_singleton_method("build")
        })?;

        let util_body = FrameSpec::method(unit("<module:Util>", CodeUnitKind::Class, UTIL_PATH, 1, 12))
            .receiver(Value::Class(self.util.clone()))
            .class(self.util.clone());
        vm.call(util_body, |vm| {
            vm.set_line(2)?;
            vm.define_singleton_method("compute")
        })
    }

    /// `App.build` の呼び出し
    fn build_app(&self, vm: &Vm) -> Result<Value> {
        let build = FrameSpec::method(unit("build", CodeUnitKind::Method, APP_PATH, 15, 18))
            .receiver(Value::Class(self.app.clone()))
            .class(Class::singleton_of("App"));
        vm.call_value(build, |vm| {
            let app = vm.new_object(&self.app);
            vm.call(FrameSpec::native("new").receiver(Value::Class(self.app.clone())), |_| Ok(()))?;
            Ok(app)
        })
    }

    /// `Util.compute(a, b = 2, *rest)` からデバッガに入る
    fn compute<R>(&self, vm: &Vm, a: i64, at_breakpoint: impl FnOnce(&Vm) -> R) -> Result<R> {
        let compute_unit = CodeUnit::builder("compute", CodeUnitKind::Method)
            .path(UTIL_PATH)
            .lines(2, 10)
            .param(Parameter::new(ParamKind::Req, "a"))
            .param(Parameter::new(ParamKind::Opt, "b"))
            .param(Parameter::new(ParamKind::Rest, "*"))
            .build();
        let spec = FrameSpec::method(compute_unit)
            .receiver(Value::Class(self.util.clone()))
            .class(Class::singleton_of("Util"))
            .local("a", Value::Integer(a))
            .local("b", Value::Integer(2))
            .arg(Value::Integer(a));

        vm.call(spec, |vm| {
            vm.set_line(4)?;
            vm.set_local("total", Value::Integer(a * 2))?;
            vm.set_line(5)?;
            // `binding.break` 相当
            vm.call(FrameSpec::native("break"), |vm| self.enter_session(vm, at_breakpoint))
        })
    }

    fn enter_session<R>(&self, vm: &Vm, at_breakpoint: impl FnOnce(&Vm) -> R) -> Result<R> {
        let session = vm.new_object(&self.session);
        let enter = FrameSpec::method(unit("enter", CodeUnitKind::Method, SESSION_PATH, 10, 30))
            .receiver(session.clone())
            .class(self.session.clone())
            .local("reason", Value::String(ByteString::utf8("binding.break")))
            .line(12);
        vm.call(enter, |vm| {
            let wait = FrameSpec::method(unit("wait_command", CodeUnitKind::Method, SESSION_PATH, 40, 60))
                .receiver(session)
                .class(self.session.clone())
                .line(44);
            vm.call(wait, |vm| Ok(at_breakpoint(vm)))
        })
    }
}

/// デモプログラムを実行し、停止地点で `at_breakpoint` を呼ぶ
pub fn run<R>(vm: &Vm, at_breakpoint: impl FnOnce(&Vm) -> R) -> Result<R> {
    let program = Program::new();
    let main = FrameSpec::method(unit("<main>", CodeUnitKind::Top, MAIN_PATH, 1, 20));

    vm.call(main, |vm| {
        vm.set_line(3)?;
        program.define_classes(vm)?;

        vm.set_line(8)?;
        let app = program.build_app(vm)?;
        vm.set_local("app", app.clone())?;

        vm.set_line(9)?;
        let run = FrameSpec::method(
            CodeUnit::builder("run", CodeUnitKind::Method)
                .path(APP_PATH)
                .lines(6, 12)
                .param(Parameter::new(ParamKind::Req, "items"))
                .param(Parameter::new(ParamKind::Block, "&"))
                .build(),
        )
        .receiver(app.clone())
        .class(program.app.clone())
        .local("items", Value::Integer(3))
        .arg(Value::Integer(3));

        vm.call(run, |vm| {
            vm.set_line(8)?;
            let each = FrameSpec::native("each").receiver(Value::Integer(3));
            vm.call(each, |vm| {
                let block = FrameSpec::method(unit("block in run", CodeUnitKind::Block, APP_PATH, 8, 10))
                    .receiver(app)
                    .class(program.app.clone())
                    .local("i", Value::Integer(2));
                vm.call(block, |vm| {
                    vm.set_line(9)?;
                    program.compute(vm, 21, at_breakpoint)
                })
            })
        })
    })
}
