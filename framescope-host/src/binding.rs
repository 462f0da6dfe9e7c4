//! ローカル変数環境（バインディング）

use crate::{HostError, Result, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// フレームの生存を示すトークン
///
/// フレームがスタックに積まれている間だけ強参照が存在します。
#[derive(Debug)]
pub(crate) struct FrameToken {
    pub(crate) serial: u64,
}

/// フレームのローカル変数領域
#[derive(Debug, Default)]
pub(crate) struct Environment {
    locals: Vec<(String, Value)>,
}

impl Environment {
    pub(crate) fn new(locals: Vec<(String, Value)>) -> Self {
        Self { locals }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.locals.iter().position(|(n, _)| n == name)
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        match self.position(name) {
            Some(i) => self.locals[i].1 = value,
            None => self.locals.push((name.to_string(), value)),
        }
    }
}

/// フレームのローカル変数環境へのハンドル
///
/// 変数領域はフレームと共有（`Rc`）されるため、フレームがポップされた後も
/// 読み書きできます。元のフレームがまだ生きているかは `is_frame_live` で確認できます。
#[derive(Debug, Clone)]
pub struct BindingRef {
    env: Rc<RefCell<Environment>>,
    receiver: Value,
    frame: Weak<FrameToken>,
    serial: u64,
}

impl BindingRef {
    pub(crate) fn new(env: Rc<RefCell<Environment>>, receiver: Value, frame: &Rc<FrameToken>) -> Self {
        Self {
            env,
            receiver,
            frame: Rc::downgrade(frame),
            serial: frame.serial,
        }
    }

    /// バインディングの self
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    /// 取得元フレームの通し番号
    pub fn frame_serial(&self) -> u64 {
        self.serial
    }

    /// 取得元のフレームがまだスタック上にあるかどうか
    pub fn is_frame_live(&self) -> bool {
        self.frame.strong_count() > 0
    }

    /// ローカル変数名の一覧（定義順）
    pub fn local_variables(&self) -> Vec<String> {
        self.env.borrow().locals.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn local_variable_defined(&self, name: &str) -> bool {
        self.env.borrow().position(name).is_some()
    }

    /// ローカル変数の値を取得する
    pub fn local_variable_get(&self, name: &str) -> Result<Value> {
        let env = self.env.borrow();
        env.position(name)
            .map(|i| env.locals[i].1.clone())
            .ok_or_else(|| HostError::UnknownVariable(name.to_string()))
    }

    /// ローカル変数の値を設定する（未定義なら追加する）
    pub fn local_variable_set(&self, name: &str, value: Value) {
        self.env.borrow_mut().set(name, value);
    }

    /// 現在のローカル変数をすべてコピーする
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.env.borrow().locals.clone()
    }

    /// 同じ変数領域を指しているかどうか
    pub fn same_environment(&self, other: &BindingRef) -> bool {
        Rc::ptr_eq(&self.env, &other.env)
    }

    /// 現時点の変数をコピーした独立のバインディングを作成する
    pub fn dup(&self) -> BindingRef {
        Self {
            env: Rc::new(RefCell::new(Environment::new(self.snapshot()))),
            receiver: self.receiver.clone(),
            frame: self.frame.clone(),
            serial: self.serial,
        }
    }
}
