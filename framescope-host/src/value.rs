//! ホストランタイムの値

use crate::ByteString;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// インターン済みシンボル
///
/// 同じ名前は同じIDになるため、比較は整数の比較だけで済みます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub u32);

/// シンボルテーブル
#[derive(Debug, Default)]
pub struct SymbolTable {
    ids: RefCell<HashMap<String, Symbol>>,
    names: RefCell<Vec<String>>,
}

impl SymbolTable {
    /// 新しいシンボルテーブルを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 名前をインターンする（既にあれば同じシンボルを返す）
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(sym) = self.ids.borrow().get(name) {
            return *sym;
        }
        let mut names = self.names.borrow_mut();
        let sym = Symbol(names.len() as u32);
        names.push(name.to_string());
        self.ids.borrow_mut().insert(name.to_string(), sym);
        sym
    }

    /// シンボルの名前を取得する
    pub fn name(&self, sym: Symbol) -> Option<String> {
        self.names.borrow().get(sym.0 as usize).cloned()
    }
}

/// クラス記述子
#[derive(Debug, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    /// 特異クラスかどうか
    pub singleton: bool,
}

/// クラスへの共有参照
pub type ClassRef = Rc<Class>;

impl Class {
    /// 通常のクラスを作成する
    pub fn new(name: impl Into<String>) -> ClassRef {
        Rc::new(Self {
            name: name.into(),
            singleton: false,
        })
    }

    /// 特異クラスを作成する
    pub fn singleton_of(name: impl Into<String>) -> ClassRef {
        Rc::new(Self {
            name: name.into(),
            singleton: true,
        })
    }
}

/// オブジェクト
#[derive(Debug)]
pub struct Object {
    pub id: u64,
    pub class: ClassRef,
}

/// ホストランタイムの値
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    String(ByteString),
    Symbol(Symbol),
    Object(Rc<Object>),
    Class(ClassRef),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// 型名を取得する
    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::Integer(_) => "Integer",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Object(obj) => &obj.class.name,
            Value::Class(_) => "Class",
        }
    }
}

/// オブジェクトとクラスは同一性、それ以外は値で比較する
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{:?}", s.to_string_lossy()),
            Value::Symbol(sym) => write!(f, ":#{}", sym.0),
            Value::Object(obj) => write!(f, "#<{}:{:#x}>", obj.class.name, obj.id),
            Value::Class(class) if class.singleton => write!(f, "#<Class:{}>", class.name),
            Value::Class(class) => write!(f, "{}", class.name),
        }
    }
}
