//! 実行単位（コンパイル済みの関数・メソッド本体）

use crate::ByteString;
use std::rc::Rc;

/// 実行単位の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeUnitKind {
    Top,
    Main,
    Method,
    Block,
    Class,
    Rescue,
    Ensure,
    Eval,
    Plain,
}

impl CodeUnitKind {
    pub fn name(self) -> &'static str {
        match self {
            CodeUnitKind::Top => "top",
            CodeUnitKind::Main => "main",
            CodeUnitKind::Method => "method",
            CodeUnitKind::Block => "block",
            CodeUnitKind::Class => "class",
            CodeUnitKind::Rescue => "rescue",
            CodeUnitKind::Ensure => "ensure",
            CodeUnitKind::Eval => "eval",
            CodeUnitKind::Plain => "plain",
        }
    }
}

/// 仮引数の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Req,
    Opt,
    Rest,
    KeyReq,
    Key,
    KeyRest,
    Block,
    NoKey,
}

/// 仮引数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub kind: ParamKind,
    /// 引数名（無名の `*` `**` `&` もそのまま名前として持つ）
    pub name: Option<String>,
}

impl Parameter {
    pub fn new(kind: ParamKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// 名前を持たない引数（`**nil` など）
    pub fn unnamed(kind: ParamKind) -> Self {
        Self { kind, name: None }
    }
}

/// 実行単位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    label: String,
    kind: CodeUnitKind,
    path: String,
    real_path: Option<ByteString>,
    parameters: Vec<Parameter>,
    first_line: u32,
    last_line: u32,
}

/// 実行単位への共有参照
pub type CodeUnitRef = Rc<CodeUnit>;

impl CodeUnit {
    /// ビルダーを作成する
    pub fn builder(label: impl Into<String>, kind: CodeUnitKind) -> CodeUnitBuilder {
        CodeUnitBuilder {
            unit: CodeUnit {
                label: label.into(),
                kind,
                path: String::new(),
                real_path: None,
                parameters: Vec::new(),
                first_line: 0,
                last_line: 0,
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> CodeUnitKind {
        self.kind
    }

    /// 読み込み時に指定されたパス
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 正規化済みの実パス（eval などでは存在しない）
    pub fn real_path(&self) -> Option<&ByteString> {
        self.real_path.as_ref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// コード位置（開始行, 終了行）
    pub fn code_location(&self) -> (u32, u32) {
        (self.first_line, self.last_line)
    }
}

/// `CodeUnit` のビルダー
pub struct CodeUnitBuilder {
    unit: CodeUnit,
}

impl CodeUnitBuilder {
    /// パスを設定する（実パスも同じ値のUTF-8文字列になる）
    pub fn path(mut self, path: &str) -> Self {
        self.unit.path = path.to_string();
        self.unit.real_path = Some(ByteString::utf8(path));
        self
    }

    /// 実パスを個別に設定する
    pub fn real_path(mut self, real_path: Option<ByteString>) -> Self {
        self.unit.real_path = real_path;
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.unit.parameters.push(param);
        self
    }

    pub fn lines(mut self, first: u32, last: u32) -> Self {
        self.unit.first_line = first;
        self.unit.last_line = last;
        self
    }

    pub fn build(self) -> CodeUnitRef {
        Rc::new(self.unit)
    }
}
