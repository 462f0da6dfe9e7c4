//! キャプチャしたフレームの記録

use framescope_host::{
    BindingRef, ByteString, ClassRef, CodeUnitKind, CodeUnitRef, LocationRef, Symbol, Value,
};
use std::fmt;

/// フレームの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 実行単位を持たないネイティブフレーム
    Native,
    Method,
    Block,
    Class,
    Top,
    Other,
}

/// キャプチャ後に利用側が付け加える情報
///
/// キャプチャ処理自身はどれも設定しません。
#[derive(Debug, Clone, Default)]
pub struct FrameAnnotations {
    /// 復帰値（`Some(Value::Nil)` は「nil を返した」を意味する）
    pub return_value: Option<Value>,
    /// 送出された例外
    pub raised_exception: Option<Value>,
    /// 表示する行
    pub show_line: Option<u32>,
    /// ローカル変数のスナップショット
    pub local_variables: Option<Vec<(String, Value)>>,
    /// 記録用の呼び出し先メソッド名
    pub callee: Option<Symbol>,
    /// 複製したバインディング
    pub dupped_binding: Option<BindingRef>,
}

impl FrameAnnotations {
    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }

    pub fn has_raised_exception(&self) -> bool {
        self.raised_exception.is_some()
    }
}

/// 1つの呼び出しフレームの記録
///
/// 位置・self・バインディング・実行単位・クラス・深さは作成後に変更されません。
/// `annotations` だけが利用側で自由に書き換えられます。
#[derive(Debug, Clone)]
pub struct FrameRecord {
    location: LocationRef,
    self_value: Value,
    binding: BindingRef,
    code_unit: Option<CodeUnitRef>,
    enclosing_type: Option<ClassRef>,
    depth: usize,
    pub annotations: FrameAnnotations,
}

impl FrameRecord {
    pub fn new(
        location: LocationRef,
        self_value: Value,
        binding: BindingRef,
        code_unit: Option<CodeUnitRef>,
        enclosing_type: Option<ClassRef>,
        depth: usize,
    ) -> Self {
        Self {
            location,
            self_value,
            binding,
            code_unit,
            enclosing_type,
            depth,
            annotations: FrameAnnotations::default(),
        }
    }

    pub fn location(&self) -> &LocationRef {
        &self.location
    }

    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    pub fn binding(&self) -> &BindingRef {
        &self.binding
    }

    pub fn code_unit(&self) -> Option<&CodeUnitRef> {
        self.code_unit.as_ref()
    }

    pub fn enclosing_type(&self) -> Option<&ClassRef> {
        self.enclosing_type.as_ref()
    }

    /// キャプチャ時点でのスタック先頭からの距離
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }

    pub fn lineno(&self) -> u32 {
        self.location.lineno
    }

    pub fn label(&self) -> &str {
        &self.location.label
    }

    pub fn realpath(&self) -> Option<&ByteString> {
        self.code_unit.as_ref().and_then(|unit| unit.real_path())
    }

    pub fn is_native(&self) -> bool {
        self.code_unit.is_none()
    }

    pub fn kind(&self) -> FrameKind {
        match self.code_unit.as_ref().map(|unit| unit.kind()) {
            None => FrameKind::Native,
            Some(CodeUnitKind::Method) => FrameKind::Method,
            Some(CodeUnitKind::Block) => FrameKind::Block,
            Some(CodeUnitKind::Class) => FrameKind::Class,
            Some(CodeUnitKind::Top | CodeUnitKind::Main) => FrameKind::Top,
            Some(_) => FrameKind::Other,
        }
    }

    /// 表示する行（`show_line` があればそちらを優先する）
    pub fn display_line(&self) -> u32 {
        self.annotations.show_line.unwrap_or(self.location.lineno)
    }

    /// ローカル変数を取得する（初回にスナップショットを作ってキャッシュする）
    pub fn local_variables(&mut self) -> &[(String, Value)] {
        let binding = &self.binding;
        self.annotations
            .local_variables
            .get_or_insert_with(|| binding.snapshot())
    }

    /// キャッシュを捨てて次回に取り直させる
    pub fn invalidate_locals(&mut self) {
        self.annotations.local_variables = None;
    }

    /// 現時点の変数をコピーしたバインディング（初回だけ複製する）
    pub fn dupped_binding(&mut self) -> &BindingRef {
        let binding = &self.binding;
        self.annotations
            .dupped_binding
            .get_or_insert_with(|| binding.dup())
    }
}

impl fmt::Display for FrameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:in '{}'",
            self.location.path,
            self.display_line(),
            self.location.label
        )
    }
}
