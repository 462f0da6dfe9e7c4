//! ソース位置

use std::fmt;
use std::rc::Rc;

/// バックトレース上のソース位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub lineno: u32,
    /// メソッド名やブロック名などのラベル
    pub label: String,
}

/// ソース位置への共有参照
pub type LocationRef = Rc<Location>;

impl Location {
    pub fn new(path: impl Into<String>, lineno: u32, label: impl Into<String>) -> LocationRef {
        Rc::new(Self {
            path: path.into(),
            lineno,
            label: label.into(),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:in '{}'", self.path, self.lineno, self.label)
    }
}
