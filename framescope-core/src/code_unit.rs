//! 実行単位の情報取得

use framescope_host::{CodeUnit, CodeUnitKind};

/// 無名の仮引数として扱う名前
const ANONYMOUS_PARAMS: [&str; 3] = ["*", "**", "&"];

/// 実行単位に対する問い合わせ
pub trait CodeUnitExt {
    /// 実行単位の種類
    fn unit_type(&self) -> CodeUnitKind;

    /// 名前付き仮引数の一覧（無名の `*` `**` `&` は除く）
    fn parameter_symbols(&self) -> Vec<String>;

    /// 定義の開始行
    fn first_line(&self) -> u32;

    /// 定義の終了行
    fn last_line(&self) -> u32;

    /// 行がこの実行単位の範囲内かどうか
    fn covers_line(&self, line: u32) -> bool {
        self.first_line() <= line && line <= self.last_line()
    }
}

impl CodeUnitExt for CodeUnit {
    fn unit_type(&self) -> CodeUnitKind {
        self.kind()
    }

    fn parameter_symbols(&self) -> Vec<String> {
        self.parameters()
            .iter()
            .filter_map(|p| p.name.as_deref())
            .filter(|name| !ANONYMOUS_PARAMS.contains(name))
            .map(str::to_string)
            .collect()
    }

    fn first_line(&self) -> u32 {
        self.code_location().0
    }

    fn last_line(&self) -> u32 {
        self.code_location().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framescope_host::{ParamKind, Parameter};

    #[test]
    fn test_parameter_symbols_skip_anonymous() {
        let unit = CodeUnit::builder("call", CodeUnitKind::Method)
            .param(Parameter::new(ParamKind::Req, "a"))
            .param(Parameter::new(ParamKind::Opt, "b"))
            .param(Parameter::new(ParamKind::Rest, "*"))
            .param(Parameter::new(ParamKind::KeyReq, "key"))
            .param(Parameter::new(ParamKind::KeyRest, "**"))
            .param(Parameter::unnamed(ParamKind::NoKey))
            .param(Parameter::new(ParamKind::Block, "&"))
            .build();
        assert_eq!(unit.parameter_symbols(), vec!["a", "b", "key"]);
    }

    #[test]
    fn test_named_rest_is_kept() {
        let unit = CodeUnit::builder("call", CodeUnitKind::Block)
            .param(Parameter::new(ParamKind::Rest, "args"))
            .param(Parameter::new(ParamKind::Block, "blk"))
            .build();
        assert_eq!(unit.parameter_symbols(), vec!["args", "blk"]);
        assert_eq!(unit.unit_type(), CodeUnitKind::Block);
    }

    #[test]
    fn test_code_location() {
        let unit = CodeUnit::builder("run", CodeUnitKind::Method)
            .lines(12, 30)
            .build();
        assert_eq!(unit.first_line(), 12);
        assert_eq!(unit.last_line(), 30);
        assert!(unit.covers_line(12));
        assert!(!unit.covers_line(31));
    }
}
