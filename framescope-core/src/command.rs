//! デバッガコマンド

use crate::parse::parse_frame_index;

/// バックトレースに適用するフィルタ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktraceFilter {
    /// 設定された接頭辞を使う
    Configured,
    /// フィルタなし
    All,
    /// 指定した接頭辞で除外する
    Prefix(String),
}

/// メソッド定義トラッキングの操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    On,
    Off,
    Status,
}

/// デバッガコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// バックトレース表示（フレームをキャプチャし直す）
    Backtrace(BacktraceFilter),
    /// フレーム詳細表示
    Frame(usize),
    /// ローカル変数表示（省略時は先頭フレーム）
    Locals(Option<usize>),
    /// スタックの深さ表示
    Depth,
    /// メソッド定義トラッキング
    Track(TrackAction),
    /// 記録したメソッド定義の一覧
    Methods,
    /// ラベルが正規表現にマッチするフレームを検索
    Find(String),
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match parts[0] {
            "backtrace" | "bt" => match parts.get(1) {
                None => Some(Command::Backtrace(BacktraceFilter::Configured)),
                Some(&"all") | Some(&"-a") => Some(Command::Backtrace(BacktraceFilter::All)),
                Some(prefix) => Some(Command::Backtrace(BacktraceFilter::Prefix(prefix.to_string()))),
            },
            "frame" | "f" => parts
                .get(1)
                .and_then(|s| parse_frame_index(s).ok())
                .map(Command::Frame),
            "locals" | "l" => match parts.get(1) {
                None => Some(Command::Locals(None)),
                Some(s) => parse_frame_index(s).ok().map(|n| Command::Locals(Some(n))),
            },
            "depth" => Some(Command::Depth),
            "track" => match parts.get(1).copied() {
                Some("on") => Some(Command::Track(TrackAction::On)),
                Some("off") => Some(Command::Track(TrackAction::Off)),
                Some("status") | None => Some(Command::Track(TrackAction::Status)),
                _ => None,
            },
            "methods" => Some(Command::Methods),
            "find" => {
                if parts.len() > 1 {
                    Some(Command::Find(parts[1..].join(" ")))
                } else {
                    None
                }
            }
            "help" | "h" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}
