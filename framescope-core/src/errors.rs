//! エラーメッセージ定数

/// まだフレームをキャプチャしていない場合のエラーメッセージ
pub const ERR_NO_CAPTURE: &str = "No frames captured; run 'bt' first";

/// フレームが見つからない場合のエラーメッセージ
pub const ERR_FRAME_NOT_FOUND: &str = "Frame not found";

/// トラッカーが作成されていない場合のエラーメッセージ
pub const ERR_TRACKER_NOT_CREATED: &str = "Method definition tracking has not been started";
