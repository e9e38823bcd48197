//! ログ出力の初期化（tracing + tracing-subscriber）

use tracing_subscriber::{fmt, EnvFilter};

/// ログを初期化
///
/// `RUST_LOG` が設定されていればそれを使い、なければ `info`（`verbose` 時は `debug`）。
/// 出力先は標準エラー（標準出力は結果表示に使う）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "price_matcher=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_line_number(verbose)
        .try_init();
}

/// テスト用（出力はテストハーネスが取り込む）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
