use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "price-matcher")]
#[command(about = "資材明細と価格表の照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（デフォルト: ~/.config/price-matcher/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 資材リストを価格表と照合してJSONを出力
    Match {
        /// 資材ファイル（JSON / CSV / Excel）
        #[arg(required = true)]
        materials: PathBuf,

        /// 価格表ファイル（指定時はメモリ内インデックス、省略時はElasticsearch）
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// 出力JSONファイル（デフォルト: 資材ファイルと同じ場所の match_result.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// スコア閾値（0-100）
        #[arg(short, long)]
        threshold: Option<f64>,

        /// 資材ごとの最大候補数
        #[arg(short = 'n', long)]
        max_results: Option<usize>,

        /// 並列ワーカー数
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// 同義語プリセット (electrical/none)
        #[arg(long)]
        preset: Option<String>,

        /// カスタム同義語ファイル（JSON）
        #[arg(long)]
        synonyms: Option<PathBuf>,

        /// このスコア以上の候補だけを別ファイルに出力
        #[arg(long)]
        exact_threshold: Option<f64>,
    },

    /// 品名1件で価格表を検索し、上位の候補を表示（閾値なし）
    Search {
        /// 資材の品名
        #[arg(required = true)]
        name: String,

        /// 価格表ファイル（指定時はメモリ内インデックス、省略時はElasticsearch）
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// 表示する候補数
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// 機器コード・品番
        #[arg(long)]
        code: Option<String>,

        /// 製造元
        #[arg(long)]
        manufacturer: Option<String>,
    },

    /// 照合結果JSONの統計を表示
    Stats {
        /// 照合結果JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 資材ごとの最良候補も表示
        #[arg(short, long)]
        details: bool,
    },

    /// 2つの文字列の類似度を表示
    Compare {
        #[arg(required = true)]
        first: String,

        #[arg(required = true)]
        second: String,

        /// 同義語プリセット (electrical/none)
        #[arg(long)]
        preset: Option<String>,
    },

    /// Elasticsearchへの接続を確認
    Check,

    /// 設定を表示/保存
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 現在の設定（既定値を含む）をファイルに書き出す
        #[arg(long)]
        init: bool,
    },
}
