// src/config.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::resolver::Alias;

/// CLI 引数定義
#[derive(Parser, Debug)]
#[command(
    name = "vue-route-registry",
    version,
    about = "Vue プロジェクトのルートモジュールを読み込み、ルート解決・メニュー生成を行う CLI ツール"
)]
pub struct Cli {
    /// 解析対象の Vue プロジェクトルート
    /// 例: `--project-root C:/path/to/my-admin`
    #[arg(short = 'r', long = "project-root", value_name = "DIR", env = "VUE_ROUTES_PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// ルートモジュールのディレクトリ (プロジェクトルートからの相対パス)
    #[arg(
        long = "modules-dir",
        value_name = "DIR",
        default_value = "src/router/modules",
        env = "VUE_ROUTES_MODULES_DIR"
    )]
    pub modules_dir: PathBuf,

    /// import 指定子の別名 (複数指定可)
    #[arg(long = "alias", value_name = "PREFIX=DIR", default_value = "@=src")]
    pub aliases: Vec<Alias>,

    /// RUST_LOG が未設定のときのログレベル
    #[arg(long = "log", value_name = "FILTER", default_value = "warn", env = "VUE_ROUTES_LOG")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 読み込んだルート定義を JSON で出力する
    Routes,
    /// メニュー射影を JSON で出力する
    Menu,
    /// パスを解決して一致したルートを表示する
    Resolve { path: String },
    /// パスを解決し、そのルートのビューを読み込む
    Load { path: String },
    /// keepAlive 対象のルート名を出力する
    KeepAlive,
    /// ログインフォームのルールを出力し、値が与えられていれば検証する
    LoginRules {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
}

impl Cli {
    pub fn modules_path(&self) -> PathBuf {
        self.project_root.join(&self.modules_dir)
    }
}

/// ログ出力を初期化する。標準出力は JSON 用なのでログは stderr に出す。
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
