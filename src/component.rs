// src/component.rs
//! 遅延コンポーネント (`component: () => import("...")`) のモデル。
//!
//! ルートが参照するビューはナビゲーション時に初めて読み込まれる。
//! ここではその「遅延ファクトリ」を [`ComponentFactory`] トレイトとして表現し、
//! ファイルを非同期に読むだけの実装 [`FileComponent`] を用意する。

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// 読み込みが完了したビュー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    /// import 指定子 (例: "@/views/monitor/index.vue")
    pub specifier: String,
    /// 実体のファイル (ファイル以外から生成された場合は None)
    pub location: Option<PathBuf>,
    /// ビューのソース
    pub source: String,
}

/// ファクトリが返す読み込みエラー
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module '{specifier}' does not resolve to a file")]
    Unresolved { specifier: String },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

pub type ViewFuture = BoxFuture<'static, Result<View, LoadError>>;

/// 呼び出されるたびにビューを非同期に生成するファクトリ。
///
/// 同時呼び出しの合流やキャッシュはレジストリ側の責務なので、
/// 実装は毎回素直に読み込みを行えばよい。
pub trait ComponentFactory: Send + Sync {
    fn load(&self) -> ViewFuture;
}

impl<F, Fut> ComponentFactory for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<View, LoadError>> + Send + 'static,
{
    fn load(&self) -> ViewFuture {
        Box::pin(self())
    }
}

/// ルートノードが保持するコンポーネント参照
#[derive(Clone)]
pub struct ComponentRef {
    specifier: String,
    factory: Arc<dyn ComponentFactory>,
}

impl ComponentRef {
    pub fn new(specifier: impl Into<String>, factory: impl ComponentFactory + 'static) -> Self {
        ComponentRef {
            specifier: specifier.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// ファクトリを 1 回起動する (合流はしない)
    pub fn invoke(&self) -> ViewFuture {
        self.factory.load()
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("specifier", &self.specifier)
            .finish_non_exhaustive()
    }
}

/// 指定子から [`ComponentRef`] を作る側 (モジュールリゾルバなど)
pub trait ComponentSource {
    /// `importer` は指定子が書かれていたファイル (相対指定子の基準)
    fn component(&self, specifier: &str, importer: Option<&Path>) -> ComponentRef;
}

/// ディスク上のファイルを読むだけのファクトリ
#[derive(Debug, Clone)]
pub struct FileComponent {
    specifier: String,
    location: Option<PathBuf>,
}

impl FileComponent {
    pub fn new(specifier: impl Into<String>, location: Option<PathBuf>) -> Self {
        FileComponent {
            specifier: specifier.into(),
            location,
        }
    }
}

impl ComponentFactory for FileComponent {
    fn load(&self) -> ViewFuture {
        let specifier = self.specifier.clone();
        let location = self.location.clone();
        Box::pin(async move {
            // 解決できなかった指定子は読み込み時に失敗させる (動的 import と同じ挙動)
            let Some(path) = location else {
                return Err(LoadError::Unresolved { specifier });
            };
            debug!(specifier = %specifier, path = %path.display(), "reading view module");
            let source = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?;
            Ok(View {
                specifier,
                location: Some(path),
                source,
            })
        })
    }
}
