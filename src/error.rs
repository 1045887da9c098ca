// src/error.rs
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::component::LoadError;

/// ルートレジストリの操作で発生するエラー
#[derive(Debug, Error)]
pub enum RegistryError {
    /// 空のパス、または解釈できないパスパターン (登録時に検出)
    #[error("invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// 同じ name を持つルートが既に存在する
    #[error("route name '{name}' is already used by '{existing}'")]
    DuplicateName { name: String, existing: String },

    /// どのルートにもマッチしない
    #[error("no route matches '{path}'")]
    NotFound { path: String },

    /// リダイレクトが循環している、またはホップ上限を超えた
    #[error("redirect loop while resolving '{path}': {}", chain.join(" -> "))]
    RedirectCycle { path: String, chain: Vec<String> },

    /// コンポーネントの遅延読み込みに失敗した
    #[error("failed to load component for '{path}'")]
    ComponentLoad {
        path: String,
        #[source]
        cause: Arc<LoadError>,
    },

    #[error("route '{path}' has no component")]
    NoComponent { path: String },

    #[error("no route is named '{name}'")]
    UnknownName { name: String },

    #[error("route '{name}' requires parameter '{param}'")]
    MissingParam { name: String, param: String },

    #[error("value '{value}' does not satisfy parameter '{param}' of route '{name}'")]
    InvalidParam {
        name: String,
        param: String,
        value: String,
    },
}

impl RegistryError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// ルートモジュール (.ts / .json) の読み込み・解析エラー
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("syntax error in {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    /// 構文としては正しいが、ルート定義として解釈できない形
    #[error("unsupported route definition in {}: {message}", path.display())]
    Shape { path: PathBuf, message: String },

    #[error("invalid JSON route module {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
