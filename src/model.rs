// src/model.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::component::{ComponentRef, ComponentSource};

/// ルートの meta 情報 (メニュー表示・キャッシュ制御)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    /// メニュー・ページタイトル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// メニューアイコンの識別子
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// メニューの並び順 (小さいほど前)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,

    /// メニューに表示するか
    #[serde(default = "default_true")]
    pub show_link: bool,

    /// ビューをキャッシュするか
    #[serde(default)]
    pub keep_alive: bool,

    /// 上記以外のキーはそのまま保持する
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl Default for RouteMeta {
    fn default() -> Self {
        RouteMeta {
            title: None,
            icon: None,
            rank: None,
            show_link: true,
            keep_alive: false,
            extra: BTreeMap::new(),
        }
    }
}

/// ルートモジュールから読み取った宣言的なルート定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDef {
    /// ルートのパス (例: "/monitor", "/redirect/:path(.*)")
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 遅延 import の指定子
    /// 例: `() => import("@/views/monitor/index.vue")` なら "@/views/monitor/index.vue"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    #[serde(default)]
    pub meta: RouteMeta,

    /// 子ルート (children) があれば再帰的に格納
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteDef>,

    /// このルート定義が書かれているソースファイル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
}

impl RouteDef {
    pub fn new(path: impl Into<String>) -> Self {
        RouteDef {
            path: path.into(),
            name: None,
            component: None,
            redirect: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
            source_file: None,
        }
    }

    /// 子孫すべての source_file を設定する
    pub fn set_source_file(&mut self, file: &std::path::Path) {
        self.source_file = Some(file.to_path_buf());
        for child in &mut self.children {
            child.set_source_file(file);
        }
    }

    /// 指定子を `source` でコンポーネント参照に変換し、登録可能なノードにする
    pub fn into_node(self, source: &dyn ComponentSource) -> RouteNode {
        let component = self
            .component
            .as_deref()
            .map(|specifier| source.component(specifier, self.source_file.as_deref()));
        RouteNode {
            path: self.path,
            name: self.name,
            component,
            redirect: self.redirect,
            meta: self.meta,
            children: self
                .children
                .into_iter()
                .map(|child| child.into_node(source))
                .collect(),
        }
    }
}

/// レジストリに登録するルートノード
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub path: String,
    pub name: Option<String>,
    pub component: Option<ComponentRef>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        RouteNode {
            path: path.into(),
            name: None,
            component: None,
            redirect: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }

    pub fn redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.meta.icon = Some(icon.into());
        self
    }

    pub fn rank(mut self, rank: i32) -> Self {
        self.meta.rank = Some(rank);
        self
    }

    pub fn show_link(mut self, show: bool) -> Self {
        self.meta.show_link = show;
        self
    }

    pub fn keep_alive(mut self, keep: bool) -> Self {
        self.meta.keep_alive = keep;
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }
}
