// src/registry.rs
//! ルートレジストリ本体。
//!
//! ルートは起動時にモジュール単位でまとめて登録され、その後は読み取り専用になる。
//! ノードはアリーナ (`Vec<RouteRecord>`) に深さ優先の前順で並び、
//! [`RouteId`] はそのインデックス。コンポーネント読み込みの合流キャッシュも
//! 同じインデックスで引く。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::component::{ComponentRef, View};
use crate::error::RegistryError;
use crate::loader::LoadSlots;
use crate::menu::{self, MenuEntry};
use crate::model::{RouteMeta, RouteNode};
use crate::pattern::{self, PathPattern};

/// リダイレクトを辿る最大回数
pub const MAX_REDIRECT_HOPS: usize = 16;

/// アリーナ内のルートを指す ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteId(usize);

impl RouteId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 登録済みのルート
#[derive(Debug, Clone)]
pub struct RouteRecord {
    id: RouteId,
    path: String,
    pattern: PathPattern,
    name: Option<String>,
    component: Option<ComponentRef>,
    redirect: Option<String>,
    meta: RouteMeta,
    parent: Option<RouteId>,
    children: Vec<RouteId>,
}

impl RouteRecord {
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// 定義に書かれたままのパス
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 親のパスを連結したフルパス
    pub fn full_path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn meta(&self) -> &RouteMeta {
        &self.meta
    }

    pub fn parent(&self) -> Option<RouteId> {
        self.parent
    }

    pub fn children(&self) -> &[RouteId] {
        &self.children
    }
}

/// `resolve` の結果
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub route: &'a RouteRecord,
    /// パスパラメータ (キャッチオールは `/` 区切りのまま)
    pub params: BTreeMap<String, String>,
    /// 辿ったリダイレクト元のパス (古い順)
    pub redirected_from: Vec<String>,
    /// ルートから一致ノードまでの系譜 (レイアウトのネスト・パンくず用)
    pub matched: Vec<&'a RouteRecord>,
}

/// ルートフォレストを所有するレジストリ
pub struct RouteRegistry {
    records: Vec<RouteRecord>,
    roots: Vec<RouteId>,
    names: HashMap<String, RouteId>,
    slots: LoadSlots,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        RouteRegistry {
            records: Vec::new(),
            roots: Vec::new(),
            names: HashMap::new(),
            slots: LoadSlots::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 登録順 (深さ優先の前順) に全ルートを返す
    pub fn records(&self) -> impl Iterator<Item = &RouteRecord> {
        self.records.iter()
    }

    pub fn roots(&self) -> &[RouteId] {
        &self.roots
    }

    pub fn get(&self, id: RouteId) -> Option<&RouteRecord> {
        self.records.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Result<&RouteRecord, RegistryError> {
        self.names
            .get(name)
            .map(|id| &self.records[id.0])
            .ok_or_else(|| RegistryError::UnknownName {
                name: name.to_string(),
            })
    }

    /// ルートツリーの束を登録する。
    ///
    /// 束のどこかでエラーになった場合、レジストリは一切変更されない。
    /// 戻り値は束のトップレベルノードの ID。
    pub fn register(
        &mut self,
        nodes: impl IntoIterator<Item = RouteNode>,
    ) -> Result<Vec<RouteId>, RegistryError> {
        let mut batch = Batch {
            offset: self.records.len(),
            records: Vec::new(),
            names: HashMap::new(),
            existing: &self.names,
            existing_records: &self.records,
        };

        let mut roots = Vec::new();
        for node in nodes {
            roots.push(batch.add(node, None)?);
        }

        let Batch { records, names, .. } = batch;
        let added = records.len();
        self.names.extend(names);
        self.records.extend(records);
        self.roots.extend(&roots);
        self.slots.grow_to(self.records.len());

        info!(
            roots = roots.len(),
            routes = added,
            total = self.records.len(),
            "registered routes"
        );
        Ok(roots)
    }

    /// パスに一致するルートを返す。リダイレクトは辿った先を返す。
    pub fn resolve(&self, path: &str) -> Result<Resolved<'_>, RegistryError> {
        let mut target = path.to_string();
        let mut redirected_from = Vec::new();
        let mut visited = HashSet::new();

        loop {
            let (id, params) = self
                .match_path(&target)
                .ok_or_else(|| RegistryError::NotFound {
                    path: target.clone(),
                })?;
            let route = &self.records[id.0];

            let Some(next) = route.redirect() else {
                debug!(
                    path = %path,
                    matched = route.full_path(),
                    hops = redirected_from.len(),
                    "resolved route"
                );
                return Ok(Resolved {
                    route,
                    params,
                    redirected_from,
                    matched: self.lineage(id),
                });
            };

            if !visited.insert(id) || redirected_from.len() >= MAX_REDIRECT_HOPS {
                redirected_from.push(target);
                warn!(path = %path, chain = ?redirected_from, "redirect loop detected");
                return Err(RegistryError::RedirectCycle {
                    path: path.to_string(),
                    chain: redirected_from,
                });
            }
            debug!(from = %target, to = next, "following redirect");
            redirected_from.push(std::mem::replace(&mut target, next.to_string()));
        }
    }

    /// リダイレクトを辿らずに最も優先度の高いルートを探す
    fn match_path(&self, path: &str) -> Option<(RouteId, BTreeMap<String, String>)> {
        let segments = pattern::split_path(path);
        let mut best: Option<(pattern::Specificity, RouteId, BTreeMap<String, String>)> = None;

        for record in &self.records {
            let Some(params) = record.pattern.matches(&segments) else {
                continue;
            };
            let score = record.pattern.specificity();
            // 同点は先に登録されたルートを優先する
            if best.as_ref().is_none_or(|(top, _, _)| score > *top) {
                best = Some((score, record.id, params));
            }
        }
        best.map(|(_, id, params)| (id, params))
    }

    fn lineage(&self, id: RouteId) -> Vec<&RouteRecord> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let record = &self.records[current.0];
            chain.push(record);
            cursor = record.parent;
        }
        chain.reverse();
        chain
    }

    /// メニュー表示用の射影。showLink=false のノードは子孫ごと除外する。
    pub fn menu_projection(&self) -> Vec<MenuEntry> {
        self.project_level(&self.roots)
    }

    fn project_level(&self, ids: &[RouteId]) -> Vec<MenuEntry> {
        let mut visible: Vec<&RouteRecord> = ids
            .iter()
            .map(|id| &self.records[id.0])
            .filter(|record| record.meta.show_link)
            .collect();
        visible.sort_by_key(|record| menu::rank_key(record));
        visible
            .into_iter()
            .map(|record| MenuEntry::from_record(record, self.project_level(&record.children)))
            .collect()
    }

    /// keepAlive が有効な名前付きルート (深さ優先順)
    pub fn keep_alive_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.meta.keep_alive)
            .filter_map(|record| record.name())
            .collect()
    }

    /// 名前付きルートのパスをパラメータから組み立てる
    pub fn url_for(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, RegistryError> {
        let record = self.by_name(name)?;
        record
            .pattern
            .build(params)
            .map_err(|(param, value)| match value {
                Some(value) => RegistryError::InvalidParam {
                    name: name.to_string(),
                    param,
                    value,
                },
                None => RegistryError::MissingParam {
                    name: name.to_string(),
                    param,
                },
            })
    }

    /// ルートのコンポーネントを読み込む。
    ///
    /// 同じルートへの同時呼び出しはファクトリ 1 回に合流する。keepAlive のルートは
    /// 読み込んだビューを使い回す。失敗はキャッシュされないので、呼び出し側は
    /// ナビゲーションをやり直せばよい。
    pub async fn load_component(&self, id: RouteId) -> Result<Arc<View>, RegistryError> {
        let record = self.get(id).ok_or_else(|| RegistryError::NotFound {
            path: format!("#{}", id.index()),
        })?;
        let component = record
            .component
            .as_ref()
            .ok_or_else(|| RegistryError::NoComponent {
                path: record.full_path().to_string(),
            })?;

        self.slots
            .load(id.index(), component, record.meta.keep_alive)
            .await
            .map_err(|cause| {
                warn!(path = record.full_path(), error = %cause, "component load failed");
                RegistryError::ComponentLoad {
                    path: record.full_path().to_string(),
                    cause,
                }
            })
    }
}

/// 登録中の束。確定するまで既存のレジストリには触れない。
struct Batch<'r> {
    offset: usize,
    records: Vec<RouteRecord>,
    names: HashMap<String, RouteId>,
    existing: &'r HashMap<String, RouteId>,
    existing_records: &'r [RouteRecord],
}

impl Batch<'_> {
    fn add(&mut self, node: RouteNode, parent: Option<RouteId>) -> Result<RouteId, RegistryError> {
        if node.path.is_empty() {
            return Err(RegistryError::invalid_path(&node.path, "path is empty"));
        }
        let full_path = match parent {
            Some(parent) => pattern::join_paths(self.record(parent).full_path(), &node.path),
            None => node.path.clone(),
        };
        let pattern = PathPattern::parse(&full_path)?;

        let id = RouteId(self.offset + self.records.len());
        if let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) {
            if let Some(other) = self.existing.get(name).or_else(|| self.names.get(name)) {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                    existing: self.record(*other).full_path().to_string(),
                });
            }
            self.names.insert(name.to_string(), id);
        }

        self.records.push(RouteRecord {
            id,
            path: node.path,
            pattern,
            name: node.name.filter(|n| !n.is_empty()),
            component: node.component,
            redirect: node.redirect,
            meta: node.meta,
            parent,
            children: Vec::new(),
        });

        let mut children = Vec::with_capacity(node.children.len());
        for child in node.children {
            children.push(self.add(child, Some(id))?);
        }
        self.records[id.0 - self.offset].children = children;
        Ok(id)
    }

    fn record(&self, id: RouteId) -> &RouteRecord {
        if id.0 < self.offset {
            &self.existing_records[id.0]
        } else {
            &self.records[id.0 - self.offset]
        }
    }
}
