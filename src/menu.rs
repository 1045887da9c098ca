// src/menu.rs
use serde::Serialize;

use crate::registry::RouteRecord;

/// ナビゲーションメニューの 1 項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    /// 親パスを連結したフルパス
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuEntry>,
}

impl MenuEntry {
    pub(crate) fn from_record(record: &RouteRecord, children: Vec<MenuEntry>) -> Self {
        MenuEntry {
            path: record.full_path().to_string(),
            name: record.name().map(str::to_string),
            title: record.meta().title.clone(),
            icon: record.meta().icon.clone(),
            rank: record.meta().rank,
            children,
        }
    }
}

/// 同じ階層の並び替えキー。rank 昇順、rank なしは後ろ。
/// `sort_by_key` は安定ソートなので同順位は登録順のまま。
pub(crate) fn rank_key(record: &RouteRecord) -> (bool, Option<i32>) {
    (record.meta().rank.is_none(), record.meta().rank)
}
