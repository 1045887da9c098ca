// src/pattern.rs
//! ルートパスパターンのコンパイルとマッチング。
//!
//! 対応する書式:
//! - 静的セグメント: `/monitor/index`
//! - パラメータ: `/user/:id`、正規表現付き `/user/:id(\d+)`、省略可能 `/user/:id?`
//! - キャッチオール (末尾のみ): `/redirect/:path(.*)`, `/:all(.*)*`, `/:rest*`, `/:rest+`, `/*`

use regex::Regex;
use std::collections::BTreeMap;

use crate::error::RegistryError;

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Param {
        name: String,
        constraint: Option<Regex>,
        optional: bool,
    },
    /// 残りのセグメントを `min` 個以上まとめて捕捉する
    CatchAll {
        name: String,
        constraint: Option<Regex>,
        min: usize,
    },
}

/// マッチ候補の優先度。大きいほど優先される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    exact: bool,
    statics: usize,
    segments: usize,
}

/// コンパイル済みのパスパターン
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// 絶対パスのパターンをコンパイルする
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        if raw.is_empty() {
            return Err(RegistryError::invalid_path(raw, "path is empty"));
        }
        let Some(body) = raw.strip_prefix('/') else {
            return Err(RegistryError::invalid_path(raw, "path must start with '/'"));
        };
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        if !body.is_empty() {
            for part in body.split('/') {
                if part.is_empty() {
                    return Err(RegistryError::invalid_path(raw, "empty path segment"));
                }
                segments.push(parse_segment(raw, part)?);
            }
        }

        let catch_alls = segments
            .iter()
            .position(|s| matches!(s, Segment::CatchAll { .. }));
        if let Some(index) = catch_alls {
            if index + 1 != segments.len() {
                return Err(RegistryError::invalid_path(
                    raw,
                    "catch-all parameter must be the last segment",
                ));
            }
        }

        let mut names = Vec::new();
        for segment in &segments {
            if let Segment::Param { name, .. } | Segment::CatchAll { name, .. } = segment {
                if names.contains(&name) {
                    return Err(RegistryError::invalid_path(
                        raw,
                        format!("parameter '{name}' appears twice"),
                    ));
                }
                names.push(name);
            }
        }

        Ok(PathPattern {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll { .. }))
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            exact: !self.is_catch_all(),
            statics: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Static(_)))
                .count(),
            segments: self.segments.len(),
        }
    }

    /// 分割済みのリクエストパスとマッチさせ、パラメータを返す
    pub fn matches(&self, path: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        match_segments(&self.segments, path, &mut params).then_some(params)
    }

    /// パラメータを埋めて具体的なパスを組み立てる。
    /// 足りないパラメータ名、または制約違反を `Err((param, value))` で返す。
    pub fn build(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<String, (String, Option<String>)> {
        let mut parts: Vec<&str> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Static(text) => parts.push(text),
                Segment::Param {
                    name,
                    constraint,
                    optional,
                } => match params.get(name).filter(|v| !v.is_empty()) {
                    Some(value) => {
                        if value.contains('/') || !satisfies(constraint, value) {
                            return Err((name.clone(), Some(value.clone())));
                        }
                        parts.push(value);
                    }
                    None if *optional => {}
                    None => return Err((name.clone(), None)),
                },
                Segment::CatchAll {
                    name,
                    constraint,
                    min,
                } => {
                    let value = params.get(name).map(String::as_str).unwrap_or("");
                    let pieces: Vec<&str> = value.split('/').filter(|p| !p.is_empty()).collect();
                    if pieces.len() < *min {
                        return Err((name.clone(), None));
                    }
                    if !pieces.iter().all(|p| satisfies(constraint, p)) {
                        return Err((name.clone(), Some(value.to_string())));
                    }
                    parts.extend(pieces);
                }
            }
        }
        Ok(format!("/{}", parts.join("/")))
    }
}

/// リクエストパスをセグメントに分割する (クエリ・ハッシュは除去)
pub fn split_path(path: &str) -> Vec<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

/// 子ルートのパスを親のフルパスに連結する。`/` で始まる子は絶対パス扱い。
pub fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        child.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}

fn satisfies(constraint: &Option<Regex>, value: &str) -> bool {
    constraint.as_ref().is_none_or(|re| re.is_match(value))
}

fn match_segments(
    pattern: &[Segment],
    path: &[&str],
    params: &mut BTreeMap<String, String>,
) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    match head {
        Segment::Static(text) => {
            path.first() == Some(&text.as_str()) && match_segments(rest, &path[1..], params)
        }
        Segment::Param {
            name,
            constraint,
            optional,
        } => {
            if let Some(value) = path.first() {
                if satisfies(constraint, value) {
                    params.insert(name.clone(), (*value).to_string());
                    if match_segments(rest, &path[1..], params) {
                        return true;
                    }
                    params.remove(name);
                }
            }
            *optional && match_segments(rest, path, params)
        }
        Segment::CatchAll {
            name,
            constraint,
            min,
        } => {
            if path.len() < *min || !path.iter().all(|p| satisfies(constraint, p)) {
                return false;
            }
            params.insert(name.clone(), path.join("/"));
            true
        }
    }
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment, RegistryError> {
    if part == "*" {
        return Ok(Segment::CatchAll {
            name: "pathMatch".to_string(),
            constraint: None,
            min: 0,
        });
    }

    let Some(param) = part.strip_prefix(':') else {
        if part.contains([':', '(', ')', '*']) {
            return Err(RegistryError::invalid_path(
                raw,
                format!("segment '{part}' mixes static text and parameter syntax"),
            ));
        }
        return Ok(Segment::Static(part.to_string()));
    };

    // 1) パラメータ名
    let name_end = param
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(param.len());
    let name = &param[..name_end];
    if name.is_empty() {
        return Err(RegistryError::invalid_path(raw, "parameter without a name"));
    }
    let mut rest = &param[name_end..];

    // 2) 括弧内の正規表現
    let mut regex_src = None;
    if rest.starts_with('(') {
        let close = closing_paren(rest).ok_or_else(|| {
            RegistryError::invalid_path(raw, format!("unbalanced parentheses in '{part}'"))
        })?;
        regex_src = Some(&rest[1..close]);
        rest = &rest[close + 1..];
    }

    // 3) 修飾子 (?, *, +)
    let modifier = match rest {
        "" => None,
        "?" | "*" | "+" => rest.chars().next(),
        other => {
            return Err(RegistryError::invalid_path(
                raw,
                format!("unexpected '{other}' after parameter '{name}'"),
            ));
        }
    };

    let wildcard_regex = matches!(regex_src, Some(".*") | Some(".+"));
    let constraint = match regex_src {
        Some(src) if !wildcard_regex => Some(
            Regex::new(&format!("^(?:{src})$")).map_err(|e| {
                RegistryError::invalid_path(raw, format!("invalid regex for '{name}': {e}"))
            })?,
        ),
        _ => None,
    };

    let name = name.to_string();
    let segment = match modifier {
        Some('*') => Segment::CatchAll {
            name,
            constraint,
            min: 0,
        },
        Some('+') => Segment::CatchAll {
            name,
            constraint,
            min: 1,
        },
        _ if wildcard_regex => Segment::CatchAll {
            name,
            constraint: None,
            min: usize::from(regex_src == Some(".+") && modifier != Some('?')),
        },
        optional => Segment::Param {
            name,
            constraint,
            optional: optional == Some('?'),
        },
    };
    Ok(segment)
}

/// `(` で始まる文字列の対応する `)` の位置
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
