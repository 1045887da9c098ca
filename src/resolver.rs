use path_absolutize::Absolutize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;
use walkdir::WalkDir;

use crate::component::{ComponentRef, ComponentSource, FileComponent};
use crate::error::ModuleError;

/// 拡張子なしの指定子に試す拡張子
const EXTENSIONS: [&str; 4] = ["vue", "ts", "tsx", "js"];

/// import 指定子の別名 (例: `@=src` なら "@/views/x.vue" → "<root>/src/views/x.vue")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub prefix: String,
    pub target: PathBuf,
}

impl Alias {
    /// "@/x" は "@" に一致するが、"@iconify/x" のようなパッケージ名には一致しない
    fn matches(&self, specifier: &str) -> bool {
        match specifier.strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }
}

impl FromStr for Alias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((prefix, target)) if !prefix.is_empty() && !target.is_empty() => Ok(Alias {
                prefix: prefix.to_string(),
                target: PathBuf::from(target),
            }),
            _ => Err(format!("expected PREFIX=DIR, got '{s}'")),
        }
    }
}

/// ルートモジュールのディレクトリを再帰的に探索し、
/// .ts / .js / .json ファイル (.d.ts を除く) をパス順に返す
pub fn discover_route_modules(dir: &Path) -> Result<Vec<PathBuf>, ModuleError> {
    let mut modules = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|source| ModuleError::Walk {
            root: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(fname) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if fname.ends_with(".d.ts") {
            continue;
        }
        if matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("ts" | "js" | "json")
        ) {
            modules.push(path.to_path_buf());
        }
    }

    // 重複を除去
    modules.sort();
    modules.dedup();
    debug!(dir = %dir.display(), modules = modules.len(), "discovered route modules");
    Ok(modules)
}

/// import 指定子を実ファイルに解決するリゾルバ
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    project_root: PathBuf,
    aliases: Vec<Alias>,
}

impl ModuleResolver {
    pub fn new(project_root: impl Into<PathBuf>, aliases: Vec<Alias>) -> Self {
        ModuleResolver {
            project_root: project_root.into(),
            aliases,
        }
    }

    /// `specifier` に対応するファイルを探す。
    ///
    /// - `importer`: その指定子が書かれていたファイル (相対指定子の基準)
    ///
    /// 戻り値:
    /// - Ok(Some(path)) → 見つかったファイルの絶対パス
    /// - Ok(None)       → 見つからなかった (パッケージ指定子も含む)
    pub fn resolve_specifier(
        &self,
        specifier: &str,
        importer: Option<&Path>,
    ) -> std::io::Result<Option<PathBuf>> {
        // 1) 別名 → 相対 → ルート基準の順に基準パスを決める
        let base = if let Some(alias) = self
            .aliases
            .iter()
            .find(|alias| alias.matches(specifier))
        {
            let rest = specifier[alias.prefix.len()..].trim_start_matches('/');
            self.project_root.join(&alias.target).join(rest)
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            match importer.and_then(Path::parent) {
                Some(dir) => dir.join(specifier),
                None => self.project_root.join(specifier),
            }
        } else if let Some(rooted) = specifier.strip_prefix('/') {
            // Vite と同じく `/` 始まりはプロジェクトルート基準
            self.project_root.join(rooted)
        } else {
            return Ok(None);
        };

        // 2) 典型的なファイル名パターンを列挙
        let mut candidates = vec![base.clone()];
        for ext in EXTENSIONS {
            let mut with_ext = base.clone().into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            candidates.push(PathBuf::from(with_ext));
        }
        for ext in EXTENSIONS {
            candidates.push(base.join(format!("index.{ext}")));
        }

        // 3) 絶対パス化し、最初に存在するファイルを返却
        for cand in candidates {
            let abs = cand.absolutize()?.to_path_buf();
            if fs::metadata(&abs).map(|m| m.is_file()).unwrap_or(false) {
                return Ok(Some(abs));
            }
        }

        Ok(None)
    }
}

impl ComponentSource for ModuleResolver {
    fn component(&self, specifier: &str, importer: Option<&Path>) -> ComponentRef {
        let location = match self.resolve_specifier(specifier, importer) {
            Ok(location) => location,
            Err(e) => {
                debug!(specifier, error = %e, "failed to absolutize specifier");
                None
            }
        };
        if location.is_none() {
            debug!(specifier, "component specifier does not resolve to a file yet");
        }
        ComponentRef::new(specifier, FileComponent::new(specifier, location))
    }
}
