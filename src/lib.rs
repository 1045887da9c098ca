//! Vue 管理画面のルートテーブルを扱うライブラリ。
//!
//! - [`RouteRegistry`]: ルートフォレストの登録・パス解決・メニュー射影・遅延コンポーネント読み込み
//! - [`parse_routes_in_file`]: `src/router/modules/*.ts` などのルートモジュールを読み込む
//! - [`ModuleResolver`]: `@/views/...` のような import 指定子を実ファイルに解決する
//! - [`FormRules`]: ログインフォームの検証ルール

pub mod component;
pub mod config;
pub mod error;
mod loader;
pub mod menu;
pub mod model;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod rules;

pub use component::{ComponentFactory, ComponentRef, ComponentSource, LoadError, View};
pub use error::{ModuleError, RegistryError};
pub use menu::MenuEntry;
pub use model::{RouteDef, RouteMeta, RouteNode};
pub use parser::parse_routes_in_file;
pub use registry::{MAX_REDIRECT_HOPS, Resolved, RouteId, RouteRecord, RouteRegistry};
pub use resolver::{Alias, ModuleResolver, discover_route_modules};
pub use rules::{FieldRule, FieldViolation, FormRules, Trigger};
