// src/main.rs

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use vue_route_registry::config::{Cli, Command, init_tracing};
use vue_route_registry::{
    FormRules, ModuleResolver, RouteDef, RouteRegistry, discover_route_modules,
    parse_routes_in_file,
};

/// `resolve` / `load` の出力
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    path: &'a str,
    full_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a str>,
    params: &'a std::collections::BTreeMap<String, String>,
    redirected_from: &'a [String],
    matched: Vec<&'a str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) CLI 引数をパースし、ログを初期化
    let mut cli = Cli::parse();
    init_tracing(&cli.log);

    if let Command::LoginRules { username, password } = &cli.command {
        return login_rules(username.as_deref(), password.as_deref());
    }

    cli.project_root = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("project root {} not found", cli.project_root.display()))?;

    // 2) ルートモジュールを探索して解析
    let modules_dir = cli.modules_path();
    let modules = discover_route_modules(&modules_dir)?;
    if modules.is_empty() {
        anyhow::bail!("no route modules found in {}", modules_dir.display());
    }

    let mut definitions: Vec<(std::path::PathBuf, Vec<RouteDef>)> = Vec::new();
    for module in modules {
        let routes = parse_routes_in_file(&module)?;
        definitions.push((module, routes));
    }

    if cli.command == Command::Routes {
        let all: Vec<&RouteDef> = definitions.iter().flat_map(|(_, defs)| defs).collect();
        return print_json(&all);
    }

    // 3) モジュールごとにレジストリへ登録
    let resolver = ModuleResolver::new(&cli.project_root, cli.aliases.clone());
    let mut registry = RouteRegistry::new();
    for (module, routes) in definitions {
        registry
            .register(routes.into_iter().map(|def| def.into_node(&resolver)))
            .with_context(|| format!("failed to register routes from {}", module.display()))?;
    }
    info!(routes = registry.len(), "route registry ready");

    // 4) サブコマンドを実行
    match &cli.command {
        Command::Menu => print_json(&registry.menu_projection()),
        Command::KeepAlive => print_json(&registry.keep_alive_names()),
        Command::Resolve { path } => {
            let resolved = registry.resolve(path)?;
            print_json(&report(path, &resolved))
        }
        Command::Load { path } => {
            let resolved = registry.resolve(path)?;
            let view = registry.load_component(resolved.route.id()).await?;
            print_json(&*view)
        }
        Command::Routes | Command::LoginRules { .. } => Ok(()),
    }
}

fn report<'a>(path: &'a str, resolved: &'a vue_route_registry::Resolved<'a>) -> ResolveReport<'a> {
    ResolveReport {
        path,
        full_path: resolved.route.full_path(),
        name: resolved.route.name(),
        component: resolved.route.component().map(|c| c.specifier()),
        params: &resolved.params,
        redirected_from: &resolved.redirected_from,
        matched: resolved.matched.iter().map(|r| r.full_path()).collect(),
    }
}

fn login_rules(username: Option<&str>, password: Option<&str>) -> anyhow::Result<()> {
    let rules = FormRules::login();
    print_json(&rules)?;

    if username.is_none() && password.is_none() {
        return Ok(());
    }
    let mut form = HashMap::new();
    if let Some(username) = username {
        form.insert("username", username);
    }
    if let Some(password) = password {
        form.insert("password", password);
    }
    if let Err(violations) = rules.validate(&form, None) {
        print_json(&violations)?;
        anyhow::bail!("login form has {} invalid field(s)", violations.len());
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
