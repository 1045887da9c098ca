use swc_common::{sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::*;
use swc_ecma_parser::{lexer::Lexer, Parser as SwcParser, StringInput, Syntax, TsConfig};
use swc_ecma_visit::{Visit, VisitWith};
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ModuleError;
use crate::model::{RouteDef, RouteMeta};

/// 識別子参照を辿る深さの上限 (`const a = b; const b = a;` 対策)
const MAX_ALIAS_DEPTH: usize = 8;

/// モジュール全体をトラバースして、ルート定義の材料を集める Visitor
#[derive(Default)]
struct ModuleVisitor {
    /// 変数名 → 初期化式 (例: `const Layout = () => import("@/layout/index.vue")`)
    bindings: HashMap<String, Expr>,
    /// default import のローカル名 → 指定子 (例: `import Layout from "@/layout/index.vue"`)
    imports: HashMap<String, String>,
    /// `export default` の式
    default_export: Option<Expr>,
}

impl Visit for ModuleVisitor {
    fn visit_import_decl(&mut self, import: &ImportDecl) {
        for specifier in &import.specifiers {
            if let ImportSpecifier::Default(ImportDefaultSpecifier { local, .. }) = specifier {
                self.imports
                    .insert(local.sym.to_string(), import.src.value.to_string());
            }
        }
    }

    fn visit_var_decl(&mut self, var_decl: &VarDecl) {
        for declarator in &var_decl.decls {
            if let (Pat::Ident(BindingIdent { id, .. }), Some(init)) =
                (&declarator.name, &declarator.init)
            {
                self.bindings.insert(id.sym.to_string(), (**init).clone());
            }
        }

        // 子ノードも訪問
        var_decl.visit_children_with(self);
    }

    fn visit_export_default_expr(&mut self, export: &ExportDefaultExpr) {
        self.default_export = Some((*export.expr).clone());
        export.visit_children_with(self);
    }
}

/// 集めた材料から RouteDef を組み立てる
struct RouteExtractor<'a> {
    file: &'a Path,
    module: &'a ModuleVisitor,
}

impl<'a> RouteExtractor<'a> {
    fn shape(&self, message: impl Into<String>) -> ModuleError {
        ModuleError::Shape {
            path: self.file.to_path_buf(),
            message: message.into(),
        }
    }

    /// 括弧・satisfies・as・const 変数参照をはがした式を返す
    fn unwrap_expr(&self, mut expr: &'a Expr) -> Result<&'a Expr, ModuleError> {
        let mut depth = 0;
        loop {
            expr = match expr {
                Expr::Paren(ParenExpr { expr: inner, .. })
                | Expr::TsSatisfies(TsSatisfiesExpr { expr: inner, .. })
                | Expr::TsAs(TsAsExpr { expr: inner, .. })
                | Expr::TsConstAssertion(TsConstAssertion { expr: inner, .. }) => &**inner,
                Expr::Ident(ident) => {
                    depth += 1;
                    if depth > MAX_ALIAS_DEPTH {
                        return Err(self.shape(format!("'{}' refers to itself", ident.sym)));
                    }
                    match self.module.bindings.get(&*ident.sym) {
                        Some(bound) => bound,
                        None => return Ok(expr),
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    /// ルートオブジェクト、またはその配列 (スプレッド可) からルートを取り出す
    fn routes_from_expr(&self, expr: &'a Expr) -> Result<Vec<RouteDef>, ModuleError> {
        match self.unwrap_expr(expr)? {
            Expr::Array(arr_lit) => {
                let mut routes = Vec::with_capacity(arr_lit.elems.len());
                // `...otherRoutes` のスプレッドも同じく展開される
                for elem in arr_lit.elems.iter().flatten() {
                    routes.extend(self.routes_from_expr(&elem.expr)?);
                }
                Ok(routes)
            }
            Expr::Object(obj_lit) => Ok(vec![self.route_from_object(obj_lit)?]),
            Expr::Ident(ident) => Err(self.shape(format!(
                "'{}' is not a route object or array defined in this module",
                ident.sym
            ))),
            _ => Err(self.shape("expected a route object or an array of routes")),
        }
    }

    /// ObjectLit (例: `{ path: "/login", component: () => import("…") }`) を RouteDef にする
    fn route_from_object(&self, obj_lit: &'a ObjectLit) -> Result<RouteDef, ModuleError> {
        let mut route = RouteDef::new(String::new());
        let mut has_path = false;

        for prop in &obj_lit.props {
            let PropOrSpread::Prop(boxed_prop) = prop else {
                return Err(self.shape("spread inside a route object is not supported"));
            };
            let (key, value) = match &**boxed_prop {
                Prop::KeyValue(KeyValueProp { key, value }) => (self.prop_name(key)?, &**value),
                // `{ component }` のような省略記法
                Prop::Shorthand(ident) => {
                    let key = ident.sym.to_string();
                    if key == "component" {
                        if let Some(specifier) = self.module.imports.get(&key) {
                            route.component = Some(specifier.clone());
                            continue;
                        }
                    }
                    match self.module.bindings.get(&key) {
                        Some(bound) => (key, bound),
                        None => {
                            return Err(
                                self.shape(format!("'{key}' is not defined in this module"))
                            );
                        }
                    }
                }
                _ => {
                    debug!(
                        file = %self.file.display(),
                        "ignoring method or accessor in route object"
                    );
                    continue;
                }
            };

            match key.as_str() {
                "path" => {
                    route.path = self.string(value, "path")?;
                    has_path = true;
                }
                "name" => route.name = Some(self.string(value, "name")?),
                "redirect" => route.redirect = Some(self.string(value, "redirect")?),
                "component" => route.component = Some(self.import_specifier(value, 0)?),
                "meta" => route.meta = self.meta(value)?,
                "children" => route.children = self.routes_from_expr(value)?,
                other => {
                    debug!(file = %self.file.display(), key = other, "ignoring route property");
                }
            }
        }

        if !has_path {
            return Err(self.shape("route object without a path"));
        }
        Ok(route)
    }

    fn prop_name(&self, key: &PropName) -> Result<String, ModuleError> {
        match key {
            PropName::Ident(ident) => Ok(ident.sym.to_string()),
            PropName::Str(Str { value, .. }) => Ok(value.to_string()),
            _ => Err(self.shape("computed or numeric keys are not supported in routes")),
        }
    }

    fn string(&self, expr: &'a Expr, field: &str) -> Result<String, ModuleError> {
        match self.unwrap_expr(expr)? {
            Expr::Lit(Lit::Str(Str { value, .. })) => Ok(value.to_string()),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => Ok(tpl
                .quasis
                .iter()
                .map(|quasi| quasi.raw.to_string())
                .collect()),
            _ => Err(self.shape(format!("'{field}' must be a string literal"))),
        }
    }

    /// `() => import("x")`、`() => import("x").then(...)`、それを束縛した変数、
    /// または default import された識別子から指定子を取り出す
    fn import_specifier(&self, expr: &'a Expr, depth: usize) -> Result<String, ModuleError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(self.shape("component reference is nested too deeply"));
        }
        match expr {
            Expr::Paren(ParenExpr { expr: inner, .. })
            | Expr::TsAs(TsAsExpr { expr: inner, .. })
            | Expr::TsSatisfies(TsSatisfiesExpr { expr: inner, .. })
            | Expr::Await(AwaitExpr { arg: inner, .. }) => self.import_specifier(inner, depth),
            Expr::Ident(ident) => {
                if let Some(specifier) = self.module.imports.get(&*ident.sym) {
                    return Ok(specifier.clone());
                }
                match self.module.bindings.get(&*ident.sym) {
                    Some(bound) => self.import_specifier(bound, depth + 1),
                    None => Err(self.shape(format!(
                        "component '{}' is not defined in this module",
                        ident.sym
                    ))),
                }
            }
            Expr::Arrow(ArrowExpr { body, .. }) => match &**body {
                BlockStmtOrExpr::Expr(body) => self.import_specifier(body, depth),
                BlockStmtOrExpr::BlockStmt(block) => {
                    for stmt in &block.stmts {
                        if let Stmt::Return(ReturnStmt { arg: Some(arg), .. }) = stmt {
                            return self.import_specifier(arg, depth);
                        }
                    }
                    Err(self.shape("component factory does not return an import"))
                }
            },
            Expr::Call(call) => match &call.callee {
                Callee::Import(_) => match call.args.first().map(|arg| &*arg.expr) {
                    Some(Expr::Lit(Lit::Str(Str { value, .. }))) => Ok(value.to_string()),
                    _ => Err(self.shape("import() must take a string literal")),
                },
                // import("x").then(m => m.X)
                Callee::Expr(callee) => match &**callee {
                    Expr::Member(MemberExpr { obj, .. }) => self.import_specifier(obj, depth),
                    _ => Err(self.shape("component must be a lazy `() => import(...)` factory")),
                },
                Callee::Super(_) => {
                    Err(self.shape("component must be a lazy `() => import(...)` factory"))
                }
            },
            _ => Err(self.shape("component must be a lazy `() => import(...)` factory")),
        }
    }

    /// meta オブジェクトを JSON に落としてから RouteMeta に変換する
    fn meta(&self, expr: &'a Expr) -> Result<RouteMeta, ModuleError> {
        let value = match self.unwrap_expr(expr)? {
            Expr::Object(obj_lit) => self.object_to_json(obj_lit, 0)?,
            _ => return Err(self.shape("'meta' must be an object literal")),
        };
        serde_json::from_value(value).map_err(|e| self.shape(format!("invalid meta: {e}")))
    }

    fn object_to_json(&self, obj_lit: &'a ObjectLit, depth: usize) -> Result<Value, ModuleError> {
        let mut map = Map::new();
        for prop in &obj_lit.props {
            let PropOrSpread::Prop(boxed_prop) = prop else {
                return Err(self.shape("spread inside meta is not supported"));
            };
            let (key, value) = match &**boxed_prop {
                Prop::KeyValue(KeyValueProp { key, value }) => {
                    (self.prop_name(key)?, self.literal_to_json(value, depth + 1)?)
                }
                Prop::Shorthand(ident) => (
                    ident.sym.to_string(),
                    self.ident_to_json(ident, depth + 1)?,
                ),
                _ => continue,
            };
            match value {
                Some(value) => {
                    map.insert(key, value);
                }
                None => debug!(
                    file = %self.file.display(),
                    key = %key,
                    "skipping non-literal meta value"
                ),
            }
        }
        Ok(Value::Object(map))
    }

    fn ident_to_json(&self, ident: &'a Ident, depth: usize) -> Result<Option<Value>, ModuleError> {
        if let Some(bound) = self.module.bindings.get(&*ident.sym) {
            return self.literal_to_json(bound, depth);
        }
        // import されたアイコンコンポーネントなどはローカル名で表す
        Ok(self
            .module
            .imports
            .contains_key(&*ident.sym)
            .then(|| Value::String(ident.sym.to_string())))
    }

    /// リテラル式を JSON 値にする。表現できない式 (関数など) は None
    fn literal_to_json(&self, expr: &'a Expr, depth: usize) -> Result<Option<Value>, ModuleError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(self.shape("meta is nested too deeply"));
        }
        let value = match self.unwrap_expr(expr)? {
            Expr::Lit(Lit::Str(Str { value, .. })) => Value::String(value.to_string()),
            Expr::Lit(Lit::Num(Number { value, .. })) => number(*value),
            Expr::Lit(Lit::Bool(Bool { value, .. })) => Value::Bool(*value),
            Expr::Lit(Lit::Null(_)) => Value::Null,
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => Value::String(
                tpl.quasis.iter().map(|quasi| quasi.raw.to_string()).collect(),
            ),
            Expr::Unary(UnaryExpr {
                op: UnaryOp::Minus,
                arg,
                ..
            }) => match &**arg {
                Expr::Lit(Lit::Num(Number { value, .. })) => number(-*value),
                _ => return Ok(None),
            },
            Expr::Array(arr_lit) => {
                let mut values = Vec::with_capacity(arr_lit.elems.len());
                for elem in arr_lit.elems.iter().flatten() {
                    if let Some(value) = self.literal_to_json(&elem.expr, depth + 1)? {
                        values.push(value);
                    }
                }
                Value::Array(values)
            }
            Expr::Object(obj_lit) => self.object_to_json(obj_lit, depth + 1)?,
            Expr::Ident(ident) => return self.ident_to_json(ident, depth + 1),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// 整数値は整数として扱う (rank を i32 で受けるため)
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonModule {
    Many(Vec<RouteDef>),
    One(Box<RouteDef>),
}

/// ルートモジュールを解析して、トップレベルのルート定義を返す。
///
/// - `.json`: ルートオブジェクト、またはその配列
/// - それ以外 (`.ts` / `.js`): `export default` された式
pub fn parse_routes_in_file(file_path: &Path) -> Result<Vec<RouteDef>, ModuleError> {
    debug!(file = %file_path.display(), "parsing route module");

    let src = fs::read_to_string(file_path).map_err(|source| ModuleError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;

    let mut routes = match file_path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json_module(file_path, &src)?,
        _ => parse_script_module(file_path, src)?,
    };
    for route in &mut routes {
        route.set_source_file(file_path);
    }

    info!(file = %file_path.display(), routes = routes.len(), "parsed route module");
    Ok(routes)
}

fn parse_json_module(file_path: &Path, src: &str) -> Result<Vec<RouteDef>, ModuleError> {
    let module: JsonModule = serde_json::from_str(src).map_err(|source| ModuleError::Json {
        path: file_path.to_path_buf(),
        source,
    })?;
    Ok(match module {
        JsonModule::Many(routes) => routes,
        JsonModule::One(route) => vec![*route],
    })
}

fn parse_script_module(file_path: &Path, src: String) -> Result<Vec<RouteDef>, ModuleError> {
    let cm: Lrc<SourceMap> = Default::default();

    let fm = cm.new_source_file(FileName::Real(file_path.to_path_buf()), src);

    // TypeScript構文でパースする設定
    let syntax = Syntax::Typescript(TsConfig {
        tsx: false,
        decorators: true,
        dts: false,
        no_early_errors: true,
        disallow_ambiguous_jsx_like: true,
    });

    let lexer = Lexer::new(
        syntax,
        Default::default(), // es version
        StringInput::from(&*fm),
        None,
    );

    let mut parser = SwcParser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| ModuleError::Syntax {
        path: file_path.to_path_buf(),
        message: format!("{:?}", e.kind()),
    })?;

    let mut visitor = ModuleVisitor::default();
    visitor.visit_module(&module);

    debug!(
        file = %file_path.display(),
        bindings = visitor.bindings.len(),
        imports = visitor.imports.len(),
        "collected module bindings"
    );

    let Some(default_export) = &visitor.default_export else {
        return Err(ModuleError::Shape {
            path: file_path.to_path_buf(),
            message: "module has no default export".to_string(),
        });
    };

    let extractor = RouteExtractor {
        file: file_path,
        module: &visitor,
    };
    extractor.routes_from_expr(default_export)
}
