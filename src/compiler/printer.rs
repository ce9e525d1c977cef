//! Rust source printer for compiled artifacts
//!
//! The generated module declares one free function per service plus a
//! [`GeneratedContainer`](crate::GeneratedContainer) table, and loads into a
//! [`CompiledContainer`](crate::CompiledContainer) with `load(runtime)`.
//! Output depends on the artifact alone and is byte-identical across runs.

use super::ir::{Block, CompiledArtifact, Expr, Method, Stmt};
use crate::value::{ArrayKey, Value};

const INDENT: &str = "    ";

/// Render the artifact as a Rust module
pub fn render(artifact: &CompiledArtifact) -> String {
    let mut out = String::new();
    out.push_str("// @generated by service-container. Do not edit.\n\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str(
        "use service_container::{ArrayKey, CompiledContainer, Container, GeneratedContainer, MethodFn, Result, Value};\n\n",
    );
    render_table(&mut out, artifact);

    for method in artifact.methods.values() {
        out.push('\n');
        render_method(&mut out, method);
    }
    out
}

fn render_table(out: &mut String, artifact: &CompiledArtifact) {
    out.push_str("pub static CONTAINER: GeneratedContainer = GeneratedContainer {\n");
    out.push_str(&format!("{INDENT}name: {:?},\n", artifact.container_name));

    out.push_str(&format!("{INDENT}method_mapping: &[\n"));
    for (id, name) in &artifact.method_mapping {
        out.push_str(&format!("{INDENT}{INDENT}({id:?}, {name:?}),\n"));
    }
    out.push_str(&format!("{INDENT}],\n"));

    out.push_str(&format!("{INDENT}methods: &[\n"));
    for name in artifact.methods.keys() {
        out.push_str(&format!("{INDENT}{INDENT}({name:?}, {name} as MethodFn),\n"));
    }
    out.push_str(&format!("{INDENT}],\n"));

    for (field, ids) in [
        ("removed_ids", &artifact.removed_ids),
        ("synthetic_ids", &artifact.synthetic_ids),
        ("uninitialized_services", &artifact.uninitialized_services),
    ] {
        let list: Vec<String> = ids.iter().map(|id| format!("{id:?}")).collect();
        out.push_str(&format!("{INDENT}{field}: &[{}],\n", list.join(", ")));
    }
    out.push_str(&format!("{INDENT}parameters,\n"));
    out.push_str("};\n");
    out.push('\n');

    out.push_str("fn parameters() -> Vec<(&'static str, Value)> {\n");
    out.push_str(&format!("{INDENT}vec![\n"));
    for (name, value) in &artifact.parameters {
        out.push_str(&format!("{INDENT}{INDENT}({name:?}, {}),\n", value_source(value)));
    }
    out.push_str(&format!("{INDENT}]\n"));
    out.push_str("}\n");
    out.push('\n');

    out.push_str("/// Compiled container backed by `runtime` for closures, classes and synthetic ids\n");
    out.push_str("pub fn load(runtime: Container) -> CompiledContainer {\n");
    out.push_str(&format!("{INDENT}CompiledContainer::from_generated(&CONTAINER, runtime)\n"));
    out.push_str("}\n");
}

fn render_method(out: &mut String, method: &Method) {
    out.push_str(&format!("/// Service {:?}{}\n", method.id, if method.shared { ", shared" } else { "" }));
    out.push_str(&format!("fn {}(c: &CompiledContainer) -> Result<Value> {{\n", method.name));
    render_block(out, &method.body, 1);
    out.push_str("}\n");
}

fn render_block(out: &mut String, block: &Block, depth: usize) {
    let pad = INDENT.repeat(depth);
    for stmt in &block.stmts {
        match stmt {
            Stmt::Let { name, mutable, value } => {
                let kw = if *mutable { "let mut" } else { "let" };
                out.push_str(&format!("{pad}{kw} {name} = {};\n", expr_source(value, depth)));
            }
            Stmt::Assign { name, value } => {
                out.push_str(&format!("{pad}{name} = {};\n", expr_source(value, depth)));
            }
            Stmt::Share { id, name } => {
                out.push_str(&format!("{pad}let {name} = c.share({id:?}, {name});\n"));
            }
            Stmt::Return(expr) => {
                out.push_str(&format!("{pad}Ok({})\n", moved(expr, depth)));
            }
        }
    }
}

/// Locals are moved where they are last used, cloned elsewhere
fn moved(expr: &Expr, depth: usize) -> String {
    match expr {
        Expr::Var(name) => name.clone(),
        other => expr_source(other, depth),
    }
}

fn expr_source(expr: &Expr, depth: usize) -> String {
    match expr {
        Expr::Null => "Value::Null".to_string(),
        Expr::Bool(b) => format!("Value::Bool({b})"),
        Expr::Int(i) => format!("Value::Int({i})"),
        Expr::Float(x) => format!("Value::Float({})", float_source(*x)),
        Expr::Str(s) => format!("Value::from({s:?})"),
        Expr::Array(entries) => {
            let items: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("({}, {})", key_source(key), expr_source(value, depth)))
                .collect();
            format!("Value::Array(vec![{}])", items.join(", "))
        }
        Expr::Var(name) => format!("{name}.clone()"),
        Expr::Service(id) => format!("c.get({id:?})?"),
        Expr::Parameter(name) => format!("c.parameter({name:?})?"),
        Expr::Instance(id) => format!("c.instance({id:?})?"),
        Expr::Factory(id) => format!("c.factory({id:?})?"),
        Expr::New { class, args } => {
            let args: Vec<String> = args.iter().map(|a| expr_source(a, depth)).collect();
            format!("c.construct({class:?}, vec![{}])?", args.join(", "))
        }
        Expr::Invoke { class, method, target } => {
            format!("c.invoke({class:?}, {method:?}, &{})?", expr_source(target, depth))
        }
        Expr::Private { key, init } => {
            format!("c.private({key:?}, |c| {})?", closure_body(init, depth))
        }
        Expr::Proxy { class, proxy_class, init } => {
            format!("c.proxy({class:?}, {proxy_class:?}, |c| {})", closure_body(init, depth))
        }
        Expr::Extend { id, index, value } => {
            format!("c.extend({id:?}, {index}, {})?", moved(value, depth))
        }
    }
}

fn closure_body(block: &Block, depth: usize) -> String {
    let mut body = String::from("{\n");
    render_block(&mut body, block, depth + 1);
    body.push_str(&INDENT.repeat(depth));
    body.push('}');
    body
}

fn key_source(key: &ArrayKey) -> String {
    match key {
        ArrayKey::Index(i) => format!("ArrayKey::Index({i})"),
        ArrayKey::Name(name) => format!("ArrayKey::from({name:?})"),
    }
}

fn float_source(x: f64) -> String {
    if x.is_nan() {
        "f64::NAN".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "f64::INFINITY" } else { "f64::NEG_INFINITY" }.to_string()
    } else {
        format!("{x:?}")
    }
}

/// Source of a literal value; live values never reach the printer
fn value_source(value: &Value) -> String {
    match Expr::literal(value) {
        Some(expr) => expr_source(&expr, 0),
        None => "Value::Null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::helper;

    fn method(id: &str, body: Vec<Stmt>) -> Method {
        Method {
            name: helper::method_name(id, helper::DEFAULT_HASH_LENGTH),
            id: id.to_string(),
            shared: false,
            body: Block::new(body),
        }
    }

    #[test]
    fn test_expr_source() {
        assert_eq!(expr_source(&Expr::Str("a\"b".into()), 0), r#"Value::from("a\"b")"#);
        assert_eq!(expr_source(&Expr::Float(1.0), 0), "Value::Float(1.0)");
        assert_eq!(expr_source(&Expr::Float(f64::NAN), 0), "Value::Float(f64::NAN)");
        assert_eq!(
            expr_source(
                &Expr::Array(vec![(ArrayKey::from("a"), Expr::Int(1)), (ArrayKey::Index(0), Expr::Null)]),
                0
            ),
            r#"Value::Array(vec![(ArrayKey::from("a"), Value::Int(1)), (ArrayKey::Index(0), Value::Null)])"#
        );
        assert_eq!(
            expr_source(&Expr::New { class: "Mailer".into(), args: vec![Expr::Var("logger".into())] }, 0),
            r#"c.construct("Mailer", vec![logger.clone()])?"#
        );
    }

    #[test]
    fn test_render_method_with_extenders() {
        let mut artifact = CompiledArtifact {
            container_name: "Test".into(),
            ..Default::default()
        };
        let m = method("n", helper::compile_extend("n", Expr::Int(0), 1, true));
        artifact.method_mapping.insert("n".into(), m.name.clone());
        artifact.methods.insert(m.name.clone(), m.clone());

        let source = render(&artifact);
        let body = format!(
            "fn {}(c: &CompiledContainer) -> Result<Value> {{\n    let mut resolved = Value::Int(0);\n    resolved = c.extend(\"n\", 0, resolved)?;\n    let resolved = c.share(\"n\", resolved);\n    Ok(resolved)\n}}\n",
            m.name
        );
        assert!(source.contains(&body), "{source}");
        assert!(source.contains(&format!("(\"n\", {:?}),", m.name)));
    }

    #[test]
    fn test_render_nested_block() {
        let expr = Expr::Proxy {
            class: "Report".into(),
            proxy_class: "ReportProxy_x".into(),
            init: Block::new(vec![Stmt::Return(Expr::New { class: "Report".into(), args: vec![] })]),
        };
        assert_eq!(
            expr_source(&expr, 1),
            "c.proxy(\"Report\", \"ReportProxy_x\", |c| {\n        Ok(c.construct(\"Report\", vec![])?)\n    })"
        );
    }
}
