//! Naming and template helpers shared by every compile strategy

use super::ir::{Block, Expr, Stmt};
use crate::binding::Argument;
use std::collections::BTreeSet;

/// Hex characters of the digest kept in generated names
pub const DEFAULT_HASH_LENGTH: usize = 16;
pub const MIN_HASH_LENGTH: usize = 8;
pub const MAX_HASH_LENGTH: usize = 64;

/// Local holding a service while extenders run
pub const RESOLVED: &str = "resolved";

/// Stable hex digest prefix of `input`.
///
/// The digest depends on `input` alone, so a method name never changes
/// because of unrelated edits elsewhere in the graph.
pub fn hashed_value(input: &str, length: usize) -> String {
    let length = length.clamp(MIN_HASH_LENGTH, MAX_HASH_LENGTH);
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex().as_str()[..length].to_string()
}

/// `get` + hash of the id
#[inline]
pub fn method_name(id: &str, length: usize) -> String {
    format!("get{}", hashed_value(id, length))
}

/// Name of the proxy class generated for a lazy service
#[inline]
pub fn proxy_class_name(class: &str) -> String {
    format!("{}Proxy_{}", short_name(class), hashed_value(class, DEFAULT_HASH_LENGTH))
}

/// Key of the private instance of an invokable class.
///
/// Bindings that pass arguments to the class get an instance of their own,
/// keyed by a digest of those arguments.
pub fn private_key(class: &str, arguments: &[(String, Argument)]) -> String {
    if arguments.is_empty() {
        return class.to_string();
    }
    format!("{class}#{}", hashed_value(&format!("{arguments:?}"), DEFAULT_HASH_LENGTH))
}

/// Last path segment of a class name, for `\` and `::` separators
pub fn short_name(class: &str) -> &str {
    let tail = class.rsplit('\\').next().unwrap_or(class);
    tail.rsplit("::").next().unwrap_or(tail)
}

/// snake_case local name derived from a class name
pub fn variable_name_for(class: &str) -> String {
    let mut name = String::new();
    for (i, ch) in short_name(class).chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !name.ends_with('_') {
                name.push('_');
            }
            name.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }

    let name = name.trim_end_matches('_');
    match name.chars().next() {
        None => "service".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{name}"),
        Some(_) => name.to_string(),
    }
}

/// First name not in `used`, bumping a numeric suffix: `mailer`, `mailer1`, `mailer2`...
pub fn next_available_variable_name(name: &str, used: &BTreeSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }

    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut suffix: u64 = name[base.len()..].parse().map_or(1, |n: u64| n + 1);
    loop {
        let candidate = format!("{base}{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Wrap a base construction with the extender chain and the shared cache.
///
/// A plain service returns its base expression directly. Otherwise the value
/// is bound to `resolved`, each extender reassigns it in registration order,
/// a shared service is cached, and `resolved` is returned.
pub fn compile_extend(id: &str, base: Expr, extenders: usize, shared: bool) -> Vec<Stmt> {
    if extenders == 0 && !shared {
        return vec![Stmt::Return(base)];
    }

    let mut stmts = vec![Stmt::Let {
        name: RESOLVED.to_string(),
        mutable: extenders > 0,
        value: base,
    }];
    stmts.extend((0..extenders).map(|index| Stmt::Assign {
        name: RESOLVED.to_string(),
        value: Expr::Extend {
            id: id.to_string(),
            index,
            value: Box::new(Expr::Var(RESOLVED.to_string())),
        },
    }));
    if shared {
        stmts.push(Stmt::Share {
            id: id.to_string(),
            name: RESOLVED.to_string(),
        });
    }
    stmts.push(Stmt::Return(Expr::Var(RESOLVED.to_string())));
    stmts
}

/// Block returning `expr` after `prelude`
pub fn block_returning(mut prelude: Vec<Stmt>, expr: Expr) -> Block {
    prelude.push(Stmt::Return(expr));
    Block::new(prelude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_clamped() {
        assert_eq!(hashed_value("mailer", 16), hashed_value("mailer", 16));
        assert_ne!(hashed_value("mailer", 16), hashed_value("mailer2", 16));
        assert_eq!(hashed_value("mailer", 4).len(), MIN_HASH_LENGTH);
        assert_eq!(hashed_value("mailer", 100).len(), MAX_HASH_LENGTH);
        assert!(hashed_value("mailer", 32).starts_with(&hashed_value("mailer", 16)));
    }

    #[test]
    fn test_method_name_is_identifier() {
        let name = method_name("App\\Mailer", DEFAULT_HASH_LENGTH);
        assert!(name.starts_with("get"));
        assert_eq!(name.len(), 3 + DEFAULT_HASH_LENGTH);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_proxy_class_name() {
        let name = proxy_class_name("App\\Report\\Monthly");
        assert!(name.starts_with("MonthlyProxy_"));
    }

    #[test]
    fn test_private_key_depends_on_arguments() {
        let ada = [("name".to_string(), Argument::from("ada"))];
        let bob = [("name".to_string(), Argument::from("bob"))];

        assert_eq!(private_key("Greeter", &[]), "Greeter");
        assert!(private_key("Greeter", &ada).starts_with("Greeter#"));
        assert_eq!(private_key("Greeter", &ada), private_key("Greeter", &ada));
        assert_ne!(private_key("Greeter", &ada), private_key("Greeter", &bob));
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(variable_name_for("App\\HttpClient"), "http_client");
        assert_eq!(variable_name_for("app::db::Pool"), "pool");
        assert_eq!(variable_name_for("3d"), "_3d");
        assert_eq!(variable_name_for(""), "service");
    }

    #[test]
    fn test_next_available_variable_name() {
        let mut used = BTreeSet::new();
        assert_eq!(next_available_variable_name("mailer", &used), "mailer");

        used.insert("mailer".to_string());
        assert_eq!(next_available_variable_name("mailer", &used), "mailer1");

        used.insert("mailer1".to_string());
        assert_eq!(next_available_variable_name("mailer", &used), "mailer2");
        assert_eq!(next_available_variable_name("mailer1", &used), "mailer2");
    }

    #[test]
    fn test_compile_extend_templates() {
        assert_eq!(compile_extend("a", Expr::Int(1), 0, false), vec![Stmt::Return(Expr::Int(1))]);

        let shared = compile_extend("a", Expr::Int(1), 0, true);
        assert_eq!(shared.len(), 3);
        assert!(matches!(&shared[0], Stmt::Let { mutable: false, .. }));
        assert!(matches!(&shared[1], Stmt::Share { .. }));

        let extended = compile_extend("a", Expr::Int(1), 2, false);
        assert_eq!(extended.len(), 4);
        assert!(matches!(&extended[2], Stmt::Assign { value: Expr::Extend { index: 1, .. }, .. }));
    }
}
