//! Synthesis of the harness crate root that turns the source tree into one binary.
//!
//! The harness mounts every unit by absolute `#[path]` inside a module tree
//! mirroring the source directories, defines the `Probe` capability the units
//! implement, and answers the verifier's line protocol on stdin/stdout.

use super::request::CompileUnit;
use crate::builder::snake_ident;
use crate::error::{AppError, AppResult};
use crate::manifest::{Registry, RegistryEntry};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::{BTreeMap, HashSet};
use std::path::Component;

/// Module names the harness root must not take: they would shadow the extern prelude.
const RESERVED_ROOT_MODULES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

/// A rendered harness and the registry of what it can construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harness {
    /// Formatted crate root.
    pub source: String,
    /// Types reachable through the harness' `new` request.
    pub registry: Registry,
}

#[derive(Debug, Default)]
struct ModuleNode {
    children: BTreeMap<String, ModuleNode>,
    files: Vec<usize>,
}

/// Renders the crate root for `units`.
///
/// Qualified names are registered once; a later unit with the same qualified name
/// is still compiled but cannot be constructed by name.
pub fn render(units: &[CompileUnit]) -> AppResult<Harness> {
    let mut root = ModuleNode::default();
    for (index, unit) in units.iter().enumerate() {
        let mut node = &mut root;
        if let Some(parent) = unit.relative.parent() {
            for component in parent.components() {
                if let Component::Normal(dir) = component {
                    node = node
                        .children
                        .entry(dir.to_string_lossy().into_owned())
                        .or_default();
                }
            }
        }
        node.files.push(index);
    }

    let mut mounted = Vec::new();
    let reserved = RESERVED_ROOT_MODULES.iter().map(|s| s.to_string()).collect();
    let modules = render_node(&root, units, &[], reserved, &mut mounted)?;
    mounted.sort_by_key(|(index, _)| *index);

    let mut registry = Registry::default();
    let mut seen = HashSet::new();
    let mut arms = Vec::new();
    for (index, module_path) in mounted {
        let unit = &units[index];
        if !seen.insert(unit.qualified_name.clone()) {
            tracing::warn!(
                "{} is defined by more than one unit; {} will not be constructible",
                unit.qualified_name,
                unit.relative.display()
            );
            continue;
        }
        let ty = type_path(&module_path, &unit.type_name)?;
        let key = &unit.qualified_name;
        arms.push(quote! {
            #key => Some((
                Box::new(<#ty as Probe>::construct()) as Box<dyn Probe>,
                <#ty as Probe>::mutators(),
            )),
        });
        registry.types.push(RegistryEntry {
            type_name: unit.type_name.clone(),
            qualified_name: unit.qualified_name.clone(),
            schema: unit.schema.clone(),
            mutators: unit.mutators.clone(),
        });
    }

    let runtime = runtime();
    let crate_root = quote! {
        #![allow(warnings)]

        #runtime

        #modules

        fn lookup(name: &str) -> Option<(Box<dyn Probe>, &'static [Mutator])> {
            match name {
                #(#arms)*
                _ => None,
            }
        }
    };

    let file: syn::File = syn::parse2(crate_root)
        .map_err(|e| AppError::General(format!("Generated harness is invalid: {}", e)))?;
    Ok(Harness {
        source: prettyplease::unparse(&file),
        registry,
    })
}

fn render_node(
    node: &ModuleNode,
    units: &[CompileUnit],
    prefix: &[String],
    mut used: HashSet<String>,
    mounted: &mut Vec<(usize, Vec<String>)>,
) -> AppResult<TokenStream> {
    let mut items = Vec::new();

    for &index in &node.files {
        let unit = &units[index];
        let stem = unit
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = unique(&mut used, &stem);
        let module = ident(&name)?;
        let path = unit.path.to_string_lossy().into_owned();
        items.push(quote! {
            #[path = #path]
            pub mod #module;
            pub use #module::*;
        });

        let mut module_path = prefix.to_vec();
        module_path.push(name);
        mounted.push((index, module_path));
    }

    for (dir, child) in &node.children {
        let name = unique(&mut used, dir);
        let module = ident(&name)?;
        let mut child_prefix = prefix.to_vec();
        child_prefix.push(name);
        let inner = render_node(child, units, &child_prefix, HashSet::new(), mounted)?;
        items.push(quote! {
            pub mod #module {
                #inner
            }
        });
    }

    Ok(quote! { #(#items)* })
}

fn unique(used: &mut HashSet<String>, raw: &str) -> String {
    let base = snake_ident(raw);
    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base.trim_end_matches('_'), n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn ident(name: &str) -> AppResult<syn::Ident> {
    syn::parse_str::<syn::Ident>(name)
        .map_err(|e| AppError::General(format!("'{}' is not a valid module name: {}", name, e)))
}

fn type_path(module_path: &[String], type_name: &str) -> AppResult<syn::Path> {
    let mut segments = vec!["crate".to_string()];
    segments.extend(module_path.iter().cloned());
    segments.push(type_name.to_string());
    syn::parse_str::<syn::Path>(&segments.join("::"))
        .map_err(|e| AppError::General(format!("Cannot address {}: {}", type_name, e)))
}

/// The fixed part of the harness: probe capability and protocol loop.
fn runtime() -> TokenStream {
    quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ParamKind {
            String,
            Integer,
            Number,
            Boolean,
            Other,
        }

        #[derive(Debug, Clone, Copy)]
        pub struct Mutator {
            pub field: &'static str,
            pub setter: &'static str,
            pub kind: ParamKind,
        }

        #[derive(Debug, Clone, PartialEq)]
        pub enum ProbeValue {
            String(String),
            Integer(i64),
            Boolean(bool),
        }

        impl ProbeValue {
            fn kind(&self) -> ParamKind {
                match self {
                    ProbeValue::String(_) => ParamKind::String,
                    ProbeValue::Integer(_) => ParamKind::Integer,
                    ProbeValue::Boolean(_) => ParamKind::Boolean,
                }
            }
        }

        pub trait Probe: std::fmt::Debug {
            fn construct() -> Self
            where
                Self: Sized;

            fn mutators() -> &'static [Mutator]
            where
                Self: Sized;

            fn apply(&mut self, field: &str, value: ProbeValue) -> Result<(), String>;
        }

        type Instance = (Box<dyn Probe>, &'static [Mutator]);

        fn escape(text: &str) -> String {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out
        }

        fn unescape(text: &str) -> String {
            let mut out = String::with_capacity(text.len());
            let mut chars = text.chars();
            while let Some(c) = chars.next() {
                if c != '\\' {
                    out.push(c);
                    continue;
                }
                match chars.next() {
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            }
            out
        }

        fn parse_value(kind: &str, raw: String) -> Result<ProbeValue, String> {
            match kind {
                "string" => Ok(ProbeValue::String(raw)),
                "integer" => raw
                    .parse::<i64>()
                    .map(ProbeValue::Integer)
                    .map_err(|e| e.to_string()),
                "boolean" => raw
                    .parse::<bool>()
                    .map(ProbeValue::Boolean)
                    .map_err(|e| e.to_string()),
                other => Err(format!("unsupported kind '{}'", other)),
            }
        }

        fn handle(line: &str, current: &mut Option<Instance>) -> Result<String, String> {
            let parts: Vec<String> = line.split('\t').map(unescape).collect();
            match parts.first().map(String::as_str) {
                Some("new") => {
                    *current = None;
                    let name = parts.get(1).ok_or("missing type name")?;
                    let instance = lookup(name).ok_or_else(|| format!("unknown type '{}'", name))?;
                    let count = instance.1.len();
                    *current = Some(instance);
                    Ok(count.to_string())
                }
                Some("set") => {
                    let (instance, mutators) = current.as_mut().ok_or("no instance")?;
                    let field = parts.get(1).ok_or("missing field")?;
                    let kind = parts.get(2).ok_or("missing kind")?;
                    let raw = parts.get(3).cloned().unwrap_or_default();
                    let mutator = mutators
                        .iter()
                        .find(|m| m.field == field.as_str())
                        .ok_or_else(|| format!("no mutator for '{}'", field))?;
                    let value = parse_value(kind, raw)?;
                    if mutator.kind != value.kind() {
                        return Err(format!(
                            "{} takes {:?}, got {:?}",
                            mutator.setter,
                            mutator.kind,
                            value.kind()
                        ));
                    }
                    instance.apply(field, value)?;
                    Ok(mutator.setter.to_string())
                }
                Some("show") => {
                    let (instance, _) = current.as_ref().ok_or("no instance")?;
                    Ok(format!("{:?}", instance))
                }
                Some(other) => Err(format!("unknown request '{}'", other)),
                None => Err("empty request".to_string()),
            }
        }

        fn main() {
            use std::io::{BufRead, Write};

            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let mut current = None;
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let reply = match handle(&line, &mut current) {
                    Ok(payload) => format!("ok\t{}", escape(&payload)),
                    Err(message) => format!("err\t{}", escape(&message)),
                };
                let _ = writeln!(out, "{}", reply);
            }
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MutatorInfo;
    use crate::model::ParamKind;
    use std::path::PathBuf;

    fn unit(relative: &str, type_name: &str, qualified_name: &str) -> CompileUnit {
        CompileUnit {
            path: PathBuf::from("/abs/output").join(relative),
            relative: PathBuf::from(relative),
            type_name: type_name.into(),
            qualified_name: qualified_name.into(),
            schema: "s".into(),
            mutators: vec![MutatorInfo {
                field: "name".into(),
                setter: "set_name".into(),
                kind: ParamKind::String,
            }],
        }
    }

    #[test]
    fn test_modules_mirror_directories() {
        let harness = render(&[
            unit("employee/models/employee.rs", "Employee", "models.Employee"),
            unit("person-v2/models/person.rs", "Person", "models.Person"),
        ])
        .unwrap();

        let source = &harness.source;
        assert!(source.starts_with("#![allow(warnings)]"));
        assert!(source.contains("pub mod person_v2 {"));
        assert!(source.contains("#[path = \"/abs/output/employee/models/employee.rs\"]"));
        assert!(source.contains("pub use employee::*;"));
        assert!(source.contains(
            "<crate::employee::models::employee::Employee as Probe>::construct()"
        ));
        assert!(source.contains("\"models.Person\" => "));
        assert_eq!(harness.registry.types.len(), 2);
    }

    #[test]
    fn test_reserved_and_colliding_module_names() {
        let harness = render(&[
            unit("std/models/a.rs", "A", "models.A"),
            unit("x/models/b.rs", "B", "models.B"),
            unit("x/models/b/c.rs", "C", "models.C"),
        ])
        .unwrap();
        assert!(harness.source.contains("pub mod std_2 {"));
        assert!(harness.source.contains("crate::std_2::models::a::A"));
        // A directory named like a sibling unit gets its own module name.
        assert!(harness.source.contains("pub mod b_2 {"));
        assert!(harness.source.contains("crate::x::models::b_2::c::C"));
    }

    #[test]
    fn test_duplicate_qualified_names_registered_once() {
        let harness = render(&[
            unit("a/models/address.rs", "Address", "models.Address"),
            unit("b/models/address.rs", "Address", "models.Address"),
        ])
        .unwrap();
        assert_eq!(harness.registry.types.len(), 1);
        assert_eq!(harness.source.matches("\"models.Address\" =>").count(), 1);
        // Both units are still compiled.
        assert!(harness.source.contains("pub mod a {"));
        assert!(harness.source.contains("pub mod b {"));
    }

    #[test]
    fn test_empty_tree_still_renders() {
        let harness = render(&[]).unwrap();
        assert!(harness.registry.types.is_empty());
        assert!(harness.source.contains("fn main()"));
    }
}
