//! # Source Emitter
//!
//! Renders a [`TypeModel`] tree into one Rust source file per type, plus the
//! schema's [`Manifest`].
//!
//! Every generated type is a plain std-only struct with:
//! - `new()`, a getter per field, `set_<field>` mutators and `with_<field>` builders,
//! - an implementation of the artifact's `Probe` trait (`construct`, `mutators`, `apply`),
//!   which lets the compiled artifact be exercised without runtime introspection.
//!
//! Sibling types are referred to as `super::Name`; the compiler mounts all units of
//! one directory into the same module.

use crate::error::{AppError, AppResult};
use crate::manifest::{Manifest, ManifestUnit, MutatorInfo, MANIFEST_FILE};
use crate::model::{Field, FieldType, ParamKind, TypeModel};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use std::fs;
use std::path::{Path, PathBuf};

/// One written source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedUnit {
    /// Where the unit was written.
    pub path: PathBuf,
    /// The formatted source.
    pub source: String,
    /// Type defined by the unit.
    pub type_name: String,
    /// `package.TypeName`.
    pub qualified_name: String,
    /// Logical name of the originating schema.
    pub schema: String,
}

/// Writes generated units to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceEmitter;

impl SourceEmitter {
    /// Creates an emitter.
    pub fn new() -> Self {
        Self
    }

    /// Writes one unit per type of `model` under `<output_root>/<package segments>/`
    /// and the manifest under `<output_root>/manifest.json`.
    ///
    /// Existing files are overwritten. Units listed by an earlier manifest that
    /// were not rewritten stay listed while their files exist. A failed write aborts with
    /// [`AppError::SourceWrite`]; units written before it stay on disk.
    pub fn emit(&self, model: &TypeModel, output_root: &Path) -> AppResult<Vec<EmittedUnit>> {
        let dir = package_dir(output_root, &model.package);
        fs::create_dir_all(&dir).map_err(|source| AppError::SourceWrite {
            path: dir.clone(),
            source,
        })?;

        let mut units = Vec::new();
        let mut listed = Vec::new();
        for ty in model.walk() {
            let source = render_unit(ty)?;
            let file_name = unit_file_name(&ty.name);
            let path = dir.join(&file_name);
            fs::write(&path, &source).map_err(|source| AppError::SourceWrite {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "wrote unit");

            listed.push(ManifestUnit {
                type_name: ty.name.clone(),
                qualified_name: ty.qualified_name(),
                path: path
                    .strip_prefix(output_root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&file_name)),
                mutators: MutatorInfo::for_model(ty),
            });
            units.push(EmittedUnit {
                path,
                source,
                type_name: ty.name.clone(),
                qualified_name: ty.qualified_name(),
                schema: ty.schema.clone(),
            });
        }

        let manifest_path = output_root.join(MANIFEST_FILE);
        listed.extend(surviving_units(&manifest_path, output_root, &listed));
        let manifest = Manifest {
            schema: model.schema.clone(),
            package: model.package.clone(),
            units: listed,
        };
        manifest.save(&manifest_path)?;

        Ok(units)
    }
}

/// Units of a previous manifest at `manifest_path` that this run did not
/// rewrite but whose files are still on disk.
///
/// Runs in different modes leave different units behind; the compiler picks up
/// every unit of the tree, so the manifest keeps describing them all.
fn surviving_units(
    manifest_path: &Path,
    output_root: &Path,
    written: &[ManifestUnit],
) -> Vec<ManifestUnit> {
    if !manifest_path.is_file() {
        return Vec::new();
    }
    let previous = match Manifest::load(manifest_path) {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable manifest");
            return Vec::new();
        }
    };
    previous
        .units
        .into_iter()
        .filter(|old| written.iter().all(|new| new.path != old.path))
        .filter(|old| output_root.join(&old.path).is_file())
        .collect()
}

/// File name of the unit defining `type_name`.
pub fn unit_file_name(type_name: &str) -> String {
    format!("{}.rs", type_name.to_snake_case())
}

fn package_dir(output_root: &Path, package: &str) -> PathBuf {
    package
        .split('.')
        .filter(|s| !s.is_empty())
        .fold(output_root.to_path_buf(), |dir, segment| dir.join(segment))
}

/// Renders the formatted source of a single type (nested types are not included).
pub fn render_unit(model: &TypeModel) -> AppResult<String> {
    let name = ident(&model.name)?;

    let header = format!(
        " `{}`, generated from schema `{}`.",
        model.qualified_name(),
        model.schema
    );
    let type_docs = doc_attrs(model.description.as_deref());

    let mut fields = Vec::new();
    let mut accessors = Vec::new();
    let mut mutators = Vec::new();
    let mut applies = Vec::new();

    for field in &model.fields {
        let field_ident = ident(&field.ident)?;
        let setter = ident(&field.setter())?;
        let builder = ident(&field.builder())?;
        let value_ty = value_type(&field.ty)?;
        let docs = doc_attrs(field.description.as_deref());

        let boxed = matches!(field.ty, FieldType::Object { boxed: true, .. });
        let (stored_ty, getter_ty, getter_body, assign) = match (field.is_optional(), boxed) {
            (true, true) => (
                quote! { Option<Box<#value_ty>> },
                quote! { Option<&#value_ty> },
                quote! { self.#field_ident.as_deref() },
                quote! { Some(Box::new(value)) },
            ),
            (true, false) => (
                quote! { Option<#value_ty> },
                quote! { Option<&#value_ty> },
                quote! { self.#field_ident.as_ref() },
                quote! { Some(value) },
            ),
            (false, _) => (
                quote! { #value_ty },
                quote! { &#value_ty },
                quote! { &self.#field_ident },
                quote! { value },
            ),
        };

        fields.push(quote! {
            #(#docs)*
            #field_ident: #stored_ty
        });

        accessors.push(quote! {
            #(#docs)*
            pub fn #field_ident(&self) -> #getter_ty {
                #getter_body
            }

            pub fn #setter(&mut self, value: #value_ty) {
                self.#field_ident = #assign;
            }
        });
        if model.options.builders {
            accessors.push(quote! {
                pub fn #builder(mut self, value: #value_ty) -> Self {
                    self.#setter(value);
                    self
                }
            });
        }

        mutators.push(mutator_entry(field));
        if let Some(arm) = apply_arm(field, &setter) {
            applies.push(arm);
        }
    }

    let unit = quote! {
        #![doc = #header]

        #(#type_docs)*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #name {
            #(#fields),*
        }

        impl #name {
            pub fn new() -> Self {
                <Self as Default>::default()
            }

            #(#accessors)*
        }

        impl crate::Probe for #name {
            fn construct() -> Self {
                Self::new()
            }

            fn mutators() -> &'static [crate::Mutator] {
                const MUTATORS: &[crate::Mutator] = &[#(#mutators),*];
                MUTATORS
            }

            fn apply(&mut self, field: &str, value: crate::ProbeValue) -> Result<(), String> {
                match (field, value) {
                    #(#applies)*
                    (field, value) => Err(format!("no mutator for '{}' accepting {:?}", field, value)),
                }
            }
        }
    };

    let file: syn::File = syn::parse2(unit).map_err(|e| {
        AppError::General(format!("Generated code for {} is invalid: {}", model.name, e))
    })?;
    Ok(prettyplease::unparse(&file))
}

fn ident(name: &str) -> AppResult<syn::Ident> {
    syn::parse_str::<syn::Ident>(name)
        .map_err(|e| AppError::General(format!("'{}' is not a valid identifier: {}", name, e)))
}

fn doc_attrs(description: Option<&str>) -> Vec<TokenStream> {
    description
        .map(|text| {
            text.lines()
                .map(|line| {
                    let line = format!(" {}", line);
                    quote! { #[doc = #line] }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn value_type(ty: &FieldType) -> AppResult<TokenStream> {
    Ok(match ty {
        FieldType::String | FieldType::Any => quote! { String },
        FieldType::Integer => quote! { i64 },
        FieldType::Number => quote! { f64 },
        FieldType::Boolean => quote! { bool },
        FieldType::Array(inner) => {
            let inner = value_type(inner)?;
            quote! { Vec<#inner> }
        }
        FieldType::Map(inner) => {
            let inner = value_type(inner)?;
            quote! { std::collections::BTreeMap<String, #inner> }
        }
        FieldType::Object { name, .. } => {
            let name = ident(name)?;
            quote! { super::#name }
        }
    })
}

fn mutator_entry(field: &Field) -> TokenStream {
    let property = &field.property;
    let setter = field.setter();
    let kind = ident_unchecked(field.ty.param_kind());
    quote! {
        crate::Mutator { field: #property, setter: #setter, kind: crate::ParamKind::#kind }
    }
}

fn ident_unchecked(kind: ParamKind) -> syn::Ident {
    syn::Ident::new(kind.variant(), proc_macro2::Span::call_site())
}

fn apply_arm(field: &Field, setter: &syn::Ident) -> Option<TokenStream> {
    let property = &field.property;
    let variant = match field.ty.param_kind() {
        ParamKind::String => quote! { String },
        ParamKind::Integer => quote! { Integer },
        ParamKind::Boolean => quote! { Boolean },
        ParamKind::Number | ParamKind::Other => return None,
    };
    Some(quote! {
        (#property, crate::ProbeValue::#variant(value)) => {
            self.#setter(value);
            Ok(())
        }
    })
}
