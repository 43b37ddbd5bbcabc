#![forbid(unsafe_code)]
//! Procedural macros for the `tablemap` mapping library.
//!
//! The `#[derive(Entity)]` macro inspects a struct and generates the full
//! compile-time type descriptor used by the mapping engine: table metadata,
//! primary-key introspection, positional insert values, a `RowAdapter` that
//! rebuilds instances from query results, and, for types with lazy-remote
//! fields, a proxy type that defers fetching those fields until first access.

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Token, Type,
};

use inflections::Inflect;

// --- Helper structs & functions for parsing ---

/// A helper struct for parsing `key = "value"` style meta attributes.
struct MetaNameValue {
    pub path: syn::Path,
    pub _eq_token: Token![=],
    pub value: LitStr,
}

impl Parse for MetaNameValue {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            path: input.parse()?,
            _eq_token: input.parse()?,
            value: input.parse()?,
        })
    }
}

/// Helper to check if a type is an `Option<T>`.
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_none() && type_path.path.leading_colon.is_none() {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Option";
            }
        }
    }
    false
}

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let path = &type_path.path;
        if path.segments.last().is_some_and(|s| s.ident == "Option") {
            if let Some(segment) = path.segments.last() {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                        return Some(inner_ty);
                    }
                }
            }
        }
    }
    None
}

/// Map a field's Rust type to a SQLite storage type token. `Option<T>` maps
/// to the token of `T` (nullability is not expressed in the column type).
fn sql_type_for(ty_str: &str) -> Option<&'static str> {
    let base = ty_str
        .strip_prefix("Option<")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(ty_str);
    match base {
        "String" => Some("TEXT"),
        "i32" | "i64" | "bool" => Some("INTEGER"),
        "f64" => Some("REAL"),
        "Vec<u8>" => Some("BLOB"),
        _ => None,
    }
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for ch in chars {
        if !(ch == '_' || ch.is_ascii_alphanumeric()) {
            return false;
        }
    }
    true
}

/// Holds parsed metadata about a single struct field.
#[derive(Clone)]
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    ty_str: String,
    column_name: String,
    is_id: bool,
    is_skipped: bool,
    is_lazy: bool,
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> Vec<FieldMetadata> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => panic!("#[derive(Entity)] only supports structs with named fields."),
        },
        _ => panic!("#[derive(Entity)] can only be used on structs."),
    };

    fields
        .named
        .iter()
        .map(|field| {
            let ident = field.ident.as_ref().unwrap().clone();
            let ty = field.ty.clone();
            let ty_str = ty.to_token_stream().to_string().replace(' ', "");
            // The naming convention collaborator: declared name -> column name.
            let mut column_name = ident.to_string().to_snake_case();
            let mut is_id = false;
            let mut is_skipped = false;
            let mut is_lazy = false;

            for attr in &field.attrs {
                if attr.path().is_ident("fetch") {
                    if let Ok(list) = attr.meta.require_list() {
                        list.parse_nested_meta(|meta| {
                            if meta.path.is_ident("column") {
                                let value = meta
                                    .value()
                                    .expect("Invalid #[fetch(column = \"...\")] syntax");
                                let s: LitStr = value
                                    .parse()
                                    .expect("Invalid #[fetch(column = \"...\")] value");
                                column_name = s.value();
                            } else if meta.path.is_ident("id") {
                                is_id = true;
                            } else if meta.path.is_ident("skip") {
                                is_skipped = true;
                            } else if meta.path.is_ident("lazy") {
                                is_lazy = true;
                            }
                            Ok(())
                        })
                        .expect("Invalid #[fetch(...)] attribute syntax");
                    }
                }
            }
            FieldMetadata {
                ident,
                ty,
                ty_str,
                column_name,
                is_id,
                is_skipped,
                is_lazy,
            }
        })
        .collect()
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity, fetch))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;
    // Generated companion types inherit the entity's own visibility. A
    // hard-coded `pub` would leak a private entity through the proxy's
    // inherent methods (E0446) for test-local or crate-private types.
    let vis = &input.vis;
    let fields_metadata = parse_field_metadata(&input);

    // --- Get table name ---
    // Look for `#[entity(table = "...")]` first; otherwise the table is the
    // struct's simple name, used verbatim.
    let table_name_override = input.attrs.iter().find_map(|attr| {
        if attr.path().is_ident("entity") {
            if let Ok(meta) = attr.meta.require_list() {
                let parsed: Result<MetaNameValue, _> = syn::parse2(meta.tokens.clone());
                if let Ok(MetaNameValue { path, value, .. }) = parsed {
                    if path.is_ident("table") {
                        return Some(value.value());
                    }
                }
            }
        }
        None
    });
    let table_name = table_name_override.unwrap_or_else(|| struct_name.to_string());

    if !is_valid_ident(&table_name) {
        panic!(
            "Invalid table name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
            table_name
        );
    }

    let persistable: Vec<&FieldMetadata> =
        fields_metadata.iter().filter(|f| !f.is_skipped).collect();
    for f in &persistable {
        if !is_valid_ident(&f.column_name) {
            panic!(
                "Invalid column name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.",
                f.column_name
            );
        }
    }

    // --- Validate the field tagging ---
    let id_count = persistable.iter().filter(|f| f.is_id).count();
    if id_count == 0 {
        panic!("A field must be marked with #[fetch(id)]. Hint: mark your primary key field like `#[fetch(id)]`.");
    } else if id_count > 1 {
        panic!(
            "Exactly one field must be marked with #[fetch(id)] (found {}). Remove extra #[fetch(id)] attributes.",
            id_count
        );
    }
    for f in &fields_metadata {
        if f.is_lazy && f.is_id {
            panic!("The #[fetch(id)] field cannot also be #[fetch(lazy)].");
        }
        if f.is_lazy && f.is_skipped {
            panic!("A #[fetch(lazy)] field cannot be #[fetch(skip)]: its locator must be persisted.");
        }
        if f.is_lazy && !matches!(f.ty_str.as_str(), "Vec<u8>" | "Option<Vec<u8>>") {
            panic!(
                "Unsupported type for #[fetch(lazy)]: {}. Lazy-remote fields hold raw content and must be Vec<u8> or Option<Vec<u8>>.",
                f.ty_str
            );
        }
    }

    // --- Implement `Persistable` ---
    let field_metas: Vec<_> = persistable
        .iter()
        .map(|f| {
            let col = &f.column_name;
            let sql_ty = sql_type_for(&f.ty_str).unwrap_or_else(|| {
                panic!(
                    "Unsupported field type for persistence: {}. Hint: use String, i32, i64, f64, bool, Vec<u8>, or an Option of these, or mark the field with #[fetch(skip)].",
                    f.ty_str
                )
            });
            let is_id = f.is_id;
            let is_lazy = f.is_lazy;
            quote! {
                ::tablemap_core::FieldMeta {
                    column: #col,
                    sql_type: #sql_ty,
                    is_id: #is_id,
                    is_lazy: #is_lazy,
                }
            }
        })
        .collect();

    let persistable_impl = quote! {
        impl ::tablemap_core::Persistable for #struct_name {
            const TABLE: &'static str = #table_name;
            const FIELDS: &'static [::tablemap_core::FieldMeta] = &[#(#field_metas),*];
        }
    };

    // --- Implement `Identifiable` ---
    let id_field = persistable
        .iter()
        .find(|f| f.is_id)
        .expect("unreachable: validated id_count == 1");
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;
    let key_ty = get_option_inner(id_ty).unwrap_or(id_ty);
    let id_column_name = &id_field.column_name;

    let id_accessor = if is_option(id_ty) {
        quote! { self.#id_ident.clone() }
    } else {
        quote! { Some(self.#id_ident.clone()) }
    };

    let identifiable_impl = quote! {
        impl ::tablemap_core::Identifiable for #struct_name {
            type Key = #key_ty;
            const ID_COLUMN: &'static str = #id_column_name;
            fn id(&self) -> Option<Self::Key> {
                #id_accessor
            }
        }
    };

    // --- Implement `Insertable` ---
    // Every persistable field is written, primary key included: keys are
    // stored verbatim, never generated by the engine.
    let to_param_value = |field: &FieldMetadata| {
        let ident = &field.ident;
        let ty_str = &field.ty_str;

        if is_option(&field.ty) {
            return match ty_str.as_str() {
                s if s.contains("Vec<u8>") => {
                    quote! { self.#ident.as_ref().cloned().map(::tablemap_core::ParamValue::Bytes).unwrap_or(::tablemap_core::ParamValue::Null) }
                }
                s if s.contains("String") => {
                    quote! { self.#ident.as_ref().cloned().map(::tablemap_core::ParamValue::String).unwrap_or(::tablemap_core::ParamValue::Null) }
                }
                s if s.contains("i32") => {
                    quote! { self.#ident.map_or(::tablemap_core::ParamValue::Null, ::tablemap_core::ParamValue::I32) }
                }
                s if s.contains("i64") => {
                    quote! { self.#ident.map_or(::tablemap_core::ParamValue::Null, ::tablemap_core::ParamValue::I64) }
                }
                s if s.contains("f64") => {
                    quote! { self.#ident.map_or(::tablemap_core::ParamValue::Null, ::tablemap_core::ParamValue::F64) }
                }
                s if s.contains("bool") => {
                    quote! { self.#ident.map_or(::tablemap_core::ParamValue::Null, ::tablemap_core::ParamValue::Bool) }
                }
                _ => panic!("Unsupported Option type for ParamValue: {}. Hint: use String, i32, i64, f64, bool, or Vec<u8>, or mark the field with #[fetch(skip)].", ty_str),
            };
        }

        match ty_str.as_str() {
            "String" => quote! { ::tablemap_core::ParamValue::String(self.#ident.clone()) },
            "i32" => quote! { ::tablemap_core::ParamValue::I32(self.#ident) },
            "i64" => quote! { ::tablemap_core::ParamValue::I64(self.#ident) },
            "f64" => quote! { ::tablemap_core::ParamValue::F64(self.#ident) },
            "bool" => quote! { ::tablemap_core::ParamValue::Bool(self.#ident) },
            "Vec<u8>" => quote! { ::tablemap_core::ParamValue::Bytes(self.#ident.clone()) },
            _ => panic!("Unsupported type for ParamValue: {}. Hint: use String, i32, i64, f64, bool, or Vec<u8>, or mark the field with #[fetch(skip)].", ty_str),
        }
    };

    let insert_columns: Vec<_> = persistable.iter().map(|f| &f.column_name).collect();
    let insert_values: Vec<_> = persistable.iter().map(|f| to_param_value(f)).collect();

    let insertable_impl = quote! {
        impl ::tablemap_core::Insertable for #struct_name {
            const INSERT_COLUMNS: &'static [&'static str] = &[#(#insert_columns),*];
            fn insert_values(&self) -> Vec<::tablemap_core::ParamValue> {
                vec![#(#insert_values),*]
            }
        }
    };

    // --- Generate the `RowAdapter` (and, for lazy types, the proxy) ---
    let adapter_struct_name = Ident::new(
        &format!("{}RowAdapter", struct_name),
        proc_macro2::Span::call_site(),
    );
    let lazy_fields: Vec<&FieldMetadata> = fields_metadata.iter().filter(|f| f.is_lazy).collect();

    let adapter_and_proxy = if lazy_fields.is_empty() {
        let field_inits: Vec<_> = fields_metadata
            .iter()
            .map(|f| {
                let ident = &f.ident;
                if f.is_skipped {
                    return quote! { #ident: ::core::default::Default::default() };
                }
                let col = LitStr::new(&f.column_name, proc_macro2::Span::call_site());
                quote! { #ident: ::tablemap_core::FromParam::from_param(row.get(#col)?)? }
            })
            .collect();

        quote! {
            #[derive(Debug, Clone, Copy, Default)]
            #vis struct #adapter_struct_name;

            impl ::tablemap_core::RowAdapter<#struct_name> for #adapter_struct_name {
                type Output = #struct_name;
                fn from_row(
                    &self,
                    row: &dyn ::tablemap_core::RowView,
                ) -> ::tablemap_core::RepoResult<#struct_name> {
                    ::core::result::Result::Ok(#struct_name {
                        #(#field_inits),*
                    })
                }
            }
        }
    } else {
        let proxy_name = Ident::new(&format!("{}Lazy", struct_name), proc_macro2::Span::call_site());

        // Inner entity initialization: lazy fields stay logically unset.
        let inner_inits: Vec<_> = fields_metadata
            .iter()
            .map(|f| {
                let ident = &f.ident;
                if f.is_skipped || f.is_lazy {
                    return quote! { #ident: ::core::default::Default::default() };
                }
                let col = LitStr::new(&f.column_name, proc_macro2::Span::call_site());
                quote! { #ident: ::tablemap_core::FromParam::from_param(row.get(#col)?)? }
            })
            .collect();

        let mut locator_fields = Vec::new();
        let mut cache_fields = Vec::new();
        let mut locator_inits = Vec::new();
        let mut cache_inits = Vec::new();
        let mut accessors = Vec::new();

        for f in &lazy_fields {
            let ident = &f.ident;
            let col = LitStr::new(&f.column_name, proc_macro2::Span::call_site());
            let loc_ident = Ident::new(&format!("{}_locator", ident), proc_macro2::Span::call_site());
            let cache_ident = Ident::new(&format!("{}_cache", ident), proc_macro2::Span::call_site());

            locator_fields.push(quote! {
                #loc_ident: ::core::option::Option<::std::string::String>
            });
            cache_fields.push(quote! {
                #cache_ident: ::std::cell::OnceCell<::std::vec::Vec<u8>>
            });
            // The stored value is a locator: decode its bytes as text.
            locator_inits.push(quote! {
                #loc_ident: match row.get(#col)? {
                    ::tablemap_core::ParamValue::Null => ::core::option::Option::None,
                    value => ::core::option::Option::Some(
                        <::std::string::String as ::tablemap_core::FromParam>::from_param(value)?,
                    ),
                }
            });
            cache_inits.push(quote! {
                #cache_ident: ::std::cell::OnceCell::new()
            });

            let doc = format!(
                "Returns the remote content behind `{ident}`, fetching it on first \
                 access and serving the cached bytes thereafter. Returns `Ok(None)` \
                 without fetching when no locator was stored."
            );
            let loc_doc = format!("The stored locator for `{ident}`, if any.");
            accessors.push(quote! {
                #[doc = #doc]
                #vis fn #ident(
                    &self,
                ) -> ::tablemap_core::RepoResult<::core::option::Option<&[u8]>> {
                    if let ::core::option::Option::Some(bytes) = self.#cache_ident.get() {
                        return ::core::result::Result::Ok(::core::option::Option::Some(
                            bytes.as_slice(),
                        ));
                    }
                    let locator = match self.#loc_ident.as_deref() {
                        ::core::option::Option::Some(locator) => locator,
                        ::core::option::Option::None => {
                            return ::core::result::Result::Ok(::core::option::Option::None)
                        }
                    };
                    let bytes = self.fetcher.fetch(locator)?;
                    ::core::result::Result::Ok(::core::option::Option::Some(
                        self.#cache_ident.get_or_init(move || bytes).as_slice(),
                    ))
                }

                #[doc = #loc_doc]
                #vis fn #loc_ident(&self) -> ::core::option::Option<&str> {
                    self.#loc_ident.as_deref()
                }
            });
        }

        let proxy_doc = format!(
            "Lazy stand-in for [`{struct_name}`]: all ordinary fields are \
             materialized and reachable through `Deref`; lazy-remote fields \
             resolve on first accessor call."
        );
        quote! {
            #[derive(Clone)]
            #vis struct #adapter_struct_name {
                fetcher: ::std::rc::Rc<dyn ::tablemap_core::RemoteFetch>,
            }

            impl #adapter_struct_name {
                #vis fn new(fetcher: ::std::rc::Rc<dyn ::tablemap_core::RemoteFetch>) -> Self {
                    Self { fetcher }
                }
            }

            impl ::tablemap_core::RowAdapter<#struct_name> for #adapter_struct_name {
                type Output = #proxy_name;
                fn from_row(
                    &self,
                    row: &dyn ::tablemap_core::RowView,
                ) -> ::tablemap_core::RepoResult<#proxy_name> {
                    ::core::result::Result::Ok(#proxy_name {
                        inner: #struct_name {
                            #(#inner_inits),*
                        },
                        #(#locator_inits,)*
                        #(#cache_inits,)*
                        fetcher: ::std::rc::Rc::clone(&self.fetcher),
                    })
                }
            }

            #[doc = #proxy_doc]
            #vis struct #proxy_name {
                inner: #struct_name,
                #(#locator_fields,)*
                #(#cache_fields,)*
                fetcher: ::std::rc::Rc<dyn ::tablemap_core::RemoteFetch>,
            }

            impl #proxy_name {
                #(#accessors)*

                /// Consumes the proxy, returning the underlying entity with
                /// its lazy fields left at their defaults.
                #vis fn into_inner(self) -> #struct_name {
                    self.inner
                }
            }

            impl ::core::ops::Deref for #proxy_name {
                type Target = #struct_name;
                fn deref(&self) -> &#struct_name {
                    &self.inner
                }
            }
        }
    };

    // --- Combine all generated code ---
    let expanded = quote! {
        #persistable_impl
        #identifiable_impl
        #insertable_impl
        #adapter_and_proxy
    };

    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::{is_valid_ident, sql_type_for};

    #[test]
    fn sql_type_mapping_covers_supported_types() {
        assert_eq!(sql_type_for("String"), Some("TEXT"));
        assert_eq!(sql_type_for("i32"), Some("INTEGER"));
        assert_eq!(sql_type_for("i64"), Some("INTEGER"));
        assert_eq!(sql_type_for("bool"), Some("INTEGER"));
        assert_eq!(sql_type_for("f64"), Some("REAL"));
        assert_eq!(sql_type_for("Vec<u8>"), Some("BLOB"));
        assert_eq!(sql_type_for("Option<String>"), Some("TEXT"));
        assert_eq!(sql_type_for("Option<Vec<u8>>"), Some("BLOB"));
        assert_eq!(sql_type_for("HashMap<String,String>"), None);
    }

    #[test]
    fn identifier_validation() {
        assert!(is_valid_ident("users"));
        assert!(is_valid_ident("_tmp1"));
        assert!(!is_valid_ident("1users"));
        assert!(!is_valid_ident("users; DROP TABLE x"));
        assert!(!is_valid_ident(""));
    }
}
