use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

/// Derive a column-oriented `*Timeseries` companion for a per-step flux
/// record. Every field of the record must be `f64`.
///
/// The companion holds one `Vec<f64>` column per field and provides
/// `with_capacity`, `push`, `len`, `is_empty`, `get` (one step back as a
/// record), `column` (lookup by exported name) and `columns` (every column in
/// declaration order). The record gets `field_names()` and `values()`.
///
/// Attributes:
/// - `#[fluxes(timeseries_name = "Name")]` on the struct overrides the
///   companion name (default `{StructName}Timeseries`).
/// - `#[fluxes(rename = "name")]` on a field changes its exported column name.
#[proc_macro_derive(Fluxes, attributes(fluxes))]
pub fn derive_fluxes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct Column {
    ident: Ident,
    name: String,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Fluxes can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Fluxes can only be derived for structs",
            ))
        }
    };
    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Fluxes struct must have at least one field",
        ));
    }

    let ts_name = match string_attr(&input.attrs, "timeseries_name")? {
        Some(s) => format_ident!("{}", s),
        None => format_ident!("{}Timeseries", name),
    };

    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        if !is_f64_type(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "Fluxes derive: all fields must be f64",
            ));
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let exported = string_attr(&field.attrs, "rename")?.unwrap_or_else(|| ident.to_string());
        if columns.iter().any(|c: &Column| c.name == exported) {
            return Err(syn::Error::new_spanned(
                &ident,
                format!("Fluxes derive: duplicate column name `{}`", exported),
            ));
        }
        columns.push(Column {
            ident,
            name: exported,
        });
    }

    let n = columns.len();
    let idents: Vec<&Ident> = columns.iter().map(|c| &c.ident).collect();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let first = idents[0];
    let doc = format!("Per-step columns of [`{}`].", name);

    Ok(quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #ts_name {
            #(pub #idents: Vec<f64>,)*
        }

        impl #ts_name {
            /// Pre-allocate every column for `n` steps.
            pub fn with_capacity(n: usize) -> Self {
                Self {
                    #(#idents: Vec::with_capacity(n),)*
                }
            }

            /// Append one step.
            pub fn push(&mut self, f: &#name) {
                #(self.#idents.push(f.#idents);)*
            }

            /// Number of steps stored.
            pub fn len(&self) -> usize {
                self.#first.len()
            }

            pub fn is_empty(&self) -> bool {
                self.#first.is_empty()
            }

            /// Step `i` as a record.
            pub fn get(&self, i: usize) -> Option<#name> {
                if i >= self.len() {
                    return None;
                }
                Some(#name {
                    #(#idents: self.#idents[i],)*
                })
            }

            /// Column by exported name.
            pub fn column(&self, name: &str) -> Option<&[f64]> {
                match name {
                    #(#names => Some(&self.#idents),)*
                    _ => None,
                }
            }

            /// Every column with its exported name, in declaration order.
            pub fn columns(&self) -> [(&'static str, &[f64]); #n] {
                [#((#names, self.#idents.as_slice()),)*]
            }
        }

        impl ::std::iter::FromIterator<#name> for #ts_name {
            fn from_iter<I: ::std::iter::IntoIterator<Item = #name>>(iter: I) -> Self {
                let iter = iter.into_iter();
                let mut ts = Self::with_capacity(iter.size_hint().0);
                for f in iter {
                    ts.push(&f);
                }
                ts
            }
        }

        impl #name {
            /// Exported column names, in declaration order.
            pub fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            /// Field values, in declaration order.
            pub fn values(&self) -> [f64; #n] {
                [#(self.#idents),*]
            }
        }
    })
}

/// Value of `#[fluxes(key = "value")]` among `attrs`.
fn string_attr(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident("fluxes") {
            continue;
        }
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        for meta in nested {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected `key = \"value\"`"))
                }
            };
            if !nv.path.is_ident(key) {
                continue;
            }
            if let syn::Expr::Lit(expr_lit) = &nv.value {
                if let Lit::Str(lit_str) = &expr_lit.lit {
                    return Ok(Some(lit_str.value()));
                }
            }
            return Err(syn::Error::new_spanned(&nv.value, "expected a string literal"));
        }
    }
    Ok(None)
}

fn is_f64_type(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Path(p) if p.qself.is_none() && p.path.is_ident("f64"))
}
