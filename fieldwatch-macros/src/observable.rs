//! Observable-related macros.
//!
//! This module contains:
//! - `#[derive(Observable)]` - Field selectors, setters, `FieldSet` and
//!   `NotifySource` for a struct built from `Observed<T>` fields and a
//!   `FieldSignal`

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    TypePath, parse_macro_input,
};

/// Role of a struct field, from its `#[observable(...)]` attribute.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Default,
    Signal,
    Skip,
}

/// One observable field of the input struct.
struct ObservedField<'a> {
    ident: &'a Ident,
    name: String,
    value_type: &'a Type,
}

/// Implementation of `#[derive(Observable)]`.
pub fn derive_observable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Observable cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Observable requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Observable can only be derived for structs",
            ));
        }
    };

    let mut signal: Option<&Ident> = None;
    let mut observed = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let role = role_of(field)?;
        if role == Role::Skip {
            continue;
        }
        if role == Role::Signal || (role == Role::Default && is_field_signal(&field.ty)) {
            if signal.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Observable structs must have exactly one signal field",
                ));
            }
            signal = Some(ident);
            continue;
        }
        if let Some(value_type) = observed_value_type(&field.ty) {
            observed.push(ObservedField {
                ident,
                name: ident.to_string().trim_start_matches("r#").to_owned(),
                value_type,
            });
        }
    }

    let Some(signal) = signal else {
        return Err(syn::Error::new_spanned(
            name,
            "Observable structs need a `FieldSignal` field (or one marked `#[observable(signal)]`)",
        ));
    };

    let names: Vec<LitStr> = observed
        .iter()
        .map(|field| LitStr::new(&field.name, field.ident.span()))
        .collect();

    let members = observed.iter().zip(&names).map(|(field, lit)| {
        let ident = field.ident;
        let value_type = field.value_type;
        let selector = format_ident!("{}", field.name.to_uppercase(), span = ident.span());
        let setter = format_ident!("set_{}", field.name, span = ident.span());

        quote! {
            #[doc = concat!("Selector for the `", #lit, "` field.")]
            #vis const #selector: ::fieldwatch::Field<#name, #value_type> =
                ::fieldwatch::Field::declared(
                    #lit,
                    <#name as ::fieldwatch::FieldSet>::FIELDS,
                    |source: &#name| source.#ident.get(),
                );

            #[doc = concat!("Store `value` in `", #lit, "` and signal the change.")]
            #vis fn #setter(&self, value: #value_type) {
                self.#ident.set(value);
                ::fieldwatch::FieldSignal::emit(&self.#signal, #lit);
            }
        }
    });

    Ok(quote! {
        impl ::fieldwatch::FieldSet for #name {
            const FIELDS: &'static [&'static str] = &[#(#names),*];
        }

        impl #name {
            #(#members)*
        }

        impl ::fieldwatch::NotifySource for #name {
            fn attach_field_handler(&self, handler: ::fieldwatch::FieldChangeHandler) {
                ::fieldwatch::FieldSignal::attach(&self.#signal, handler);
            }

            fn detach_field_handler(&self) {
                ::fieldwatch::FieldSignal::detach(&self.#signal);
            }
        }
    })
}

fn role_of(field: &Field) -> syn::Result<Role> {
    let mut role = Role::Default;
    for attr in &field.attrs {
        if !attr.path().is_ident("observable") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("signal") {
                role = Role::Signal;
                Ok(())
            } else if meta.path.is_ident("skip") {
                role = Role::Skip;
                Ok(())
            } else {
                Err(meta.error("unknown observable attribute, expected `signal` or `skip`"))
            }
        })?;
    }
    Ok(role)
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(TypePath { qself: None, path }) => path.segments.last(),
        _ => None,
    }
}

fn is_field_signal(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == "FieldSignal")
}

/// `T` for a field of type `Observed<T>`.
fn observed_value_type(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Observed" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match (args.args.len(), args.args.first()?) {
        (1, GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}
