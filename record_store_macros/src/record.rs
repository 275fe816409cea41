use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let fields = named_fields(input)?;
    let id_field = find_id_field(fields.iter().copied())?;
    let id_ident = id_field.ident.as_ref().expect("named field");
    let id_ty = &id_field.ty;

    let patch_name = parse_patch_name(input)?.unwrap_or_else(|| format_ident!("{}Patch", name));

    // Everything except the identifier becomes optional in the patch.
    let patched: Vec<(&Ident, &syn::Type)> = fields
        .iter()
        .filter(|f| f.ident.as_ref() != Some(id_ident))
        .map(|f| (f.ident.as_ref().expect("named field"), &f.ty))
        .collect();

    // For `Option<T>` fields, JSON `null` clears the field and a missing key
    // leaves it unchanged.
    let patch_field_defs = patched.iter().map(|(ident, ty)| {
        if is_option(ty) {
            quote! {
                #[serde(
                    default,
                    deserialize_with = "record_store::__private::deserialize_present",
                    skip_serializing_if = "Option::is_none"
                )]
                pub #ident: Option<#ty>
            }
        } else {
            quote! {
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub #ident: Option<#ty>
            }
        }
    });

    let setters = patched.iter().map(|(ident, ty)| {
        let doc = format!("Set `{}` in this patch.", ident);
        quote! {
            #[doc = #doc]
            pub fn #ident(mut self, value: impl Into<#ty>) -> Self {
                self.#ident = Some(value.into());
                self
            }
        }
    });

    let apply_stmts = patched.iter().map(|(ident, _)| {
        quote! {
            if let Some(value) = self.#ident {
                record.#ident = value;
            }
        }
    });

    let empty_checks = patched.iter().map(|(ident, _)| {
        quote! { && self.#ident.is_none() }
    });

    let patch_doc = format!(
        "Partial update for [`{}`]. Generated by `#[derive(Record)]`.",
        name
    );

    let expanded = quote! {
        #[doc = #patch_doc]
        #[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #vis struct #patch_name {
            #(#patch_field_defs),*
        }

        impl #patch_name {
            #(#setters)*
        }

        impl record_store::Record for #name {
            type Id = #id_ty;
            type Patch = #patch_name;

            fn id(&self) -> &Self::Id {
                &self.#id_ident
            }
        }

        impl record_store::Patch<#name> for #patch_name {
            #[allow(unused_variables)]
            fn apply(self, record: &mut #name) {
                #(#apply_stmts)*
            }

            fn is_empty(&self) -> bool {
                true #(#empty_checks)*
            }
        }
    };

    Ok(expanded)
}

fn is_option(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(type_path) if type_path.qself.is_none() => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident == "Option")
            .unwrap_or(false),
        _ => false,
    }
}

fn named_fields(input: &DeriveInput) -> syn::Result<Vec<&Field>> {
    match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Record derive only supports structs with named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "Record derive only supports structs",
        )),
    }
}

/// The field marked `#[record(id)]`, or else the field named `id`.
fn find_id_field<'a>(fields: impl Iterator<Item = &'a Field> + Clone) -> syn::Result<&'a Field> {
    let mut marked = None;
    for field in fields.clone() {
        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            let mut is_id = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported field attribute, expected `id`"))
                }
            })?;
            if is_id {
                if marked.is_some() {
                    return Err(syn::Error::new_spanned(
                        attr,
                        "only one field may be marked #[record(id)]",
                    ));
                }
                marked = Some(field);
            }
        }
    }

    if let Some(field) = marked {
        return Ok(field);
    }

    fields
        .into_iter()
        .find(|f| f.ident.as_ref().map(|i| i == "id").unwrap_or(false))
        .ok_or_else(|| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "Record derive: no field marked with #[record(id)] and no field named `id`",
            )
        })
}

fn parse_patch_name(input: &DeriveInput) -> syn::Result<Option<Ident>> {
    let mut patch_name = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("patch") {
                let value: LitStr = meta.value()?.parse()?;
                patch_name = Some(format_ident!("{}", value.value()));
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `patch = \"...\"`"))
            }
        })?;
    }

    Ok(patch_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: DeriveInput) -> Result<String, String> {
        expand(&input)
            .map(|tokens| tokens.to_string())
            .map_err(|err| err.to_string())
    }

    #[test]
    fn generic_structs_are_rejected() {
        let err = expand_str(syn::parse_quote! {
            struct Tagged<T> {
                id: u32,
                value: T,
            }
        })
        .unwrap_err();
        assert_eq!(err, "Record derive does not support generic structs");
    }

    #[test]
    fn missing_id_field_is_an_error() {
        let err = expand_str(syn::parse_quote! {
            struct Note {
                title: String,
            }
        })
        .unwrap_err();
        assert!(err.contains("no field named `id`"));
    }

    #[test]
    fn tuple_structs_are_rejected() {
        let err = expand_str(syn::parse_quote! {
            struct Pair(u32, String);
        })
        .unwrap_err();
        assert!(err.contains("named fields"));
    }

    #[test]
    fn patch_name_and_id_field() {
        let out = expand_str(syn::parse_quote! {
            #[record(patch = "UserEdit")]
            pub struct User {
                #[record(id)]
                handle: String,
                name: String,
                address: Option<String>,
            }
        })
        .unwrap();

        assert!(out.contains("pub struct UserEdit"));
        assert!(out.contains("type Id = String"));
        assert!(out.contains("& self . handle"));
        assert!(!out.contains("pub handle"));
    }

    #[test]
    fn only_option_fields_get_the_presence_deserializer() {
        let out = expand_str(syn::parse_quote! {
            struct Task {
                id: u32,
                title: String,
                description: Option<String>,
            }
        })
        .unwrap();

        assert_eq!(out.matches("deserialize_present").count(), 1);
    }

    #[test]
    fn option_detection() {
        assert!(is_option(&syn::parse_quote!(Option<u32>)));
        assert!(is_option(&syn::parse_quote!(std::option::Option<String>)));
        assert!(!is_option(&syn::parse_quote!(Vec<Option<u32>>)));
        assert!(!is_option(&syn::parse_quote!(u32)));
    }
}
