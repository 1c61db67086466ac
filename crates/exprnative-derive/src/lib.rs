//! Derive macro exposing Rust structs to exprnative.
//!
//! `#[derive(NativeType)]` emits the struct's field table and its reflection
//! implementations, which is all the bridge needs to register the type,
//! declare its fields to the checker and read or build instances at runtime.
//!
//! # Example
//!
//! ```ignore
//! use exprnative_derive::NativeType;
//!
//! #[derive(Debug, Clone, NativeType)]
//! #[native(package = "identity")]
//! pub struct Account {
//!     pub id: i64,
//!     #[native(rename = "emails")]
//!     pub email_addresses: Vec<String>,
//! }
//! ```
//!
//! The generated code refers to `::exprnative_types`, so that crate must be a
//! dependency of the crate using the derive.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr, Visibility};

/// Derive the reflection support for a struct with named fields.
///
/// The struct must also implement `Clone` and `Debug`, and be `Send + Sync`.
///
/// # Attributes
///
/// - `#[native(package = "alias")]` - package alias (default: last segment
///   of the module path)
/// - `#[native(name = "Name")]` - type name (default: the Rust name)
/// - `#[native(rename = "name")]` - field name exposed to expressions
/// - `#[native(opaque)]` - field with no expression counterpart; it is never
///   visible and its type only needs `Default`
#[proc_macro_derive(NativeType, attributes(native))]
pub fn derive_native_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_struct(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct StructAttrs {
    package: Option<LitStr>,
    name: Option<LitStr>,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<LitStr>,
    opaque: bool,
}

fn derive_struct(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    let data = match &input.data {
        Data::Struct(data) => data,
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "NativeType can only be derived for structs, not enums",
            ))
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "NativeType can only be derived for structs, not unions",
            ))
        }
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "NativeType cannot be derived for generic structs",
        ));
    }
    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "NativeType requires a struct with named fields",
            ))
        }
    };

    let attrs = struct_attrs(&input.attrs)?;
    let type_name = match &attrs.name {
        Some(name) => quote! { #name },
        None => {
            let name = ident.to_string();
            quote! { #name }
        }
    };
    let package = match &attrs.package {
        Some(package) => quote! { #package },
        None => quote! {
            ::exprnative_types::reflect::simple_package_alias(::std::module_path!())
        },
    };

    let mut field_infos = Vec::new();
    let mut zero_inits = Vec::new();
    let mut reflected_idents = Vec::new();
    let mut field_arms = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_ty = &field.ty;
        let field_attrs = field_attrs(&field.attrs)?;
        let name_str = field_ident.to_string();
        let exported = matches!(field.vis, Visibility::Public(_));
        let rename = match &field_attrs.rename {
            Some(rename) => quote! { ::std::option::Option::Some(#rename) },
            None => quote! { ::std::option::Option::None },
        };

        if field_attrs.opaque {
            field_infos.push(quote! {
                ::exprnative_types::reflect::FieldInfo {
                    name: #name_str,
                    rename: #rename,
                    index: #index,
                    exported: #exported,
                    host_type: || ::exprnative_types::reflect::HostType::Unsupported("opaque"),
                    convert: ::exprnative_types::reflect::reject_field,
                    assign: |target, _| {
                        ::std::result::Result::Err(::exprnative_types::ConversionError::Unsupported {
                            from: ::exprnative_types::reflect::Reflect::host_type(target).to_string(),
                            to: ::std::string::String::from("opaque"),
                        })
                    },
                }
            });
            zero_inits.push(quote! {
                #field_ident: ::std::default::Default::default()
            });
            continue;
        }

        field_infos.push(quote! {
            ::exprnative_types::reflect::FieldInfo {
                name: #name_str,
                rename: #rename,
                index: #index,
                exported: #exported,
                host_type: <#field_ty as ::exprnative_types::reflect::Typed>::type_of,
                convert: ::exprnative_types::reflect::convert_field::<#field_ty>,
                assign: |target, value| {
                    let target = ::exprnative_types::reflect::struct_mut::<#ident>(target)?;
                    target.#field_ident = ::exprnative_types::reflect::take_field::<#field_ty>(value)?;
                    ::std::result::Result::Ok(())
                },
            }
        });
        zero_inits.push(quote! {
            #field_ident: <#field_ty as ::exprnative_types::reflect::Typed>::zero()
        });
        field_arms.push(quote! {
            #index => ::std::option::Option::Some(&self.#field_ident)
        });
        reflected_idents.push(field_ident);
    }

    Ok(quote! {
        impl ::exprnative_types::reflect::NativeStruct for #ident {
            fn struct_info() -> &'static ::exprnative_types::reflect::StructInfo {
                static INFO: ::std::sync::OnceLock<::exprnative_types::reflect::StructInfo> =
                    ::std::sync::OnceLock::new();
                INFO.get_or_init(|| {
                    ::exprnative_types::reflect::StructInfo::new::<#ident>(
                        #type_name,
                        #package,
                        ::std::vec![#(#field_infos),*],
                    )
                })
            }
        }

        impl ::exprnative_types::reflect::Reflect for #ident {
            ::exprnative_types::__reflect_basics!();

            fn is_zero(&self) -> bool {
                true #(&& ::exprnative_types::reflect::Reflect::is_zero(&self.#reflected_idents))*
            }

            fn reflect_eq(&self, other: &dyn ::exprnative_types::reflect::Reflect) -> bool {
                match ::exprnative_types::reflect::Reflect::as_any(other).downcast_ref::<#ident>() {
                    ::std::option::Option::Some(other) => {
                        true #(&& ::exprnative_types::reflect::Reflect::reflect_eq(
                            &self.#reflected_idents,
                            &other.#reflected_idents,
                        ))*
                    }
                    ::std::option::Option::None => false,
                }
            }

            fn view(&self) -> ::exprnative_types::reflect::View<'_> {
                ::exprnative_types::reflect::View::Struct(self)
            }
        }

        impl ::exprnative_types::reflect::Typed for #ident {
            fn type_of() -> ::exprnative_types::reflect::HostType {
                ::exprnative_types::reflect::HostType::Struct(
                    <#ident as ::exprnative_types::reflect::NativeStruct>::struct_info(),
                )
            }

            fn zero() -> Self {
                #ident {
                    #(#zero_inits),*
                }
            }
        }

        impl ::exprnative_types::reflect::ReflectStruct for #ident {
            fn info(&self) -> &'static ::exprnative_types::reflect::StructInfo {
                <#ident as ::exprnative_types::reflect::NativeStruct>::struct_info()
            }

            fn field(&self, index: usize) -> ::std::option::Option<&dyn ::exprnative_types::reflect::Reflect> {
                match index {
                    #(#field_arms,)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::exprnative_types::reflect::FromValue for #ident {
            fn from_value(
                value: &::exprnative_types::Value,
            ) -> ::std::result::Result<Self, ::exprnative_types::ConversionError> {
                match value {
                    ::exprnative_types::Value::Object(obj) => obj.convert_to_native::<#ident>(),
                    other => ::std::result::Result::Err(
                        ::exprnative_types::ConversionError::mismatch(#type_name, other),
                    ),
                }
            }
        }
    })
}

/// Parse `#[native(package = "...", name = "...")]` on the struct.
fn struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("native") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("package") {
                out.package = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `package` or `name`"))
            }
        })?;
    }
    Ok(out)
}

/// Parse `#[native(rename = "...")]` and `#[native(opaque)]` on a field.
fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("native") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                out.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("opaque") {
                out.opaque = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename` or `opaque`"))
            }
        })?;
    }
    Ok(out)
}
