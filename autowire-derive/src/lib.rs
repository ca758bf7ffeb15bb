//! Derive macro for autowire
//!
//! `#[derive(Autowire)]` implements `autowire::Autowired` for a struct with
//! named fields, generating the constructor description the container uses
//! to build it.
//!
//! # Example
//!
//! ```rust,ignore
//! use autowire::{Autowire, Container};
//! use std::sync::Arc;
//!
//! trait Cache: Send + Sync {}
//!
//! #[derive(Autowire)]
//! struct Database {
//!     #[param(default = "postgres://localhost")]
//!     url: String,
//! }
//!
//! #[derive(Autowire)]
//! #[autowire(name = "users", extends = "Service")]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(class = "Cache")]
//!     cache: Option<Arc<dyn Cache>>,
//!     #[param(default = 100)]
//!     limit: i64,
//!     // Fields without attributes use Default
//!     request_count: u64,
//! }
//!
//! let container = Container::new();
//! container.autowire::<Database>();
//! container.autowire::<UserService>();
//!
//! let users = container.get_as::<UserService>("users").unwrap();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr, Type, parse_macro_input};

/// Derive `autowire::Autowired`.
///
/// # Struct attributes
///
/// - `#[autowire(name = "Id")]` - Identifier the class is described under.
///   Defaults to the struct name.
/// - `#[autowire(extends = "Type")]` - Declare a satisfied type; repeatable.
///
/// # Field attributes
///
/// Constructor parameters are generated in field order, named after the
/// field.
///
/// - `#[inject]` - A dependency of type `Arc<T>` or `Arc<dyn Trait>`,
///   resolved by type. The declared type is the last path segment of `T`
///   (or the trait name) unless `class = "Id"` is given.
/// - `#[inject(optional)]` - A nullable dependency of type
///   `Option<Arc<T>>`. An `Option<Arc<T>>` field is optional without the
///   flag.
/// - `#[param]` - A plain argument read with `autowire::FromValue`.
///   Accepts `default = expr` and `typed = "decl"`.
///
/// Fields with neither attribute use `Default::default()`.
#[proc_macro_derive(Autowire, attributes(autowire, inject, param))]
pub fn derive_autowire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Autowire can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Autowire can only be derived for structs",
            ));
        }
    };

    let class = ClassAttrs::parse(&input.attrs)?;
    let class_name = class
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| name.unraw().to_string());
    let extends = class.extends.iter();

    let mut params = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;
        let param_name = field_name.unraw().to_string();
        let index = params.len();

        match FieldAttr::parse(&field.attrs)? {
            Some(FieldAttr::Inject { optional, class }) => {
                let dependency = Dependency::of(field_type, optional)?;
                let declared = match class {
                    Some(lit) => lit.value(),
                    None => dependency.label().ok_or_else(|| {
                        syn::Error::new_spanned(
                            field_type,
                            "cannot infer the dependency type, add #[inject(class = \"Id\")]",
                        )
                    })?,
                };
                let declared = if dependency.optional {
                    format!("?{declared}")
                } else {
                    declared
                };
                params.push(quote! {
                    .param(::autowire::Param::new(#param_name).typed(#declared))
                });
                let access = dependency.access(index);
                field_inits.push(quote! { #field_name: #access });
            }
            Some(FieldAttr::Param { default, typed }) => {
                let typed = match typed {
                    Some(lit) => quote! { #lit },
                    None => quote! { <#field_type as ::autowire::FromValue>::TYPE_HINT },
                };
                let default = default.map(|expr| quote! { .default(#expr) });
                params.push(quote! {
                    .param(::autowire::Param::new(#param_name).typed(#typed) #default)
                });
                field_inits.push(quote! { #field_name: __args.take::<#field_type>(#index)? });
            }
            None => {
                // Non-injected field - use Default
                field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::autowire::Autowired for #name #ty_generics #where_clause {
            fn describe() -> ::autowire::Class<Self> {
                ::autowire::Class::<Self>::new(#class_name)
                    #(.extends(#extends))*
                    #(#params)*
                    .construct(|__args| {
                        ::std::result::Result::Ok(Self {
                            #(#field_inits),*
                        })
                    })
            }
        }
    })
}

// =============================================================================
// Attributes
// =============================================================================

#[derive(Default)]
struct ClassAttrs {
    name: Option<LitStr>,
    extends: Vec<LitStr>,
}

impl ClassAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("autowire")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("extends") {
                    out.extends.push(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `name` or `extends`"))
                }
            })?;
        }
        Ok(out)
    }
}

enum FieldAttr {
    Inject {
        optional: bool,
        class: Option<LitStr>,
    },
    Param {
        default: Option<Expr>,
        typed: Option<LitStr>,
    },
}

impl FieldAttr {
    /// Find and parse the #[inject] or #[param] attribute
    fn parse(attrs: &[Attribute]) -> syn::Result<Option<Self>> {
        for attr in attrs {
            if attr.path().is_ident("inject") {
                let mut optional = false;
                let mut class = None;
                if attr.meta.require_path_only().is_err() {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("optional") {
                            optional = true;
                            Ok(())
                        } else if meta.path.is_ident("class") {
                            class = Some(meta.value()?.parse()?);
                            Ok(())
                        } else {
                            Err(meta.error("expected `optional` or `class`"))
                        }
                    })?;
                }
                return Ok(Some(FieldAttr::Inject { optional, class }));
            }

            if attr.path().is_ident("param") {
                let mut default = None;
                let mut typed = None;
                if attr.meta.require_path_only().is_err() {
                    attr.parse_nested_meta(|meta| {
                        if meta.path.is_ident("default") {
                            default = Some(meta.value()?.parse()?);
                            Ok(())
                        } else if meta.path.is_ident("typed") {
                            typed = Some(meta.value()?.parse()?);
                            Ok(())
                        } else {
                            Err(meta.error("expected `default` or `typed`"))
                        }
                    })?;
                }
                return Ok(Some(FieldAttr::Param { default, typed }));
            }
        }
        Ok(None)
    }
}

// =============================================================================
// Dependency fields
// =============================================================================

struct Dependency<'a> {
    /// `T` of `Arc<T>`
    inner: &'a Type,
    optional: bool,
}

impl<'a> Dependency<'a> {
    fn of(ty: &'a Type, optional: bool) -> syn::Result<Self> {
        if let Some(inner) = extract_option_arc_inner_type(ty) {
            return Ok(Self {
                inner,
                optional: true,
            });
        }
        if optional {
            return Err(syn::Error::new_spanned(
                ty,
                "Fields marked with #[inject(optional)] must have type Option<Arc<T>>",
            ));
        }
        match extract_arc_inner_type(ty) {
            Some(inner) => Ok(Self {
                inner,
                optional: false,
            }),
            None => Err(syn::Error::new_spanned(
                ty,
                "Fields marked with #[inject] must have type Arc<T> or Option<Arc<T>>",
            )),
        }
    }

    fn is_interface(&self) -> bool {
        matches!(self.inner, Type::TraitObject(_))
    }

    /// Identifier inferred from the type: last path segment or trait name
    fn label(&self) -> Option<String> {
        match self.inner {
            Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
            Type::TraitObject(object) => object.bounds.iter().find_map(|bound| match bound {
                syn::TypeParamBound::Trait(t) => t.path.segments.last().map(|s| s.ident.to_string()),
                _ => None,
            }),
            _ => None,
        }
    }

    fn access(&self, index: usize) -> proc_macro2::TokenStream {
        let inner = self.inner;
        match (self.is_interface(), self.optional) {
            (false, false) => quote! { __args.object::<#inner>(#index)? },
            (false, true) => quote! { __args.optional::<#inner>(#index)? },
            (true, false) => quote! { __args.interface::<#inner>(#index)? },
            (true, true) => quote! { __args.optional_interface::<#inner>(#index)? },
        }
    }
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Option").and_then(extract_arc_inner_type)
}

fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}
