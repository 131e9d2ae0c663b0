use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::visit_mut::VisitMut;
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericArgument, GenericParam,
    Ident, LitStr, Path, PathArguments, Type,
};

/// Derive macro for reflective field access.
///
/// On a struct with named fields, generates `morph_api::Reflect`,
/// `morph_api::Data` and `morph_api::Describe`. On a unit-only enum, generates
/// `morph_api::Data` and `morph_api::DescribeEnum`.
///
/// The struct must implement `Clone` and `Debug`, and `Default` unless it is
/// marked `#[reflect(no_default)]`.
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect, Clone, Debug, Default)]
/// #[reflect(getter(method = "get_label", ty = "String"))]
/// pub struct Order {
///     #[reflect(alias = "order_id")]
///     pub id: i64,
///
///     #[reflect(expandable)]
///     pub lines: Vec<Line>,
///
///     #[reflect(source(name = "customer.name", when = "OrderDto"))]
///     pub customer_name: String,
/// }
/// ```
///
/// Struct attributes: `no_default`, `getter(method, ty, expandable)`,
/// `setter(method, ty, expandable)`, `constructor(path, arg)`,
/// `factory(path, arg)`, `into(method, ty)`.
///
/// Field attributes: `skip`, `expandable`, `class_level`, `alias = "..."`,
/// `source = "..."`, `source(name, when)`, `parent`.
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let result = match &input.data {
        Data::Struct(_) => derive_struct(&input),
        Data::Enum(_) => derive_enum(&input),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect only supports structs and enums",
        )),
    };
    match result {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Attribute parsing
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct StructAttrs {
    no_default: bool,
    accessors: Vec<AccessorAttr>,
    constructors: Vec<ConversionAttr>,
    factories: Vec<ConversionAttr>,
    methods: Vec<MethodAttr>,
}

struct AccessorAttr {
    method: Ident,
    ty: Type,
    getter: bool,
    expandable: bool,
}

struct ConversionAttr {
    path: Path,
    arg: Type,
}

struct MethodAttr {
    method: Ident,
    ty: Type,
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    expandable: bool,
    class_level: bool,
    parent: bool,
    aliases: Vec<String>,
    sources: Vec<(String, Option<String>)>,
}

fn parse_struct_attrs(input: &DeriveInput) -> Result<StructAttrs, syn::Error> {
    let mut attrs = StructAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("no_default") {
                attrs.no_default = true;
            } else if meta.path.is_ident("getter") || meta.path.is_ident("setter") {
                let getter = meta.path.is_ident("getter");
                let mut method: Option<LitStr> = None;
                let mut ty: Option<LitStr> = None;
                let mut expandable = false;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("method") {
                        method = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("ty") {
                        ty = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("expandable") {
                        expandable = true;
                    } else {
                        return Err(inner.error("expected `method`, `ty` or `expandable`"));
                    }
                    Ok(())
                })?;
                let method = method.ok_or_else(|| meta.error("missing `method = \"...\"`"))?;
                let ty = ty.ok_or_else(|| meta.error("missing `ty = \"...\"`"))?;
                let name = method.value();
                let conventional = if getter {
                    has_accessor_prefix(&name, "get") || has_accessor_prefix(&name, "is")
                } else {
                    has_accessor_prefix(&name, "set")
                };
                if !conventional {
                    return Err(syn::Error::new_spanned(
                        &method,
                        "accessor names must start with `get`/`is` (getters) or `set` (setters) followed by `_` or an upper-case letter",
                    ));
                }
                attrs.accessors.push(AccessorAttr {
                    method: method.parse()?,
                    ty: ty.parse()?,
                    getter,
                    expandable,
                });
            } else if meta.path.is_ident("constructor") || meta.path.is_ident("factory") {
                let constructor = meta.path.is_ident("constructor");
                let mut path: Option<LitStr> = None;
                let mut arg: Option<LitStr> = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("path") {
                        path = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("arg") {
                        arg = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `path` or `arg`"));
                    }
                    Ok(())
                })?;
                let path = path.ok_or_else(|| meta.error("missing `path = \"...\"`"))?;
                let arg = arg.ok_or_else(|| meta.error("missing `arg = \"...\"`"))?;
                let conversion = ConversionAttr { path: path.parse()?, arg: arg.parse()? };
                if constructor {
                    attrs.constructors.push(conversion);
                } else {
                    attrs.factories.push(conversion);
                }
            } else if meta.path.is_ident("into") {
                let mut method: Option<LitStr> = None;
                let mut ty: Option<LitStr> = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("method") {
                        method = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("ty") {
                        ty = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `method` or `ty`"));
                    }
                    Ok(())
                })?;
                let method = method.ok_or_else(|| meta.error("missing `method = \"...\"`"))?;
                let ty = ty.ok_or_else(|| meta.error("missing `ty = \"...\"`"))?;
                attrs.methods.push(MethodAttr { method: method.parse()?, ty: ty.parse()? });
            } else {
                return Err(meta.error("unknown reflect attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs, syn::Error> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("expandable") {
                attrs.expandable = true;
            } else if meta.path.is_ident("class_level") {
                attrs.class_level = true;
            } else if meta.path.is_ident("parent") {
                attrs.parent = true;
            } else if meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.aliases.push(value.value());
            } else if meta.path.is_ident("source") {
                if meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    attrs.sources.push((value.value(), None));
                } else {
                    let mut name: Option<LitStr> = None;
                    let mut when: Option<LitStr> = None;
                    meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("name") {
                            name = Some(inner.value()?.parse()?);
                        } else if inner.path.is_ident("when") {
                            when = Some(inner.value()?.parse()?);
                        } else {
                            return Err(inner.error("expected `name` or `when`"));
                        }
                        Ok(())
                    })?;
                    let name = name.ok_or_else(|| meta.error("missing `name = \"...\"`"))?;
                    attrs.sources.push((name.value(), when.map(|w| w.value())));
                }
            } else {
                return Err(meta.error("unknown reflect field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn has_accessor_prefix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '_' || c.is_uppercase())
}

// ═══════════════════════════════════════════════════════════════
//  Structs
// ═══════════════════════════════════════════════════════════════

fn derive_struct(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Reflect only supports structs with named fields",
                ))
            }
        },
        _ => unreachable!("derive_struct called for a non-struct"),
    };

    let mut params: Vec<Ident> = Vec::new();
    for param in &input.generics.params {
        match param {
            GenericParam::Type(t) => params.push(t.ident.clone()),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Reflect supports type parameters only",
                ))
            }
        }
    }

    let attrs = parse_struct_attrs(input)?;
    let generic = !params.is_empty();
    if generic
        && (!attrs.constructors.is_empty()
            || !attrs.factories.is_empty()
            || !attrs.methods.is_empty())
    {
        return Err(syn::Error::new_spanned(
            name,
            "`constructor`, `factory` and `into` are not supported on generic types",
        ));
    }

    let mut field_descriptors = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut parent: Option<(Ident, Type)> = None;
    let mut bounded: Vec<Type> = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_attrs = parse_field_attrs(field)?;
        if field_attrs.skip {
            continue;
        }
        if field_attrs.parent {
            if parent.is_some() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "only one `parent` field is allowed",
                ));
            }
            parent = Some((field_ident.clone(), field.ty.clone()));
            continue;
        }

        let field_str = field_ident.to_string();
        let ty_expr = type_ref_expr(&field.ty, &params)?;
        let field_ty = &field.ty;
        if mentions_param(quote!(#field_ty), &params) {
            bounded.push(field.ty.clone());
        }
        let expandable = field_attrs.expandable;
        let class_level = field_attrs.class_level;
        let aliases = &field_attrs.aliases;
        let sources = field_attrs.sources.iter().map(|(source, when)| {
            let when = match when {
                Some(w) => quote! { Some(#w) },
                None => quote! { None },
            };
            quote! { morph_api::SourceName { name: #source, when: #when } }
        });

        field_descriptors.push(quote! {
            {
                let mut field = morph_api::FieldDescriptor::new(#field_str, #ty_expr);
                field.expandable = #expandable;
                field.class_level = #class_level;
                field.aliases = vec![#(#aliases),*];
                field.sources = vec![#(#sources),*];
                field
            }
        });
        get_arms.push(quote! {
            #field_str => Ok(morph_api::Data::to_value(&self.#field_ident)),
        });
        set_arms.push(quote! {
            #field_str => {
                self.#field_ident = morph_api::Data::from_value(value)
                    .map_err(|e| e.with_context(#field_str))?;
                Ok(())
            }
        });
    }

    let mut accessor_descriptors = Vec::new();
    let mut getter_arms = Vec::new();
    let mut setter_arms = Vec::new();
    for accessor in &attrs.accessors {
        let method = &accessor.method;
        let method_str = method.to_string();
        let ty = &accessor.ty;
        let ty_expr = type_ref_expr(ty, &params)?;
        if mentions_param(quote!(#ty), &params) {
            bounded.push(ty.clone());
        }
        let expandable = accessor.expandable;
        let kind = if accessor.getter {
            quote! { morph_api::AccessorKind::Getter }
        } else {
            quote! { morph_api::AccessorKind::Setter }
        };
        accessor_descriptors.push(quote! {
            morph_api::AccessorDescriptor {
                method: #method_str,
                kind: #kind,
                ty: #ty_expr,
                expandable: #expandable,
            }
        });
        if accessor.getter {
            getter_arms.push(quote! {
                #method_str => Ok(<#ty as morph_api::Data>::to_value(&self.#method())),
            });
        } else {
            setter_arms.push(quote! {
                #method_str => {
                    self.#method(<#ty as morph_api::Data>::from_value(value)
                        .map_err(|e| e.with_context(#method_str))?);
                    Ok(())
                }
            });
        }
    }

    let (parent_descriptor, get_fallback, set_fallback, getter_fallback, setter_fallback) =
        match &parent {
            Some((ident, ty)) => {
                let ident_str = ident.to_string();
                let erased = erase(ty, &params);
                (
                    quote! {
                        Some(morph_api::ParentDescriptor {
                            field: #ident_str,
                            descriptor: <#erased as morph_api::Describe>::type_descriptor,
                        })
                    },
                    quote! { morph_api::Reflect::get(&self.#ident, field) },
                    quote! { morph_api::Reflect::set(&mut self.#ident, field, value) },
                    quote! { morph_api::Reflect::call_getter(&self.#ident, method) },
                    quote! { morph_api::Reflect::call_setter(&mut self.#ident, method, value) },
                )
            }
            None => (
                quote! { None },
                quote! {
                    Err(morph_api::ReflectError::access(format!("{} has no field '{}'", #name_str, field)))
                },
                quote! {
                    {
                        let _ = value;
                        Err(morph_api::ReflectError::access(format!("{} has no field '{}'", #name_str, field)))
                    }
                },
                quote! {
                    Err(morph_api::ReflectError::access(format!("{} has no getter '{}'", #name_str, method)))
                },
                quote! {
                    {
                        let _ = value;
                        Err(morph_api::ReflectError::access(format!("{} has no setter '{}'", #name_str, method)))
                    }
                },
            ),
        };

    let constructors = attrs.constructors.iter().map(|c| {
        let path = &c.path;
        let arg = &c.arg;
        let path_str = quote!(#path).to_string().replace(' ', "");
        quote! {
            morph_api::Conversion {
                path: #path_str,
                arg: <#arg as morph_api::Data>::type_ref(),
                call: |value| {
                    let arg = <#arg as morph_api::Data>::from_value(value)?;
                    let built: #name = #path(arg);
                    Ok(morph_api::Data::to_value(&built))
                },
            }
        }
    });
    let factories = attrs.factories.iter().map(|c| {
        let path = &c.path;
        let arg = &c.arg;
        let path_str = quote!(#path).to_string().replace(' ', "");
        quote! {
            morph_api::Conversion {
                path: #path_str,
                arg: <#arg as morph_api::Data>::type_ref(),
                call: |value| {
                    let arg = <#arg as morph_api::Data>::from_value(value)?;
                    let built: #name = #path(arg).map_err(|e| {
                        morph_api::ReflectError::type_mismatch(format!("{}: {}", #path_str, e))
                    })?;
                    Ok(morph_api::Data::to_value(&built))
                },
            }
        }
    });
    let methods = attrs.methods.iter().map(|m| {
        let method = &m.method;
        let method_str = method.to_string();
        let ty = &m.ty;
        quote! {
            morph_api::UserMethod {
                method: #method_str,
                target: <#ty as morph_api::Data>::type_ref(),
                call: |object| {
                    let this = object.as_any().downcast_ref::<#name>().ok_or_else(|| {
                        morph_api::ReflectError::expected(#name_str, object.descriptor().name)
                    })?;
                    Ok(<#ty as morph_api::Data>::to_value(&this.#method()))
                },
            }
        }
    });

    let param_strs = params.iter().map(|p| p.to_string());
    let param_idents = &params;

    let mut generics = input.generics.clone();
    let (_, ty_generics, _) = input.generics.split_for_impl();
    {
        let where_clause = generics.make_where_clause();
        for param in &params {
            where_clause.predicates.push(parse_quote! { #param: morph_api::Data });
        }
        // Member types built from parameters (`Page<T>`) carry their own bounds.
        for ty in &bounded {
            where_clause.predicates.push(parse_quote! { #ty: morph_api::Data });
        }
        if let Some((_, ty)) = &parent {
            if mentions_param(quote!(#ty), &params) {
                where_clause.predicates.push(parse_quote! { #ty: morph_api::Reflect });
            }
        }
        where_clause.predicates.push(parse_quote! {
            #name #ty_generics: ::core::clone::Clone + ::core::fmt::Debug
        });
        if !attrs.no_default {
            where_clause
                .predicates
                .push(parse_quote! { #name #ty_generics: ::core::default::Default });
        }
    }
    let (impl_generics, _, where_clause) = generics.split_for_impl();

    let construct_body = if attrs.no_default {
        quote! {
            Err(morph_api::ReflectError::construct(format!("{} has no usable constructor", #name_str)))
        }
    } else {
        quote! { Ok(<Self as ::core::default::Default>::default()) }
    };

    Ok(quote! {
        impl #impl_generics morph_api::Describe for #name #ty_generics #where_clause {
            fn type_descriptor() -> &'static morph_api::TypeDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<morph_api::TypeDescriptor> =
                    ::std::sync::LazyLock::new(|| {
                        let mut descriptor = morph_api::TypeDescriptor::new(#name_str);
                        descriptor.type_params = vec![#(#param_strs),*];
                        descriptor.fields = vec![#(#field_descriptors),*];
                        descriptor.accessors = vec![#(#accessor_descriptors),*];
                        descriptor.parent = #parent_descriptor;
                        descriptor.constructors = vec![#(#constructors),*];
                        descriptor.factories = vec![#(#factories),*];
                        descriptor.methods = vec![#(#methods),*];
                        descriptor
                    });
                &DESCRIPTOR
            }

            fn construct() -> Result<Self, morph_api::ReflectError> {
                #construct_body
            }
        }

        impl #impl_generics morph_api::Data for #name #ty_generics #where_clause {
            fn type_ref() -> morph_api::TypeRef {
                morph_api::TypeRef::Object(morph_api::ObjectType {
                    descriptor: <Self as morph_api::Describe>::type_descriptor,
                    args: vec![#(<#param_idents as morph_api::Data>::type_ref()),*],
                    factory: <Self as morph_api::Describe>::construct_boxed,
                })
            }

            fn to_value(&self) -> morph_api::Value {
                morph_api::Value::Object(morph_api::ObjectBox::new(
                    ::std::boxed::Box::new(::core::clone::Clone::clone(self)),
                ))
            }

            fn from_value(value: morph_api::Value) -> Result<Self, morph_api::ReflectError> {
                morph_api::data::object_from_value::<Self>(value)
            }
        }

        impl #impl_generics morph_api::Reflect for #name #ty_generics #where_clause {
            fn descriptor(&self) -> &'static morph_api::TypeDescriptor {
                <Self as morph_api::Describe>::type_descriptor()
            }

            fn type_ref(&self) -> morph_api::TypeRef {
                <Self as morph_api::Data>::type_ref()
            }

            fn get(&self, field: &str) -> Result<morph_api::Value, morph_api::ReflectError> {
                match field {
                    #(#get_arms)*
                    _ => #get_fallback,
                }
            }

            fn set(
                &mut self,
                field: &str,
                value: morph_api::Value,
            ) -> Result<(), morph_api::ReflectError> {
                match field {
                    #(#set_arms)*
                    _ => #set_fallback,
                }
            }

            fn call_getter(&self, method: &str) -> Result<morph_api::Value, morph_api::ReflectError> {
                match method {
                    #(#getter_arms)*
                    _ => #getter_fallback,
                }
            }

            fn call_setter(
                &mut self,
                method: &str,
                value: morph_api::Value,
            ) -> Result<(), morph_api::ReflectError> {
                match method {
                    #(#setter_arms)*
                    _ => #setter_fallback,
                }
            }

            fn clone_object(&self) -> ::std::boxed::Box<dyn morph_api::Reflect> {
                ::std::boxed::Box::new(::core::clone::Clone::clone(self))
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }
    })
}

// ═══════════════════════════════════════════════════════════════
//  Enums
// ═══════════════════════════════════════════════════════════════

fn derive_enum(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect enums cannot be generic",
        ));
    }
    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => unreachable!("derive_enum called for a non-enum"),
    };
    let mut variant_idents = Vec::new();
    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Reflect enums support unit variants only",
            ));
        }
        variant_idents.push(&variant.ident);
    }
    let variant_strs: Vec<String> = variant_idents.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl morph_api::DescribeEnum for #name {
            fn enum_descriptor() -> &'static morph_api::EnumDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<morph_api::EnumDescriptor> =
                    ::std::sync::LazyLock::new(|| morph_api::EnumDescriptor {
                        name: #name_str,
                        variants: vec![#(#variant_strs),*],
                    });
                &DESCRIPTOR
            }
        }

        impl morph_api::Data for #name {
            fn type_ref() -> morph_api::TypeRef {
                morph_api::TypeRef::Enum(morph_api::EnumType {
                    descriptor: <Self as morph_api::DescribeEnum>::enum_descriptor,
                })
            }

            fn to_value(&self) -> morph_api::Value {
                let ty = morph_api::EnumType {
                    descriptor: <Self as morph_api::DescribeEnum>::enum_descriptor,
                };
                match self {
                    #(Self::#variant_idents => morph_api::data::enum_to_value(ty, #variant_strs),)*
                }
            }

            fn from_value(value: morph_api::Value) -> Result<Self, morph_api::ReflectError> {
                let descriptor = <Self as morph_api::DescribeEnum>::enum_descriptor();
                match morph_api::data::enum_variant(descriptor, &value)? {
                    #(#variant_strs => Ok(Self::#variant_idents),)*
                    other => Err(morph_api::ReflectError::type_mismatch(format!(
                        "{} has no variant '{}'",
                        #name_str, other
                    ))),
                }
            }
        }
    })
}

// ═══════════════════════════════════════════════════════════════
//  Type translation
// ═══════════════════════════════════════════════════════════════

/// Build the `TypeRef` expression for a field type.
///
/// Types without type parameters go through their own `Data::type_ref()`.
/// Types mentioning a parameter are rebuilt structurally: the parameter
/// becomes `TypeRef::Param("T")` and the surrounding type is taken from the
/// erased form with its arguments swapped back in.
fn type_ref_expr(ty: &Type, params: &[Ident]) -> Result<TokenStream2, syn::Error> {
    if !mentions_param(quote!(#ty), params) {
        return Ok(quote! { <#ty as morph_api::Data>::type_ref() });
    }
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            let path = &type_path.path;
            if let Some(ident) = path.get_ident() {
                if params.contains(ident) {
                    let param = ident.to_string();
                    return Ok(quote! { morph_api::TypeRef::Param(#param) });
                }
            }
            let last = path
                .segments
                .last()
                .ok_or_else(|| syn::Error::new_spanned(ty, "empty type path"))?;
            let args: Vec<&Type> = match &last.arguments {
                PathArguments::AngleBracketed(a) => a
                    .args
                    .iter()
                    .filter_map(|arg| match arg {
                        GenericArgument::Type(t) => Some(t),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            if last.ident == "Arc" {
                if let Some(inner) = args.first().and_then(|t| rwlock_inner(t)) {
                    let inner = type_ref_expr(inner, params)?;
                    return Ok(quote! { morph_api::TypeRef::shared(#inner) });
                }
            }
            let translated = args
                .iter()
                .map(|arg| type_ref_expr(arg, params))
                .collect::<Result<Vec<_>, _>>()?;
            let erased = erase_args(ty, params);
            Ok(quote! {
                <#erased as morph_api::Data>::type_ref().with_type_args(vec![#(#translated),*])
            })
        }
        Type::Array(array) => {
            let elem = type_ref_expr(&array.elem, params)?;
            Ok(quote! { morph_api::TypeRef::array(#elem) })
        }
        // Only reachable as the argument of `Box<[T]>`; the array type
        // receives the element type as its single argument.
        Type::Slice(slice) => type_ref_expr(&slice.elem, params),
        Type::Paren(paren) => type_ref_expr(&paren.elem, params),
        Type::Group(group) => type_ref_expr(&group.elem, params),
        other => Err(syn::Error::new_spanned(
            other,
            "unsupported field type for a generic Reflect struct",
        )),
    }
}

/// `RwLock<X>` → `X`.
fn rwlock_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;
    if last.ident != "RwLock" {
        return None;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(a) => a.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(t) => Some(t),
            _ => None,
        }),
        _ => None,
    }
}

fn mentions_param(tokens: TokenStream2, params: &[Ident]) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => params.contains(&ident),
        TokenTree::Group(group) => mentions_param(group.stream(), params),
        _ => false,
    })
}

/// Replace every type parameter with `morph_api::data::Erased`.
fn erase(ty: &Type, params: &[Ident]) -> Type {
    struct Eraser<'a> {
        params: &'a [Ident],
    }

    impl VisitMut for Eraser<'_> {
        fn visit_type_mut(&mut self, ty: &mut Type) {
            if let Type::Path(type_path) = ty {
                if type_path.qself.is_none() {
                    if let Some(ident) = type_path.path.get_ident() {
                        if self.params.contains(ident) {
                            *ty = parse_quote! { morph_api::data::Erased };
                            return;
                        }
                    }
                }
            }
            syn::visit_mut::visit_type_mut(self, ty);
        }
    }

    let mut erased = ty.clone();
    Eraser { params }.visit_type_mut(&mut erased);
    erased
}

/// Replace the immediate type arguments that mention a parameter with
/// `morph_api::data::Erased`. `Option<Arc<RwLock<T>>>` → `Option<Erased>`.
fn erase_args(ty: &Type, params: &[Ident]) -> Type {
    let mut erased = ty.clone();
    if let Type::Path(type_path) = &mut erased {
        if let Some(last) = type_path.path.segments.last_mut() {
            if let PathArguments::AngleBracketed(args) = &mut last.arguments {
                for arg in args.args.iter_mut() {
                    if let GenericArgument::Type(t) = arg {
                        if mentions_param(quote!(#t), params) {
                            *t = parse_quote! { morph_api::data::Erased };
                        }
                    }
                }
            }
        }
    }
    erased
}
