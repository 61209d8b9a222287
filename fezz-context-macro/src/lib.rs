//! Procedural macros for Fezz context functions.
//!
//! This crate provides the `#[context_function]` attribute macro, which turns
//! an async fn taking the invocation context into a type implementing
//! `ContextFunction`.
//!
//! # Example
//!
//! ```ignore
//! use fezz_context::prelude::*;
//!
//! #[context_function(id = "hello-world")]
//! async fn hello_world(ctx: &mut Context) -> Result<ResponseOutput, FunctionError> {
//!     ctx.log("saying hello");
//!     Ok(ctx.res.text("Hello, World!", ResponseOptions::new()))
//! }
//!
//! // Generated: `HelloWorldFunction`, usable with `Invoker::invoke`.
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, punctuated::Punctuated, Expr, ExprLit, ItemFn, Lit, Meta, Token};

/// Attributes for the `#[context_function]` macro.
#[derive(Default, Debug)]
struct ContextFunctionAttrs {
    /// Function identifier, returned by `ContextFunction::name`.
    id: Option<String>,
    /// Optional description.
    description: Option<String>,
}

impl ContextFunctionAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = ContextFunctionAttrs::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected name = value"));
                }
            };

            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            let value = match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => lit_str.value(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected string literal")),
            };

            match ident.as_str() {
                "id" => attrs.id = Some(value),
                "description" => attrs.description = Some(value),
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            }
        }

        Ok(attrs)
    }
}

/// Declare a Fezz context function.
///
/// The annotated fn must be `async`, take a single `&mut Context` argument
/// and return `Result<ResponseOutput, FunctionError>`. A unit struct named
/// after the fn in PascalCase with a `Function` suffix is generated.
///
/// # Attributes
///
/// - `id` (required): function name reported to the invoker
/// - `description` (optional): exposed as `DESCRIPTION` on the generated struct
#[proc_macro_attribute]
pub fn context_function(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_context_function(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_context_function(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = ContextFunctionAttrs::parse_meta_list(args)?;

    let function_id = attrs.id.ok_or_else(|| {
        syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required attribute: id",
        )
    })?;
    let description = attrs.description.unwrap_or_default();

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "context_function must be async",
        ));
    }
    if input_fn.sig.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "context_function takes exactly one `&mut Context` argument",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}Function", to_pascal_case(&fn_name.to_string()));

    let expanded = quote! {
        #input_fn

        /// Generated context function wrapper.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Function description.
            pub const DESCRIPTION: &'static str = #description;

            /// Create a new instance of the function.
            pub fn new() -> Self {
                Self
            }
        }

        #[::fezz_context::prelude::async_trait]
        impl ::fezz_context::prelude::ContextFunction for #struct_name {
            async fn handle(
                &self,
                ctx: &mut ::fezz_context::prelude::Context,
            ) -> ::std::result::Result<
                ::fezz_context::prelude::ResponseOutput,
                ::fezz_context::prelude::FunctionError,
            > {
                #fn_name(ctx).await
            }

            fn name(&self) -> &str {
                #function_id
            }
        }
    };

    Ok(expanded)
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
