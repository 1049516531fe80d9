//! Procedural macros for flow-lang builtin functions.
//!
//! Provides the `#[builtin]` attribute macro. Each annotated function is
//! left in place and additionally registered into the global builtin
//! registry via `inventory::submit!`, so the virtual machine and the
//! tree-walking interpreter resolve a builtin name through a table built
//! once at startup rather than by matching on name strings at every call
//! site.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Parse `name = "...", category = "..."[, host]` attribute arguments.
fn parse_builtin_args(attr_stream: TokenStream) -> (String, String, bool) {
    let attr_str = attr_stream.to_string();

    let mut name = String::new();
    let mut category = String::new();

    if let Some(start) = attr_str.find("name = \"") {
        let rest = &attr_str[start + 8..];
        if let Some(end) = rest.find('"') {
            name = rest[..end].to_string();
        }
    }

    if let Some(start) = attr_str.find("category = \"") {
        let rest = &attr_str[start + 12..];
        if let Some(end) = rest.find('"') {
            category = rest[..end].to_string();
        }
    }

    let wants_host = attr_str.split(',').map(|s| s.trim()).any(|s| s == "host");

    (name, category, wants_host)
}

/// Attribute macro for defining Flow builtin functions.
///
/// ```ignore
/// #[builtin(name = "sqrt", category = "numeric")]
/// pub fn builtin_sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
///     // ...
/// }
/// ```
///
/// Builtins that need to call back into a Flow function value (`map`,
/// `filter`, `reduce`) take the `host` flag and an extra parameter:
///
/// ```ignore
/// #[builtin(name = "map", category = "functional", host)]
/// pub fn builtin_map(args: &[Value], host: &mut dyn Host) -> Result<Value, RuntimeError> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn builtin(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);

    let (flow_name, category, wants_host) = parse_builtin_args(attr);

    let fn_name = func.sig.ident.clone();
    let fn_ident_str = fn_name.to_string();

    let name_to_use = if !flow_name.is_empty() {
        flow_name
    } else {
        fn_ident_str
    };

    let cat_to_use = if !category.is_empty() {
        category
    } else {
        "other".to_string()
    };

    let wrapper_name = quote::format_ident!("__register_{}", fn_name);

    let call_expr = if wants_host {
        quote! { #fn_name(args, host) }
    } else {
        quote! { #fn_name(args) }
    };

    let expanded = quote! {
        #func

        #[allow(non_snake_case)]
        fn #wrapper_name(
            args: &[crate::value::Value],
            host: &mut dyn crate::builtins::Host,
        ) -> Result<crate::value::Value, crate::error::RuntimeError> {
            #call_expr
        }

        inventory::submit! {
            crate::builtins::BuiltinEntry {
                name: #name_to_use,
                category: #cat_to_use,
                func: #wrapper_name,
            }
        }
    };

    TokenStream::from(expanded)
}
