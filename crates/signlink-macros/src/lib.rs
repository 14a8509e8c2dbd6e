//! Procedural macros used by `signlink`.
//!
//! Do not use this crate directly, use `signlink` instead.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse::Error, spanned::Spanned, ItemFn, ReturnType};

/// Turns `main` into a logged entry point.
///
/// The function may return `()` or `anyhow::Result<()>`. Errors are logged with their cause chain
/// and make the process exit with status 1.
#[proc_macro_attribute]
pub fn main(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    match expand_main(args.into(), item.clone()) {
        Ok(tokens) => tokens.into(),
        Err(err) => {
            // Emit the `compile_error!` invocation, alongside the original item, in an attempt to
            // improve IDE support.
            let mut error = item;
            error.extend(err.to_compile_error());
            error.into()
        }
    }
}

fn expand_main(args: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !args.is_empty() {
        return Err(Error::new(
            Span::call_site(),
            "`#[signlink::main]` does not accept arguments",
        ));
    }

    let item = syn::parse2::<ItemFn>(item)?;
    let sig = &item.sig;

    if sig.ident != "main" {
        return Err(Error::new(
            sig.ident.span(),
            "`#[signlink::main]` must be applied to a function called `main`",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(Error::new(
            asyncness.span(),
            "`#[signlink::main]` cannot be applied to an `async fn`",
        ));
    }
    if !sig.inputs.is_empty() {
        return Err(Error::new(
            sig.inputs.span(),
            "`main` cannot take parameters, use `std::env::args` instead",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(Error::new(
            sig.generics.span(),
            "`main` cannot be generic",
        ));
    }

    let call = match &sig.output {
        ReturnType::Default => quote! {
            ::signlink::run(|| {
                main();
                ::std::result::Result::Ok(())
            })
        },
        ReturnType::Type(..) => quote! { ::signlink::run(main) },
    };

    Ok(quote! {
        fn main() {
            #item

            ::signlink::init_logger!();

            #call;
        }
    })
}
