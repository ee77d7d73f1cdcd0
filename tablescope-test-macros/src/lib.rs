use darling::ast::NestedMeta;
use darling::FromMeta;
use proc_macro::{Span, TokenStream};
use quote::quote;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, Pat};

/// The Postgres major versions a local test instance is expected to run for.
const SUPPORTED_POSTGRES_VERSIONS: std::ops::RangeInclusive<u16> = 12..=16;

#[derive(Debug, FromMeta)]
enum TestArgsArg {
    Postgres(u16),
}

impl TestArgsArg {
    fn get_mod_part_name(&self) -> String {
        match self {
            TestArgsArg::Postgres(v) => format!("postgres_{}", v),
        }
    }

    /// Instances listen on `5400 + major version`.
    fn get_port(&self) -> Result<u16, darling::Error> {
        match self {
            TestArgsArg::Postgres(v) if SUPPORTED_POSTGRES_VERSIONS.contains(v) => Ok(5400 + v),
            TestArgsArg::Postgres(v) => Err(darling::Error::custom(format!(
                "No test instance for postgres {}, expected one of {:?}",
                v, SUPPORTED_POSTGRES_VERSIONS
            ))),
        }
    }
}

#[derive(Debug, FromMeta)]
struct TestArgs {
    #[darling(multiple, rename = "arg")]
    args: Vec<TestArgsArg>,
}

impl TestArgs {
    fn get_module_name(&self) -> String {
        self.args
            .iter()
            .map(|a| a.get_mod_part_name())
            .collect::<Vec<_>>()
            .join("_")
    }
}

fn argument_ident(input: &FnArg) -> Result<&Ident, darling::Error> {
    match input {
        FnArg::Typed(t) => match &*t.pat {
            Pat::Ident(i) => Ok(&i.ident),
            _ => Err(darling::Error::custom(
                "Only simple identifiers are supported as function arguments",
            )),
        },
        FnArg::Receiver(_) => Err(darling::Error::custom("Test functions cannot take self")),
    }
}

/// Runs the test against a fresh database on every listed Postgres version.
///
/// Each `arg(postgres = N)` provides one `&TestHelper` argument, connected to its own
/// throwaway database that is dropped again when the test succeeds.
#[proc_macro_attribute]
pub fn pg_test(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    match expand_pg_test(args, &input) {
        Ok(tokens) => tokens,
        Err(e) => TokenStream::from(e.write_errors()),
    }
}

fn expand_pg_test(args: TokenStream, input: &ItemFn) -> Result<TokenStream, darling::Error> {
    let function_name = &input.sig.ident;

    let attr_args = NestedMeta::parse_meta_list(args.into())?;
    let args = TestArgs::from_list(&attr_args)?;

    if input.sig.inputs.len() != args.args.len() {
        return Err(darling::Error::custom(format!(
            "Function is declared to have {} args, however attribute defines {} args",
            input.sig.inputs.len(),
            args.args.len()
        )));
    }

    let module_name = Ident::new(&args.get_module_name(), Span::call_site().into());

    let mut test_helpers_create = Vec::with_capacity(args.args.len());
    let mut test_helpers_stop = Vec::with_capacity(args.args.len());
    let mut arg_idents = Vec::with_capacity(args.args.len());

    for (arg, input) in args.args.iter().zip(input.sig.inputs.iter()) {
        let port = arg.get_port()?;
        let arg_ident = argument_ident(input)?;
        arg_idents.push(arg_ident.clone());

        let arg_name = arg_ident.to_string();

        test_helpers_create.push(quote! {
            let #arg_ident = crate::test_helpers::get_test_helper_on_port(#arg_name, #port).await;
        });
        test_helpers_stop.push(quote! {
            #arg_ident.stop().await;
        });
    }
    test_helpers_stop.reverse();

    let actual_test_function_name = quote::format_ident!("{module_name}_{function_name}");

    let invoke_actual_function = if input.sig.asyncness.is_some() {
        quote! {
            #function_name(#(&#arg_idents),*).await;
        }
    } else {
        quote! {
            #function_name(#(&#arg_idents),*);
        }
    };

    Ok(TokenStream::from(quote! {
        #input

        #[tokio::test]
        async fn #actual_test_function_name() {
            #(#test_helpers_create)*

            #invoke_actual_function

            #(#test_helpers_stop)*
        }
    }))
}
