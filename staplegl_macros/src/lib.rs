use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, Error, Fields};

/// Implements `staplegl::VertexSource` for a `#[repr(C)]` struct with named fields.
///
/// Every field becomes one attribute, named after the field, in declaration order. The field
/// types must implement `ShaderField`. A compile-time check rejects structs whose size doesn't
/// match the sum of their attributes, which would mean the compiler inserted padding.
///
/// ```ignore
/// #[repr(C)]
/// #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
/// struct Particle {
///     offset: [f32; 3],
///     tint: [f32; 4],
/// }
/// ```
#[proc_macro_derive(Vertex)]
pub fn vertex(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let mut is_repr_c = false;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("repr")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                is_repr_c = true;
            } else if meta.input.peek(syn::token::Paren) {
                let _args;
                syn::parenthesized!(_args in meta.input);
            }
            Ok(())
        });

        if let Err(e) = parsed {
            return e.to_compile_error().into();
        }
    }

    if !is_repr_c {
        return Error::new(
            input.ident.span(),
            "Vertex types must be #[repr(C)] so their field order matches the attribute order",
        )
        .to_compile_error()
        .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Error::new(other.span(), "Vertex types must have named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return Error::new(input.span(), "Vertex can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    if fields.is_empty() {
        return Error::new(input.span(), "Vertex types must have at least one field")
            .to_compile_error()
            .into();
    }

    if !input.generics.params.is_empty() {
        return Error::new(input.generics.span(), "Vertex types can't be generic")
            .to_compile_error()
            .into();
    }

    let type_ident = &input.ident;

    let attributes = fields.iter().map(|field| {
        let ty = &field.ty;
        let name = field
            .ident
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        quote! {
            ::staplegl::staplegl_utils::AttributeDesc::of::<#ty>(#name)
        }
    });

    let size_message = format!(
        "{type_ident} has padding between its fields and can't be used as a vertex layout"
    );

    quote! {
        impl ::staplegl::staplegl_utils::VertexSource for #type_ident {
            const ATTRIBUTES: &'static [::staplegl::staplegl_utils::AttributeDesc] = &[
                #(#attributes,)*
            ];
        }

        const _: () = ::std::assert!(
            ::staplegl::staplegl_utils::attributes_size(
                <#type_ident as ::staplegl::staplegl_utils::VertexSource>::ATTRIBUTES
            ) == ::std::mem::size_of::<#type_ident>(),
            #size_message
        );
    }
    .into()
}
