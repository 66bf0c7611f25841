use apollo_compiler::resolvers::FieldError;
use apollo_compiler::resolvers::ResolveInfo;
use serde_json_bytes::Value as JsonValue;

use crate::store::StoreError;

/// Implements [`AsyncObjectValue`](apollo_compiler::resolvers::AsyncObjectValue) with reduced
/// boilerplate
///
/// Define:
///
/// * The implementing Rust type
/// * The __typename string
/// * One pseudo-method per field. Types are omitted in the signature for brevity.
///   - Takes two optional arguments: `&self` (which must be spelled something else because macros)
///     and `info: `[`&ResolveInfo`][ResolveInfo] for the field arguments.
///   - The body is async: it may `.await` and use `?`.
///   - Returns `Result<AsyncResolvedValue, FieldError>`, `Err` it turned into a field error
///
/// Also defines `FIELDS`, the names of the fields the resolver knows about, so that the type
/// graph can check at startup that every schema field has a resolver.
macro_rules! impl_resolver {
    (
        for $ty: ty:
        __typename = $type_name: expr;
        $(
            async fn $field_name: ident(
                $( &$self_: ident $(, $( $info: ident $(,)? )? )? )?
            ) $block: block
        )*

    ) => {
        impl $ty {
            pub(crate) const FIELDS: &'static [&'static str] = &[$(stringify!($field_name)),*];
        }

        impl ::apollo_compiler::resolvers::AsyncObjectValue for $ty {
            fn type_name(&self) -> &str {
                $type_name
            }

            fn resolve_field<'a>(
                &'a self,
                info: &'a ::apollo_compiler::resolvers::ResolveInfo<'a>,
            ) -> ::futures::future::BoxFuture<
                'a,
                Result<
                    ::apollo_compiler::resolvers::AsyncResolvedValue<'a>,
                    ::apollo_compiler::resolvers::FieldError,
                >,
            > {
                Box::pin(async move {
                    let _allow_unused = info;
                    let resolved: Result<
                        ::apollo_compiler::resolvers::AsyncResolvedValue<'a>,
                        ::apollo_compiler::resolvers::FieldError,
                    > = match info.field_name() {
                        $(
                            stringify!($field_name) => {
                                $(
                                    let $self_ = self;
                                    $($(
                                        let $info = info;
                                    )?)?
                                )?
                                $block
                            },
                        )*
                        _ => Err(::apollo_compiler::resolvers::AsyncObjectValue::unknown_field_error(
                            self, info,
                        )),
                    };
                    resolved
                })
            }
        }
    };
}

/// A store failure while resolving a field nulls that field only.
impl From<StoreError> for FieldError {
    fn from(error: StoreError) -> Self {
        tracing::error!(%error, "store lookup failed while resolving a field");
        FieldError {
            message: error.to_string(),
        }
    }
}

/// Typed access to field arguments, which execution has already coerced against the schema.
pub(crate) trait FieldArguments {
    /// An `Int` argument, `None` when absent or null.
    fn int_argument(&self, name: &str) -> Result<Option<i32>, FieldError>;

    /// A `String` argument, `None` when absent or null.
    fn string_argument(&self, name: &str) -> Result<Option<String>, FieldError>;

    /// A non-null `Int` argument.
    fn required_int_argument(&self, name: &str) -> Result<i32, FieldError> {
        self.int_argument(name)?
            .ok_or_else(|| field_error(format!("argument '{name}' is required")))
    }

    /// A non-null `String` argument.
    fn required_string_argument(&self, name: &str) -> Result<String, FieldError> {
        self.string_argument(name)?
            .ok_or_else(|| field_error(format!("argument '{name}' is required")))
    }
}

impl FieldArguments for ResolveInfo<'_> {
    fn int_argument(&self, name: &str) -> Result<Option<i32>, FieldError> {
        match self.arguments().get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|int| i32::try_from(int).ok())
                .map(Some)
                .ok_or_else(|| field_error(format!("argument '{name}' must be an Int"))),
        }
    }

    fn string_argument(&self, name: &str) -> Result<Option<String>, FieldError> {
        match self.arguments().get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(|str| Some(str.to_string()))
                .ok_or_else(|| field_error(format!("argument '{name}' must be a String"))),
        }
    }
}

fn field_error(message: String) -> FieldError {
    FieldError { message }
}
