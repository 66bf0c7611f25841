//! The GraphQL type graph: `User` and `Post` object types over the [`Store`](crate::store::Store),
//! with `Query` and `Mutation` roots.
//!
//! The graph is built once at startup from `schema.graphql` and one resolver per object type.
//! Building it checks that every field of every object type in the schema has a resolver.

#[macro_use]
mod resolver;

mod mutation;
mod post;
mod query;
mod user;

use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use apollo_compiler::resolvers::AsyncObjectValue;
use apollo_compiler::resolvers::Execution;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::Valid;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use http::Method;
use http::StatusCode;
use serde_json_bytes::Value;
use thiserror::Error;

use self::mutation::MutationResolver;
use self::post::PostResolver;
use self::query::QueryResolver;
use self::user::UserResolver;
use crate::graphql;
use crate::store::SharedStore;

/// The schema served on the GraphQL endpoint.
pub const SCHEMA_SDL: &str = include_str!("schema.graphql");

/// Fields each object type's resolver knows about.
const RESOLVERS: &[(&str, &[&str])] = &[
    ("Query", QueryResolver::FIELDS),
    ("Mutation", MutationResolver::FIELDS),
    ("User", UserResolver::FIELDS),
    ("Post", PostResolver::FIELDS),
];

/// The type graph could not be built.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum TypeGraphError {
    /// invalid schema: {0}
    InvalidSchema(String),

    /// no resolver for object type {type_name}
    MissingResolver { type_name: String },

    /// no resolver for field {type_name}.{field_name}
    MissingField {
        type_name: String,
        field_name: String,
    },
}

/// The static GraphQL type graph, shared by every request.
#[derive(Clone)]
pub struct TypeGraph {
    schema: Arc<Valid<Schema>>,
    store: SharedStore,
    introspection: bool,
}

impl TypeGraph {
    /// Builds the graph over `store`, serving `__schema` and `__type` only if `introspection`.
    pub fn new(store: SharedStore, introspection: bool) -> Result<Self, TypeGraphError> {
        let schema = Schema::parse_and_validate(SCHEMA_SDL, "schema.graphql")
            .map_err(|WithErrors { errors, .. }| TypeGraphError::InvalidSchema(errors.to_string()))?;
        check_resolvers(&schema, RESOLVERS)?;
        Ok(Self {
            schema: Arc::new(schema),
            store,
            introspection,
        })
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    /// Executes one GraphQL request.
    ///
    /// Requests that never reach execution (missing, unparsable or invalid documents, bad
    /// variables) get a 4xx status and no `data`. Once execution starts the status is 200, and
    /// field errors are reported next to the partial `data`.
    pub async fn execute(
        &self,
        request: &graphql::Request,
        method: &Method,
    ) -> (StatusCode, graphql::Response) {
        let graph = self.clone();
        let request = request.clone();
        let method = method.clone();
        let runtime = tokio::runtime::Handle::current();
        // Resolver execution holds non-`Send` state across store lookups.
        let job = tokio::task::spawn_blocking(move || {
            runtime.block_on(graph.execute_in_place(&request, &method))
        });
        match job.await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%error, "GraphQL execution did not complete");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    graphql::Response::from_errors(vec![
                        graphql::Error::builder()
                            .message("internal server error")
                            .extension_code(graphql::ERROR_CODE_INTERNAL)
                            .build(),
                    ]),
                )
            }
        }
    }

    async fn execute_in_place(
        &self,
        request: &graphql::Request,
        method: &Method,
    ) -> (StatusCode, graphql::Response) {
        let source = match request.document() {
            Ok(source) => source,
            Err(error) => {
                return bad_request(vec![
                    graphql::Error::builder()
                        .message(error.to_string())
                        .extension_code(graphql::ERROR_CODE_BAD_REQUEST)
                        .build(),
                ]);
            }
        };
        let ast = match ast::Document::parse(source, "request.graphql") {
            Ok(ast) => ast,
            Err(WithErrors { errors, .. }) => {
                return document_errors(graphql::ERROR_CODE_PARSE_FAILED, errors);
            }
        };
        let document = match ast.to_executable_validate(&self.schema) {
            Ok(document) => document,
            Err(WithErrors { errors, .. }) => {
                return document_errors(graphql::ERROR_CODE_VALIDATION_FAILED, errors);
            }
        };
        let operation = match document.operations.get(request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => {
                return bad_request(vec![request_error(
                    error.to_graphql_error(&document.sources),
                )]);
            }
        };
        if operation.operation_type == OperationType::Mutation && *method != Method::POST {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                graphql::Response::from_errors(vec![
                    graphql::Error::builder()
                        .message("Mutations can only be sent over HTTP POST")
                        .extension_code("MUTATION_FORBIDDEN")
                        .build(),
                ]),
            );
        }

        let store = SharedStore::clone(&self.store);
        let root: Box<dyn AsyncObjectValue> = match operation.operation_type {
            OperationType::Mutation => Box::new(MutationResolver { store }),
            OperationType::Query | OperationType::Subscription => {
                Box::new(QueryResolver { store })
            }
        };
        let result = Execution::new(&self.schema, &document)
            .operation(operation)
            .raw_variable_values(&request.variables)
            .enable_schema_introspection(self.introspection)
            .execute_async(&*root)
            .await;
        match result {
            Ok(response) => {
                if !response.errors.is_empty() {
                    tracing::debug!(
                        errors = response.errors.len(),
                        "GraphQL request executed with field errors"
                    );
                }
                (
                    StatusCode::OK,
                    graphql::Response::builder()
                        .data(response.data.map(Value::Object).unwrap_or(Value::Null))
                        .errors(response.errors.into_iter().map(Into::into).collect())
                        .build(),
                )
            }
            // Variable values that do not match their declared types.
            Err(error) => bad_request(vec![request_error(
                error.to_graphql_error(&document.sources),
            )]),
        }
    }
}

fn bad_request(errors: Vec<graphql::Error>) -> (StatusCode, graphql::Response) {
    (StatusCode::BAD_REQUEST, graphql::Response::from_errors(errors))
}

fn request_error(error: apollo_compiler::response::GraphQLError) -> graphql::Error {
    let mut error = graphql::Error::from(error);
    error
        .extensions
        .entry("code")
        .or_insert(Value::from(graphql::ERROR_CODE_BAD_REQUEST));
    error
}

/// Errors of a request document that failed to parse or validate, reported before execution.
fn document_errors(code: &'static str, errors: DiagnosticList) -> (StatusCode, graphql::Response) {
    tracing::debug!(code, errors = %errors, "GraphQL request rejected");
    bad_request(
        errors
            .iter()
            .map(|diagnostic| {
                let mut error = graphql::Error::from(diagnostic.to_json());
                error
                    .extensions
                    .entry("code")
                    .or_insert(Value::from(code));
                error
            })
            .collect(),
    )
}

/// Every field of every object type defined in `schema` must be known to a resolver.
fn check_resolvers(schema: &Schema, resolvers: &[(&str, &[&str])]) -> Result<(), TypeGraphError> {
    for (type_name, ty) in &schema.types {
        let ExtendedType::Object(object) = ty else {
            continue;
        };
        if ty.is_built_in() {
            continue;
        }
        let Some((_, fields)) = resolvers
            .iter()
            .find(|(name, _)| *name == type_name.as_str())
        else {
            return Err(TypeGraphError::MissingResolver {
                type_name: type_name.to_string(),
            });
        };
        if let Some(field_name) = object
            .fields
            .keys()
            .find(|field_name| !fields.contains(&field_name.as_str()))
        {
            return Err(TypeGraphError::MissingField {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
            });
        }
    }
    Ok(())
}
