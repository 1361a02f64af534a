//! Implements the execution of a GraphQL request: parsing, variable validation and execution.

use std::sync::Arc;
use std::task::Poll;

use futures::future::BoxFuture;
use futures::FutureExt;
use static_assertions::assert_impl_all;
use tower::BoxError;
use tower::Service;
use tracing::Instrument;

use crate::graphql;
use crate::graphql::ErrorExtension;
use crate::spec::Query;
use crate::Configuration;
use crate::Executor;

/// [`Service`] answering GraphQL requests with an [`Executor`].
///
/// Every clone shares the same executor and user context.
pub struct ExecutionService<C> {
    executor: Arc<Executor<C>>,
    context: Arc<C>,
    configuration: Arc<Configuration>,
}

assert_impl_all!(ExecutionService<crate::calculator::CalculatorContext>: Send, Sync, Clone);

impl<C> Clone for ExecutionService<C> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            context: self.context.clone(),
            configuration: self.configuration.clone(),
        }
    }
}

impl<C> ExecutionService<C> {
    pub fn new(
        executor: Arc<Executor<C>>,
        context: Arc<C>,
        configuration: Arc<Configuration>,
    ) -> Self {
        Self {
            executor,
            context,
            configuration,
        }
    }

    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Answers one request.
    ///
    /// Requests that cannot be executed at all get a response with errors and no data.
    #[tracing::instrument(
        skip_all,
        level = "trace",
        fields(operation_name = ?request.operation_name)
    )]
    pub fn execute(&self, request: &graphql::Request) -> graphql::Response {
        let Some(query) = request.query.as_deref() else {
            return graphql::Response::builder()
                .error(
                    graphql::Error::builder()
                        .message("Must provide query string.")
                        .extension_code("MISSING_QUERY_STRING")
                        .build(),
                )
                .build();
        };

        let query = match Query::parse(query, self.configuration.limits.max_depth) {
            Ok(query) => query,
            Err(error) => {
                tracing::debug!(%error, "could not parse the query");
                return graphql::Response::builder()
                    .error(error.to_graphql_error(None, Vec::new()))
                    .build();
            }
        };

        let operation = match query.operation(request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => {
                return graphql::Response::builder()
                    .error(error.to_graphql_error(None, Vec::new()))
                    .build();
            }
        };

        let variables = match operation.validate_variables(&request.variables) {
            Ok(variables) => variables,
            Err(errors) => {
                return graphql::Response::builder()
                    .errors(
                        errors
                            .into_iter()
                            .map(|error| error.to_graphql_error(None, Vec::new()))
                            .collect(),
                    )
                    .build();
            }
        };

        self.executor.execute(operation, &variables, &self.context)
    }
}

impl<C> Service<graphql::Request> for ExecutionService<C>
where
    C: Send + Sync + 'static,
{
    type Response = graphql::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: graphql::Request) -> Self::Future {
        let this = self.clone();
        async move { Ok(this.execute(&request)) }
            .in_current_span()
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use tower::ServiceExt;

    use super::*;
    use crate::calculator;

    fn service() -> ExecutionService<calculator::CalculatorContext> {
        calculator::service(Configuration::default()).unwrap()
    }

    #[tokio::test]
    async fn missing_query() {
        let response = service()
            .oneshot(graphql::Request::builder().build())
            .await
            .unwrap();
        insta::assert_json_snapshot!(response, @r###"
        {
          "errors": [
            {
              "message": "Must provide query string.",
              "extensions": {
                "code": "MISSING_QUERY_STRING"
              }
            }
          ]
        }
        "###);
    }

    #[tokio::test]
    async fn parse_errors_have_no_data() {
        let response = service()
            .oneshot(
                graphql::Request::builder()
                    .query("{ calculate(a: 1")
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(response.data, None);
        assert_eq!(
            response.errors[0].extension_code().as_deref(),
            Some("PARSING_ERROR")
        );
    }

    #[tokio::test]
    async fn invalid_variables_have_no_data() {
        let response = service()
            .oneshot(
                graphql::Request::builder()
                    .query("query($a: Float!) { calculate(a: $a, b: 1, operation: \"add\") { result } }")
                    .variable("a", "one")
                    .build(),
            )
            .await
            .unwrap();
        insta::assert_json_snapshot!(response, @r###"
        {
          "errors": [
            {
              "message": "invalid type for variable: 'a'",
              "extensions": {
                "name": "a",
                "code": "VALIDATION_INVALID_TYPE_VARIABLE"
              }
            }
          ]
        }
        "###);
    }

    #[tokio::test]
    async fn operation_name_selects_the_operation() {
        let mut service = service();
        let request = graphql::Request::builder()
            .query("query A { __typename } mutation B { __typename }")
            .operation_name("B")
            .build();
        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.data, Some(json!({ "__typename": "Mutation" })));

        let request = graphql::Request::builder()
            .query("query A { __typename } mutation B { __typename }")
            .build();
        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.data, None);
        assert_eq!(
            response.errors[0].message,
            "Must provide operation name if query contains multiple operations."
        );
    }

    #[tokio::test]
    async fn clones_share_the_history() {
        let service = service();
        let request = graphql::Request::builder()
            .query("{ calculate(a: 1, b: 2, operation: \"add\") { id } }")
            .build();
        service.clone().oneshot(request.clone()).await.unwrap();
        service.clone().oneshot(request).await.unwrap();
        assert_eq!(service.context().history.len(), 2);
    }
}
