use graphql_calculator::calculator;
use graphql_calculator::graphql;
use graphql_calculator::json_ext::Path;
use graphql_calculator::services::ExecutionService;
use graphql_calculator::Configuration;
use serde_json_bytes::json;
use serde_json_bytes::Value;
use tower::Service;
use tower::ServiceExt;

type CalculatorService = ExecutionService<calculator::CalculatorContext>;

fn service() -> CalculatorService {
    calculator::service(Configuration::default()).unwrap()
}

async fn query(service: &mut CalculatorService, query: &str) -> graphql::Response {
    let request = graphql::Request::builder().query(query).build();
    service.ready().await.unwrap().call(request).await.unwrap()
}

async fn calculate(service: &mut CalculatorService, a: f64, b: f64, operation: &str) {
    let response = query(
        service,
        &format!("{{ calculate(a: {a:?}, b: {b:?}, operation: \"{operation}\") {{ id }} }}"),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
}

fn ids(history: &Value) -> Vec<Value> {
    history
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].clone())
        .collect()
}

#[tokio::test]
async fn calculate_projects_the_selected_fields() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 15.5, b: 24.3, operation: "add") { result operation } }"#,
    )
    .await;
    assert!(response.errors.is_empty());
    assert_eq!(
        response.data,
        Some(json!({ "calculate": { "result": 39.8, "operation": "ADD" } }))
    );
}

#[tokio::test]
async fn calculate_returns_every_field_when_asked() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 10, b: 4, operation: "divide") { id operation a b result timestamp } }"#,
    )
    .await;
    assert!(response.errors.is_empty());

    let data = response.data.unwrap();
    let calculation = data["calculate"].as_object().unwrap();
    assert_eq!(
        calculation.keys().map(|key| key.as_str()).collect::<Vec<_>>(),
        ["id", "operation", "a", "b", "result", "timestamp"]
    );
    assert_eq!(calculation["id"], json!("1"));
    assert_eq!(calculation["operation"], json!("DIVIDE"));
    assert_eq!(calculation["a"], json!(10.0));
    assert_eq!(calculation["b"], json!(4.0));
    assert_eq!(calculation["result"], json!(2.5));
    assert!(calculation["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn every_operation() {
    let mut service = service();
    for (operation, expected) in [
        ("ADD", 9.0),
        ("SUBTRACT", -4.0),
        ("MULTIPLY", 16.25),
        ("DIVIDE", 0.38461538461538464),
    ] {
        let response = query(
            &mut service,
            &format!(r#"{{ calculate(a: 2.5, b: 6.5, operation: "{operation}") {{ result }} }}"#),
        )
        .await;
        assert!(response.errors.is_empty(), "{operation}: {:?}", response.errors);
        assert_eq!(
            response.data,
            Some(json!({ "calculate": { "result": expected } })),
            "{operation}"
        );
    }
}

#[tokio::test]
async fn division_by_zero_nulls_the_field() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 10, b: 0, operation: "DIVIDE") { result } }"#,
    )
    .await;
    insta::assert_json_snapshot!(response, @r###"
    {
      "data": {
        "calculate": null
      },
      "errors": [
        {
          "message": "Division by zero is undefined. Provide a non-zero divisor.",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "calculate"
          ],
          "extensions": {
            "code": "DIVISION_BY_ZERO"
          }
        }
      ]
    }
    "###);

    // nothing was recorded
    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(response.data, Some(json!({ "history": [] })));
}

#[tokio::test]
async fn unsupported_operation() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 1, b: 2, operation: "MODULO") { result } }"#,
    )
    .await;
    assert_eq!(response.data, Some(json!({ "calculate": null })));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Unknown operation 'MODULO'. Allowed: ADD, SUBTRACT, MULTIPLY, DIVIDE"
    );
    assert_eq!(
        response.errors[0].extension_code().as_deref(),
        Some("UNSUPPORTED_OPERATION")
    );
}

#[tokio::test]
async fn missing_argument_is_a_field_error() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 1, operation: "ADD") { result } }"#,
    )
    .await;
    assert_eq!(response.data, Some(json!({ "calculate": null })));
    assert_eq!(
        response.errors[0].message,
        r#"Field "calculate" argument "b" of type "Float!" is required, but it was not provided."#
    );
    assert_eq!(
        response.errors[0].extension_code().as_deref(),
        Some("MISSING_ARGUMENT")
    );
}

#[tokio::test]
async fn history_returns_the_last_records_oldest_first() {
    let mut service = service();
    for a in 1..=5 {
        calculate(&mut service, a as f64, 1.0, "ADD").await;
    }

    let response = query(&mut service, "{ history(limit: 3) { id a } }").await;
    assert!(response.errors.is_empty());
    let data = response.data.unwrap();
    assert_eq!(ids(&data["history"]), [json!("3"), json!("4"), json!("5")]);
    assert_eq!(data["history"][0]["a"], json!(3.0));

    // reading does not change the history
    let again = query(&mut service, "{ history(limit: 3) { id a } }").await;
    assert_eq!(again.data, Some(data));

    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(ids(&response.data.unwrap()["history"]).len(), 5);

    let response = query(&mut service, "{ history(limit: 0) { id } }").await;
    assert_eq!(response.data, Some(json!({ "history": [] })));
}

#[tokio::test]
async fn negative_history_limit_is_empty() {
    let mut service = service();
    calculate(&mut service, 1.0, 2.0, "ADD").await;
    let response = query(&mut service, "{ history(limit: -1) { id } }").await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(response.data, Some(json!({ "history": [] })));
}

#[tokio::test]
async fn history_defaults_to_ten_records() {
    let mut service = service();
    for a in 0..12 {
        calculate(&mut service, a as f64, 2.0, "MULTIPLY").await;
    }
    let response = query(&mut service, "{ history { id } }").await;
    let history = response.data.unwrap()["history"].clone();
    assert_eq!(ids(&history).len(), 10);
    assert_eq!(ids(&history)[0], json!("3"));
}

#[tokio::test]
async fn configured_history() {
    let configuration: Configuration = "history:\n  default_limit: 2\n  capacity: 3\n"
        .parse()
        .unwrap();
    let mut service = calculator::service(configuration).unwrap();
    for a in 0..5 {
        calculate(&mut service, a as f64, 1.0, "SUBTRACT").await;
    }
    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(
        ids(&response.data.unwrap()["history"]),
        [json!("4"), json!("5")]
    );
    let response = query(&mut service, "{ history(limit: 10) { id } }").await;
    assert_eq!(
        ids(&response.data.unwrap()["history"]),
        [json!("3"), json!("4"), json!("5")]
    );
}

#[tokio::test]
async fn clear_history() {
    let mut service = service();
    for _ in 0..3 {
        calculate(&mut service, 1.0, 1.0, "ADD").await;
    }

    let response = query(&mut service, "mutation { clearHistory }").await;
    assert!(response.errors.is_empty());
    assert_eq!(response.data, Some(json!({ "clearHistory": 3 })));

    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(response.data, Some(json!({ "history": [] })));

    let response = query(&mut service, "mutation { clearHistory }").await;
    assert_eq!(response.data, Some(json!({ "clearHistory": 0 })));

    // ids start over
    let response = query(
        &mut service,
        r#"{ calculate(a: 1, b: 1, operation: "ADD") { id } }"#,
    )
    .await;
    assert_eq!(response.data, Some(json!({ "calculate": { "id": "1" } })));
}

#[tokio::test]
async fn mutation_fields_are_not_queries() {
    let mut service = service();
    let response = query(&mut service, "{ clearHistory }").await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.errors[0].message,
        "cannot query field 'clearHistory' on type 'Query'"
    );
}

#[tokio::test]
async fn unknown_sub_field_is_scoped_to_its_key() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ calculate(a: 2, b: 3, operation: "ADD") { result foo } }"#,
    )
    .await;
    assert_eq!(
        response.data,
        Some(json!({ "calculate": { "result": 5.0, "foo": null } }))
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        r#"Cannot query field "foo" on type "CalculationResult"."#
    );
    assert_eq!(
        response.errors[0].path,
        Some(Path::from_slice(&["calculate", "foo"]))
    );
    assert_eq!(
        response.errors[0].extension_code().as_deref(),
        Some("UNKNOWN_FIELD")
    );
}

#[tokio::test]
async fn failing_field_does_not_affect_siblings() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{
          ok: calculate(a: 2, b: 2, operation: "MULTIPLY") { result }
          failed: calculate(a: 2, b: 0, operation: "DIVIDE") { result }
          history { operation result }
        }"#,
    )
    .await;
    assert_eq!(
        response.data,
        Some(json!({
            "ok": { "result": 4.0 },
            "failed": null,
            "history": [{ "operation": "MULTIPLY", "result": 4.0 }]
        }))
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, Some(Path::from_slice(&["failed"])));
}

#[tokio::test]
async fn repeated_fields_run_once() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{
          calculate(a: 3, b: 4, operation: "MULTIPLY") { id }
          calculate(a: 3, b: 4, operation: "MULTIPLY") { id result }
        }"#,
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        Some(json!({ "calculate": { "id": "1", "result": 12.0 } }))
    );

    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(ids(&response.data.unwrap()["history"]), [json!("1")]);
}

#[tokio::test]
async fn conflicting_fields_are_rejected() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{
          total: calculate(a: 1, b: 2, operation: "ADD") { result }
          total: calculate(a: 1, b: 3, operation: "ADD") { result }
        }"#,
    )
    .await;
    assert_eq!(response.data, None);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "fields selected under the response key 'total' cannot be merged"
    );
    assert_eq!(
        response.errors[0].extension_code().as_deref(),
        Some("GRAPHQL_VALIDATION_FAILED")
    );

    // nothing ran
    let response = query(&mut service, "{ history { id } }").await;
    assert_eq!(response.data, Some(json!({ "history": [] })));
}

#[tokio::test]
async fn variables_and_operation_name() {
    let mut service = service();
    let request = graphql::Request::builder()
        .query(
            r#"
            query Sum($a: Float!, $b: Float!, $op: String! = "ADD") {
              calculate(a: $a, b: $b, operation: $op) { result }
            }
            query Recent($limit: Int) {
              history(limit: $limit) { result }
            }
            "#,
        )
        .operation_name("Sum")
        .variable("a", 1.5)
        .variable("b", 2)
        .build();
    let response = service.ready().await.unwrap().call(request).await.unwrap();
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        Some(json!({ "calculate": { "result": 3.5 } }))
    );

    let request = graphql::Request::builder()
        .query("query Recent($limit: Int) { history(limit: $limit) { result } }")
        .build();
    let response = service.ready().await.unwrap().call(request).await.unwrap();
    assert_eq!(
        response.data,
        Some(json!({ "history": [{ "result": 3.5 }] }))
    );
}

#[tokio::test]
async fn typename() {
    let mut service = service();
    let response = query(
        &mut service,
        r#"{ __typename calculate(a: 1, b: 1, operation: "ADD") { __typename kind: __typename } }"#,
    )
    .await;
    assert_eq!(
        response.data,
        Some(json!({
            "__typename": "Query",
            "calculate": { "__typename": "CalculationResult", "kind": "CalculationResult" }
        }))
    );
}

#[tokio::test]
async fn introspection_lists_the_calculator_types() {
    let mut service = service();
    let response = query(
        &mut service,
        "{ __schema { types { name kind } queryType { name } mutationType { name } } }",
    )
    .await;
    assert!(response.errors.is_empty());
    insta::assert_json_snapshot!(response.data, @r###"
    {
      "__schema": {
        "types": [
          {
            "name": "String",
            "kind": "SCALAR"
          },
          {
            "name": "Int",
            "kind": "SCALAR"
          },
          {
            "name": "Float",
            "kind": "SCALAR"
          },
          {
            "name": "ID",
            "kind": "SCALAR"
          },
          {
            "name": "Boolean",
            "kind": "SCALAR"
          },
          {
            "name": "CalculationResult",
            "kind": "OBJECT"
          },
          {
            "name": "Query",
            "kind": "OBJECT"
          },
          {
            "name": "Mutation",
            "kind": "OBJECT"
          }
        ],
        "queryType": {
          "name": "Query"
        },
        "mutationType": {
          "name": "Mutation"
        }
      }
    }
    "###);
}

#[tokio::test]
async fn introspection_describes_fields_and_arguments() {
    let mut service = service();
    let response = query(
        &mut service,
        "{ __schema { queryType { fields { name type args { name type defaultValue } } } } }",
    )
    .await;
    assert!(response.errors.is_empty());
    assert_eq!(
        response.data.unwrap()["__schema"]["queryType"]["fields"],
        json!([
            {
                "name": "calculate",
                "type": "CalculationResult",
                "args": [
                    { "name": "a", "type": "Float!", "defaultValue": null },
                    { "name": "b", "type": "Float!", "defaultValue": null },
                    { "name": "operation", "type": "String!", "defaultValue": null }
                ]
            },
            {
                "name": "history",
                "type": "[CalculationResult]",
                "args": [{ "name": "limit", "type": "Int", "defaultValue": "10" }]
            }
        ])
    );
}

#[tokio::test]
async fn malformed_documents_have_no_data() {
    let mut service = service();
    for document in [
        "{ calculate(a: 1, b: 2, operation: \"ADD\") }",
        "{ history { id { value } } }",
        "subscription { history { id } }",
        "{ ...Recent } fragment Recent on Query { history { id } }",
        "{ calculate(",
    ] {
        let response = query(&mut service, document).await;
        assert_eq!(response.data, None, "{document}");
        assert_eq!(response.errors.len(), 1, "{document}");
    }
}

#[tokio::test]
async fn concurrent_requests_share_the_history() {
    let service = service();
    let requests = (0..20).map(|a| {
        let service = service.clone();
        async move {
            service
                .oneshot(
                    graphql::Request::builder()
                        .query(format!(
                            r#"{{ calculate(a: {a}, b: 1, operation: "ADD") {{ id }} }}"#
                        ))
                        .build(),
                )
                .await
                .unwrap()
        }
    });
    let responses = futures::future::join_all(requests).await;
    assert!(responses.iter().all(|response| response.errors.is_empty()));

    let mut service = service;
    let response = query(&mut service, "{ history(limit: 100) { id } }").await;
    assert_eq!(ids(&response.data.unwrap()["history"]).len(), 20);
}
