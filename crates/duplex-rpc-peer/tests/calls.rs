//! End-to-end call semantics over an in-memory engine pair.

mod common;

use duplex_rpc_peer::{params, ErrorKind, InvokeContext, Router, RpcError};
use serde_json::json;

use common::pair;

#[tokio::test]
async fn basic_call() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("test", |cx: InvokeContext| async move {
            let a = cx.param_as::<i64>(0)?;
            let b = cx.param_as::<i64>(1)?;
            Ok(json!(a + b))
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let sum = client.path("test").call(params![1, 2]).await.unwrap();
    assert_eq!(sum, json!(3));
}

#[tokio::test]
async fn dotted_path_without_preregistration() {
    common::init_tracing();
    let server = Router::namespace()
        .namespace(
            "math",
            Router::namespace().handler("add", |cx: InvokeContext| async move {
                let a = cx.param_as::<i64>(0)?;
                let b = cx.param_as::<i64>(1)?;
                Ok(json!(a + b))
            }),
        )
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let sum = client
        .path("math")
        .path("add")
        .call(params![40, 2])
        .await
        .unwrap();
    assert_eq!(sum, json!(42));

    // invoke() joins the dotted name without materializing children.
    let sum = client.invoke("math.add", params![1, 1]).await.unwrap();
    assert_eq!(sum, json!(2));
}

#[tokio::test]
async fn chain_with_parameter_mutation() {
    common::init_tracing();
    let server = Router::namespace()
        .chain(
            "transform",
            [
                Router::handler(|cx: InvokeContext| async move {
                    let t = cx.param_as::<String>(0)?;
                    cx.set_param(0, json!(t.to_uppercase()));
                    Ok(json!(null))
                }),
                Router::handler(|cx: InvokeContext| async move {
                    let t = cx.param_as::<String>(0)?;
                    cx.set_param(0, json!(format!("{}!", t)));
                    Ok(json!(null))
                }),
                Router::handler(|cx: InvokeContext| async move {
                    let t = cx.param_as::<String>(0)?;
                    Ok(json!(format!("[{}]", t)))
                }),
            ],
        )
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let out = client.path("transform").call(params!["hello"]).await.unwrap();
    assert_eq!(out, json!("[HELLO!]"));
}

#[tokio::test]
async fn chain_return_rule_violation() {
    common::init_tracing();
    let server = Router::namespace()
        .chain(
            "bad",
            [
                Router::handler(|cx: InvokeContext| async move {
                    let t = cx.param_as::<String>(0)?;
                    Ok(json!(t.to_uppercase()))
                }),
                Router::handler(|cx: InvokeContext| async move {
                    Ok(cx.param(0).unwrap_or(json!(null)))
                }),
            ],
        )
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let err = client.path("bad").call(params!["x"]).await.unwrap_err();
    assert_eq!(err.code, -32603);
    assert_eq!(
        err.message,
        "Only the last handler in the chain can return a value"
    );
}

#[tokio::test]
async fn fuzzy_prefix_resolution() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("user", |cx: InvokeContext| async move {
            Ok(json!(cx.method()))
        })
        .handler("user.special", |cx: InvokeContext| async move {
            Ok(json!({"special": true, "data": cx.param(0)}))
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let out = client
        .path("user")
        .path("profile")
        .path("get")
        .call(params![json!({"n": 1})])
        .await
        .unwrap();
    assert_eq!(out, json!("profile.get"));

    let out = client
        .path("user")
        .path("special")
        .call(params![json!({"t": 1})])
        .await
        .unwrap();
    assert_eq!(out, json!({"special": true, "data": {"t": 1}}));
}

#[tokio::test]
async fn bidirectional_callback() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("process", |cx: InvokeContext| async move {
            let d = cx.param_as::<String>(0)?;
            let transformed = cx.invoke().invoke("transform", params![d]).await?;
            let transformed = transformed.as_str().unwrap_or_default().to_string();
            Ok(json!(format!("Processed: {}", transformed)))
        })
        .finish();
    let client_router = Router::namespace()
        .handler("transform", |cx: InvokeContext| async move {
            let d = cx.param_as::<String>(0)?;
            Ok(json!(d.to_uppercase()))
        })
        .finish();
    let (client, _server) = pair(client_router, server);

    let out = client.path("process").call(params!["hello"]).await.unwrap();
    assert_eq!(out, json!("Processed: HELLO"));
}

#[tokio::test]
async fn literal_routes() {
    common::init_tracing();
    let server = Router::namespace()
        .literal("version", "1.0")
        .literal("nothing", json!(null))
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    assert_eq!(client.path("version").call(params![]).await.unwrap(), json!("1.0"));
    assert_eq!(client.path("nothing").call(params![]).await.unwrap(), json!(null));
}

#[tokio::test]
async fn custom_handler_error_crosses_verbatim() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("fail", |_cx: InvokeContext| async move {
            Err::<serde_json::Value, _>(
                RpcError::new(1001, "quota exceeded").with_data(json!({"limit": 10})),
            )
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let err = client.path("fail").call(params![]).await.unwrap_err();
    assert_eq!(err.code, 1001);
    assert_eq!(err.message, "quota exceeded");
    assert_eq!(err.data, Some(json!({"limit": 10})));
    assert_eq!(err.kind, ErrorKind::System);
}

#[tokio::test]
async fn method_not_found_from_peer() {
    common::init_tracing();
    let (client, _server) = pair(Router::empty(), Router::empty());

    let err = client.path("missing").call(params![]).await.unwrap_err();
    assert_eq!(err.code, -32601);
    assert_eq!(err.message, "Method not found.");
    assert_eq!(err.kind, ErrorKind::Business);
}

#[tokio::test]
async fn root_call_without_empty_route() {
    common::init_tracing();
    let (client, _server) = pair(Router::empty(), Router::empty());

    // The root proxy is callable; peers answer -32601 unless they expose an
    // empty-name route.
    let err = client.call(params![]).await.unwrap_err();
    assert_eq!(err.code, -32601);
}

#[tokio::test]
async fn handler_sees_both_method_views() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("svc", |cx: InvokeContext| async move {
            Ok(json!({"method": cx.method(), "full": cx.full_method()}))
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let out = client
        .path("svc")
        .path("leaf")
        .call(params![])
        .await
        .unwrap();
    assert_eq!(out, json!({"method": "leaf", "full": "svc.leaf"}));
}

#[tokio::test]
async fn concurrent_calls_correlate_by_id() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("echo", |cx: InvokeContext| async move {
            Ok(cx.param(0).unwrap_or(json!(null)))
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    let calls: Vec<_> = (0..16)
        .map(|n| {
            let proxy = client.path("echo");
            tokio::spawn(async move { proxy.call(params![n]).await })
        })
        .collect();

    for (n, call) in calls.into_iter().enumerate() {
        let value = call.await.unwrap().unwrap();
        assert_eq!(value, json!(n));
    }
}

#[tokio::test]
async fn non_finite_floats_normalize_to_null() {
    common::init_tracing();
    let server = Router::namespace()
        .handler("nan", |_cx: InvokeContext| async move {
            Ok(serde_json::Value::from(f64::NAN))
        })
        .finish();
    let (client, _server) = pair(Router::empty(), server);

    assert_eq!(client.path("nan").call(params![]).await.unwrap(), json!(null));
}
