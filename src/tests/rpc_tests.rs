#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use crate::rpc::{JsonRpcClient, RpcTransport};

    /// Serve canned JSON-RPC replies on a local port
    async fn spawn_node() -> String {
        let app = Router::new()
            .route("/ok", post(|| async { Json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})) }))
            .route(
                "/err",
                post(|| async {
                    Json(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "method not found"}}))
                }),
            )
            .route("/null", post(|| async { Json(json!({"jsonrpc": "2.0", "id": 1, "result": null})) }))
            .route("/text", post(|| async { "upstream unavailable" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(url: &str) -> JsonRpcClient {
        JsonRpcClient::new(url, Duration::from_secs(5), false).unwrap()
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let base = spawn_node().await;

        let result = client(&format!("{}/ok", base)).call("eth_blockNumber", json!([])).await;
        assert_eq!(result, Some(Value::String("0x10".to_string())));
    }

    #[tokio::test]
    async fn test_call_without_result_returns_none() {
        let base = spawn_node().await;

        for path in ["err", "null", "text"] {
            let result = client(&format!("{}/{}", base, path)).call("eth_unknown", json!([])).await;
            assert_eq!(result, None, "Expected no result from /{}", path);
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_returns_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(&format!("http://{}", addr)).call("eth_blockNumber", json!([])).await;
        assert_eq!(result, None);
    }
}
