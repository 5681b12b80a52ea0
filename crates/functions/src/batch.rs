//! Concurrent batch invocation with isolated failures.

use futures::future::join_all;
use serde_json::Value;

use crate::invoke::{InvokeError, RemoteFunction};

/// One invocation in a batch.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub function: String,
    pub payload: Value,
}

impl InvocationRequest {
    #[must_use]
    pub fn new(function: impl Into<String>, payload: Value) -> Self {
        Self {
            function: function.into(),
            payload,
        }
    }
}

/// Outcome of one request in a batch, tagged with its input position.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: Result<Value, InvokeError>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Invoke all `requests` concurrently against `invoker`.
///
/// Outcomes are returned in input order. A failed request never affects its
/// siblings; each entry carries its own success or classified error.
pub async fn invoke_batch(
    invoker: &dyn RemoteFunction,
    requests: &[InvocationRequest],
) -> Vec<BatchOutcome> {
    let futures = requests.iter().enumerate().map(|(index, request)| async move {
        BatchOutcome {
            index,
            result: invoker.invoke(&request.function, &request.payload, None).await,
        }
    });

    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Fails any function whose payload carries `"fail": true`; otherwise
    /// echoes the payload back.
    struct EchoInvoker;

    #[async_trait]
    impl RemoteFunction for EchoInvoker {
        async fn invoke(
            &self,
            function: &str,
            payload: &Value,
            _options: Option<crate::invoke::InvokeOptions>,
        ) -> Result<Value, InvokeError> {
            if payload.get("fail").and_then(Value::as_bool) == Some(true) {
                Err(InvokeError::Remote {
                    function: function.to_string(),
                    status: 500,
                    body: None,
                })
            } else {
                Ok(payload.clone())
            }
        }
    }

    #[tokio::test]
    async fn outcomes_preserve_input_order_and_isolate_failures() {
        let requests = vec![
            InvocationRequest::new("analyze", json!({"file_id": "a"})),
            InvocationRequest::new("analyze", json!({"fail": true})),
            InvocationRequest::new("analyze", json!({"file_id": "c"})),
            InvocationRequest::new("analyze", json!({"fail": true})),
        ];

        let outcomes = invoke_batch(&EchoInvoker, &requests).await;

        assert_eq!(outcomes.len(), 4);
        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.index)
            .collect();
        assert_eq!(failed, vec![1, 3]);

        // Sibling payloads are untouched by the failures.
        assert_eq!(
            outcomes[0].result.as_ref().unwrap(),
            &json!({"file_id": "a"})
        );
        assert_eq!(
            outcomes[2].result.as_ref().unwrap(),
            &json!({"file_id": "c"})
        );
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_outcomes() {
        let outcomes = invoke_batch(&EchoInvoker, &[]).await;
        assert!(outcomes.is_empty());
    }
}
