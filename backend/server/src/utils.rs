use axum::{Json, body::Bytes};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

#[derive(Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub fn data<T: Serialize>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

/// Unparsable bodies become `null`, which the build validator reports as malformed once the
/// actor is known to be allowed to publish.
pub fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!("Request body is not JSON: {e}");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(&Bytes::from_static(b"{\"mode\":\"killer\"}")), json!({ "mode": "killer" }));
        assert_eq!(parse_body(&Bytes::from_static(b"not json")), Value::Null);
        assert_eq!(parse_body(&Bytes::new()), Value::Null);
    }

    #[test]
    fn test_data_envelope() {
        let Json(envelope) = data(vec![1, 2]);
        assert_eq!(serde_json::to_value(envelope).unwrap(), json!({ "data": [1, 2] }));
    }
}
