use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::GatewayError;
use crate::models::Validate;

/// JSON body that has been decoded with path-aware errors and passed [`Validate`].
///
/// Every rejection is a 400 with a `detail` naming the offending field where one is known.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| GatewayError::bad_request(e.body_text()))?;

        let value = decode::<T>(&bytes)?;
        value.validate()?;
        Ok(Self(value))
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GatewayError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|e| {
        let path = e.path().to_string();
        let inner = e.into_inner();
        if path == "." {
            GatewayError::bad_request(format!("invalid JSON body: {inner}"))
        } else {
            GatewayError::bad_request(format!("{path}: {inner}"))
        }
    })?;
    de.end()
        .map_err(|e| GatewayError::bad_request(format!("invalid JSON body: {e}")))?;
    Ok(value)
}
