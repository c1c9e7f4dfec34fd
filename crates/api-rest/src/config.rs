//! Gateway configuration, resolved once at startup.

use std::net::SocketAddr;

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:50051";

/// Where the gateway listens and which RPC backend it forwards to.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    addr: SocketAddr,
    backend_url: String,
}

impl GatewayConfig {
    /// Builds a config from raw `EHR_REST_ADDR` / `EHR_BACKEND_URL` values; `None` selects the
    /// default.
    pub fn from_env_values(addr: Option<String>, backend_url: Option<String>) -> anyhow::Result<Self> {
        let addr = addr.unwrap_or_else(|| DEFAULT_REST_ADDR.into());
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| anyhow::anyhow!("EHR_REST_ADDR '{addr}' is not a socket address: {e}"))?;

        let backend_url = backend_url.unwrap_or_else(|| DEFAULT_BACKEND_URL.into());
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            anyhow::bail!("EHR_BACKEND_URL must be an http(s) URL, got '{backend_url}'");
        }

        Ok(Self { addr, backend_url })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GatewayConfig::from_env_values(None, None).unwrap();
        assert_eq!(cfg.addr().port(), 8080);
        assert_eq!(cfg.backend_url(), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(GatewayConfig::from_env_values(Some("localhost".into()), None).is_err());
        assert!(GatewayConfig::from_env_values(None, Some("grpc-host:50051".into())).is_err());
    }
}
