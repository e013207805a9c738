use crate::{
    admin::{start_admin_server, Metrics},
    ca::CertificateAuthority,
    config::ProxyConfig,
    error::ScriptError,
    handlers::RewriteHandler,
    rewriter::ResponseRewriter,
    Result,
};
use hudsucker::{certificate_authority::RcgenAuthority, rustls, ProxyBuilder};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// MITM proxy hosting the response rewriter
pub struct ProxyServer {
    config: ProxyConfig,
    ca: CertificateAuthority,
    rewriter: Arc<ResponseRewriter>,
    metrics: Arc<Metrics>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig, ca: CertificateAuthority, rewriter: ResponseRewriter) -> Self {
        Self {
            config,
            ca,
            rewriter: Arc::new(rewriter),
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ip: IpAddr = self.config.listen_address.parse().map_err(|e| {
            ScriptError::Configuration(format!(
                "Invalid listen address {}: {}",
                self.config.listen_address, e
            ))
        })?;
        let addr = SocketAddr::new(ip, self.config.listen_port);
        info!("Starting rewrite proxy on {}", addr);

        let admin_port = self.config.admin_port;
        let metrics = self.metrics.clone();
        let admin_handle = tokio::spawn(async move {
            if let Err(e) = start_admin_server(admin_port, metrics).await {
                error!("Admin server failed: {}", e);
            }
        });

        let result = self.serve(addr, shutdown).await;
        admin_handle.abort();
        result
    }

    async fn serve<F>(&self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Hudsucker/Rustls expects DER, not PEM.
        let private_key = rustls::PrivateKey(self.ca.get_ca_key_der());
        let ca_cert = rustls::Certificate(self.ca.get_ca_cert_der()?);

        let authority = RcgenAuthority::new(private_key, ca_cert, 1000).map_err(|e| {
            ScriptError::Certificate(format!("Failed to create CA authority: {}", e))
        })?;

        let handler = RewriteHandler::new(self.rewriter.clone(), self.metrics.clone());

        let proxy = ProxyBuilder::new()
            .with_addr(addr)
            .with_rustls_client()
            .with_ca(authority)
            .with_http_handler(handler)
            .build();

        proxy
            .start(shutdown)
            .await
            .map_err(|e| ScriptError::Network(format!("Proxy failed: {}", e)))?;

        info!("Rewrite proxy stopped");
        Ok(())
    }
}
