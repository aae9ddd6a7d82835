#![allow(dead_code)]

use axum::Router;
use bili_api::{ApiConfig, RetryConfig};
use tokio::net::TcpListener;

pub struct TestServer {
    pub base_url: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn new(router: Router) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// A base url that looks like a separate host to the client.
    pub fn host(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }

    /// Config with every host list pointing at this server and a short retry deadline.
    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            timeout: 2,
            retry: fast_retry(),
            ..ApiConfig::default().with_single_host(&self.base_url)
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        deadline_ms: 300,
        initial_wait_ms: 20,
    }
}
