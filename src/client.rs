//! Blocking client for a local text-generation endpoint
//!
//! Sends a rendered prompt as a non-streaming generate request and hands the
//! raw response body back, so the caller can parse tool calls and timing from
//! the same envelope it would read from a saved response.

use crate::config::DispatchConfig;
use crate::error::{PopdataError, Result};
use crate::registry::GenerateRequest;

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct GenerateClient {
    endpoint: String,
    http: Client,
}

impl GenerateClient {
    /// Client for the configured endpoint and timeout
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PopdataError::Generate {
                endpoint: config.endpoint.clone(),
                source: e,
            })?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `request` and return the response body text
    pub fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let request_err = |e: reqwest::Error| PopdataError::Generate {
            endpoint: self.endpoint.clone(),
            source: e,
        };

        info!("Sending prompt to {} (model {})", self.endpoint, request.model);
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PopdataError::GenerateStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(request_err)?;
        debug!("Generate response: {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer a single HTTP request with `status` and `body`, returning the
    /// request body that was received
    fn serve_once(status: &'static str, body: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0;
            let mut line = String::new();
            loop {
                line.clear();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }

            let mut received = vec![0; content_length];
            reader.read_exact(&mut received).unwrap();

            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();

            String::from_utf8(received).unwrap()
        });

        (url, handle)
    }

    fn config_for(endpoint: &str) -> DispatchConfig {
        DispatchConfig {
            endpoint: endpoint.to_string(),
            timeout_secs: 10,
            ..DispatchConfig::default()
        }
    }

    #[test]
    fn test_generate_posts_non_streaming_request() {
        let envelope = r#"{"response": "{}", "total_duration": 1000}"#.to_string();
        let (url, server) = serve_once("200 OK", envelope.clone());
        let config = config_for(&url);

        let client = GenerateClient::new(&config).unwrap();
        let body = client
            .generate(&GenerateRequest::new(&config, "which tool?"))
            .unwrap();

        assert_eq!(body, envelope);

        let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(sent["model"], "mistral:latest");
        assert_eq!(sent["prompt"], "which tool?");
        assert_eq!(sent["stream"], false);
    }

    #[test]
    fn test_error_status_reported() {
        let (url, server) = serve_once("500 Internal Server Error", "{}".to_string());
        let config = config_for(&url);

        let result = GenerateClient::new(&config)
            .unwrap()
            .generate(&GenerateRequest::new(&config, "q"));
        server.join().unwrap();

        match result {
            Err(PopdataError::GenerateStatus { status, .. }) => assert_eq!(status, 500),
            other => panic!("Expected GenerateStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_endpoint() {
        // Bind then release a port so nothing is listening on it
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = config_for(&format!("http://127.0.0.1:{}/api/generate", port));

        let result = GenerateClient::new(&config)
            .unwrap()
            .generate(&GenerateRequest::new(&config, "q"));

        assert!(matches!(result, Err(PopdataError::Generate { .. })));
    }
}
