use crate::core::config::Config;
use crate::core::error::StoryError;
use crate::core::model::{GenerateResponse, StoryRequest, StoryResult};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use url::Url;

/// The story backend as seen by the controller.
#[async_trait(?Send)]
pub trait StoryApi {
    async fn generate(&self, request: &StoryRequest) -> Result<StoryResult, StoryError>;
}

pub struct HttpStoryApi {
    client: Client,
    endpoint: Url,
}

impl HttpStoryApi {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl StoryApi for HttpStoryApi {
    async fn generate(&self, request: &StoryRequest) -> Result<StoryResult, StoryError> {
        debug!(
            "POST {} {}",
            self.endpoint,
            serde_json::to_string(request).unwrap_or_default()
        );

        // The backend reports failures as `success: false` bodies with 4xx/5xx
        // statuses, so the body is read regardless of status.
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| StoryError::transport(e, "Failed to send generate request"))?;

        let status = resp.status();
        debug!("Generate response status: {}", status);

        let body = resp
            .json::<GenerateResponse>()
            .await
            .map_err(|e| StoryError::transport(e, "Failed to parse generate response"))?;

        body.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NETWORK_FAILURE_MESSAGE;

    #[test]
    fn test_endpoint_from_config() -> Result<()> {
        let api = HttpStoryApi::new(&Config {
            base_url: "http://127.0.0.1:5000".to_string(),
            ..Default::default()
        })?;
        assert_eq!(api.endpoint().as_str(), "http://127.0.0.1:5000/api/generate-story");
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() -> Result<()> {
        // Bind then drop to get a local port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let api = HttpStoryApi::new(&Config {
            base_url: format!("http://127.0.0.1:{}", port),
            ..Default::default()
        })?;
        let request = StoryRequest {
            keywords: vec!["dragon".to_string()],
            theme: "adventure".to_string(),
            duration_minutes: 1,
            moods: vec!["calm".to_string()],
        };

        let err = api.generate(&request).await.unwrap_err();
        assert!(matches!(err, StoryError::Transport(_)));
        assert_eq!(err.to_string(), NETWORK_FAILURE_MESSAGE);
        Ok(())
    }

    /// Answers a single HTTP request and hands back the request body.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> Result<(Config, tokio::task::JoinHandle<String>)> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let config = Config {
            base_url: format!("http://{}", listener.local_addr()?),
            ..Default::default()
        };

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break buf.len();
                }
            };

            let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let length = headers
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < header_end + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[header_end..]).to_string()
        });

        Ok((config, handle))
    }

    fn scenario_request() -> StoryRequest {
        StoryRequest {
            keywords: vec!["dragon".to_string(), "forest".to_string()],
            theme: "adventure".to_string(),
            duration_minutes: 5,
            moods: vec!["calm".to_string()],
        }
    }

    #[tokio::test]
    async fn test_success_round_trip() -> Result<()> {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"success":true,"story":"A dragon slept.","duration_estimate":"5 min","emotions_used":["calm"],"word_count":120,"audio_url":"/audio/1.mp3"}"#,
        )
        .await?;

        let api = HttpStoryApi::new(&config)?;
        let result = api.generate(&scenario_request()).await?;
        assert_eq!(result.word_count, 120);
        assert_eq!(result.audio_url.as_deref(), Some("/audio/1.mp3"));

        let sent: serde_json::Value = serde_json::from_str(&server.await?)?;
        assert_eq!(
            sent,
            serde_json::json!({
                "keywords": ["dragon", "forest"],
                "theme": "adventure",
                "duration": 5,
                "moods": ["calm"]
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_body_is_application_error() -> Result<()> {
        let (config, server) = serve_once(
            "500 Internal Server Error",
            r#"{"success":false,"error":"Rate limited"}"#,
        )
        .await?;

        let api = HttpStoryApi::new(&config)?;
        let err = api.generate(&scenario_request()).await.unwrap_err();
        assert!(matches!(err, StoryError::Application(Some(_))));
        assert_eq!(err.to_string(), "Rate limited");
        server.await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unparseable_body_is_transport_error() -> Result<()> {
        let (config, server) = serve_once("502 Bad Gateway", "<html>bad gateway</html>").await?;

        let api = HttpStoryApi::new(&config)?;
        let err = api.generate(&scenario_request()).await.unwrap_err();
        assert!(matches!(err, StoryError::Transport(_)));
        server.await?;
        Ok(())
    }
}
