use std::time::Duration;

use bontez_sales::SalePayload;

use super::{CreateSaleRequest, RemoteError, RemoteSale, RemoteSales};

/// REST client for the sales backend.
#[derive(Debug, Clone)]
pub struct HttpSalesClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpSalesClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout,
        }
    }

    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(api_url, timeout)
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl RemoteSales for HttpSalesClient {
    async fn create_sale(&self, sale: &SalePayload) -> Result<RemoteSale, RemoteError> {
        let body = CreateSaleRequest::from(sale);
        let mut req = self
            .client
            .post(self.url("/sales"))
            .timeout(self.timeout)
            .json(&body);

        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(RemoteError::Api(status, resp.text().await.unwrap_or_default()));
        }

        resp.json::<RemoteSale>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    /// Check connectivity by hitting the health endpoint.
    async fn is_reachable(&self) -> bool {
        match self
            .client
            .get(self.url("/health"))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => !resp.status().is_server_error(),
            Err(err) => {
                tracing::debug!("health check failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bontez_sales::{PaymentMethod, SaleLine};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sale() -> SalePayload {
        SalePayload::new(1, PaymentMethod::Cash, vec![SaleLine::new(1, 2, 1200)])
    }

    fn api_base(server: &MockServer) -> String {
        format!("{}/api/", server.uri())
    }

    #[tokio::test]
    async fn posts_sale_and_parses_server_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sales"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "client_id": 1,
                "payment_method": "cash",
                "items": [{ "product_id": 1, "quantity": 2, "unit_price": 1200 }],
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 42, "total_amount": 2400 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpSalesClient::with_token(api_base(&server), "secret", Duration::from_secs(5));
        let created = client.create_sale(&sale()).await.unwrap();

        assert_eq!(created.id, 42);
        assert_eq!(created.total_amount, Some(2400.0));
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sales"))
            .respond_with(ResponseTemplate::new(404).set_body_string("client not found"))
            .mount(&server)
            .await;

        let client = HttpSalesClient::new(api_base(&server), Duration::from_secs(5));
        let err = client.create_sale(&sale()).await.unwrap_err();
        assert_eq!(err, RemoteError::Api(404, "client not found".to_string()));
    }

    #[tokio::test]
    async fn unexpected_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sales"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;

        let client = HttpSalesClient::new(api_base(&server), Duration::from_secs(5));
        let err = client.create_sale(&sale()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Parse(_)));
    }

    #[tokio::test]
    async fn slow_server_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sales"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "id": 1 }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let timeout = Duration::from_millis(50);
        let client = HttpSalesClient::new(api_base(&server), timeout);
        let err = client.create_sale(&sale()).await.unwrap_err();
        assert_eq!(err, RemoteError::Timeout(timeout));
    }

    #[tokio::test]
    async fn health_check_drives_reachability() {
        let server = MockServer::start().await;
        let client = HttpSalesClient::new(api_base(&server), Duration::from_secs(5));

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        assert!(client.is_reachable().await);

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        assert!(!client.is_reachable().await);
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        // Reserve a port, then free it so nothing is listening there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpSalesClient::new(format!("http://{addr}/api"), Duration::from_secs(5));
        let err = client.create_sale(&sale()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
        assert!(!client.is_reachable().await);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = HttpSalesClient::new("http://localhost:5000/api/", Duration::from_secs(1));
        assert_eq!(client.api_url(), "http://localhost:5000/api");
    }
}
