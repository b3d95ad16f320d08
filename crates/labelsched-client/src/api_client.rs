use crate::error::{ClientError, Result};
use crate::traits::{BindAck, BindingSink, SnapshotSource};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use labelsched_core::{narrow_node, narrow_pod, Binding, LabelKeys, NodeInfo, PodInfo};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the control-plane client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Control-plane base URL, e.g. a local `kubectl proxy`
    pub base_url: String,
    /// Namespace pods are listed from
    pub namespace: String,
    /// Label keys holding the placement attributes
    pub label_keys: LabelKeys,
    /// Upper bound for every request, connect through body
    pub request_timeout: Duration,
    /// Extra header attached to binding submissions, as `Name: value`
    pub custom_header: Option<String>,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: "default".to_string(),
            label_keys: LabelKeys::default(),
            request_timeout: Duration::from_secs(10),
            custom_header: None,
        }
    }
}

/// HTTP client for the Kubernetes core/v1 API
pub struct ApiClient {
    base_url: String,
    namespace: String,
    label_keys: LabelKeys,
    custom_header: Option<(HeaderName, HeaderValue)>,
    client: Client,
}

/// Parse a `Name: value` header specification
pub fn parse_header(spec: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = spec.split_once(':').ok_or_else(|| {
        ClientError::invalid_config(
            format!("Header '{}' is not of the form 'Name: value'", spec),
            "Pass the header as e.g. 'X-Custom-Header: myvalue'",
        )
    })?;

    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
        ClientError::invalid_config(
            format!("Invalid header name '{}': {}", name.trim(), e),
            "Header names may only contain visible ASCII characters without separators",
        )
    })?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| {
        ClientError::invalid_config(
            format!("Invalid header value for '{}': {}", name, e),
            "Header values may only contain visible ASCII characters",
        )
    })?;

    Ok((name, value))
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::invalid_config(
                format!("Invalid API URL '{}': {}", config.base_url, e),
                "Use an absolute URL such as http://localhost:8001",
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ClientError::invalid_config(
                format!(
                    "API URL '{}' is not an http(s) URL with a host",
                    config.base_url
                ),
                "Include the scheme, e.g. http://localhost:8001 instead of localhost:8001",
            ));
        }

        if config.request_timeout.is_zero() {
            return Err(ClientError::invalid_config(
                "Request timeout must be greater than zero",
                "Use e.g. --request-timeout-ms 10000",
            ));
        }

        if config.namespace.is_empty() {
            return Err(ClientError::invalid_config(
                "Namespace must not be empty",
                "Pass --namespace default to schedule pods in the default namespace",
            ));
        }

        let custom_header = config
            .custom_header
            .as_deref()
            .map(parse_header)
            .transpose()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ClientError::invalid_config(
                    format!("Failed to build HTTP client: {}", e),
                    "Check the TLS configuration of this host",
                )
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            namespace: config.namespace,
            label_keys: config.label_keys,
            custom_header,
            client,
        })
    }

    /// GET an API path and return the decoded JSON body
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest("GET", &url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::unexpected_status(
                "GET",
                url,
                status.as_u16(),
                body,
            ));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| ClientError::decode_failed(path, e.to_string()))
    }

    /// GET /api/v1/namespaces/{namespace}/pods
    pub async fn get_pods(&self) -> Result<Vec<Pod>> {
        let path = format!("/api/v1/namespaces/{}/pods", self.namespace);
        let body = self.get_json(&path).await?;
        decode_items(&body, "Pod")
    }

    /// GET /api/v1/nodes
    pub async fn get_nodes(&self) -> Result<Vec<Node>> {
        let body = self.get_json("/api/v1/nodes").await?;
        decode_items(&body, "Node")
    }

    /// POST /api/v1/namespaces/{namespace}/pods/{name}/binding
    pub async fn bind_pod(&self, binding: &Binding) -> Result<BindAck> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods/{}/binding",
            self.base_url, binding.namespace, binding.pod_name
        );
        let body = binding.to_json()?;
        debug!("POST {} {}", url, body);

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some((name, value)) = &self.custom_header {
            request = request.header(name.clone(), value.clone());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest("POST", &url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::unexpected_status(
                "POST",
                url,
                status.as_u16(),
                body,
            ));
        }

        Ok(BindAck {
            pod_name: binding.pod_name.clone(),
            node_name: binding.node_name.clone(),
            status: status.as_u16(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Decode the `items` of a list response, skipping entries that fail to parse
fn decode_items<T: DeserializeOwned>(body: &serde_json::Value, kind: &str) -> Result<Vec<T>> {
    let items = body["items"].as_array().ok_or_else(|| {
        ClientError::decode_failed(format!("{} list", kind), "response has no 'items' array")
    })?;

    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(obj) => decoded.push(obj),
            Err(e) => warn!("Failed to parse {} from list: {}", kind, e),
        }
    }

    Ok(decoded)
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn list_pods(&self) -> Result<Vec<PodInfo>> {
        let pods = self.get_pods().await?;
        Ok(pods
            .iter()
            .filter_map(|pod| match narrow_pod(pod, &self.label_keys) {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!("Skipping pod: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes = self.get_nodes().await?;
        Ok(nodes
            .iter()
            .filter_map(|node| match narrow_node(node, &self.label_keys) {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!("Skipping node: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl BindingSink for ApiClient {
    async fn bind(&self, binding: &Binding) -> Result<BindAck> {
        self.bind_pod(binding).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodSpec;
    use labelsched_core::Placement;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_pod(name: &str, scheduler: &str, category: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod.metadata.namespace = Some("default".to_string());
        pod.metadata.labels = Some(BTreeMap::from([(
            "category".to_string(),
            category.to_string(),
        )]));
        pod.spec = Some(PodSpec {
            scheduler_name: Some(scheduler.to_string()),
            ..Default::default()
        });
        pod
    }

    fn make_node(name: &str, category: &str, network: &str) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        node.metadata.labels = Some(BTreeMap::from([
            ("category".to_string(), category.to_string()),
            ("network".to_string(), network.to_string()),
        ]));
        node
    }

    fn client_for(server: &MockServer) -> ApiClient {
        let mut config = ApiClientConfig::new(server.uri());
        config.custom_header = Some("X-Custom-Header: myvalue".to_string());
        ApiClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_list_pods_narrows_and_skips_bad_items() {
        let mock_server = MockServer::start().await;

        let mut nameless = make_pod("x", "my-scheduler", "db");
        nameless.metadata.name = None;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/default/pods"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "items": [
                    make_pod("p1", "my-scheduler", "db"),
                    {"metadata": 5},
                    nameless,
                ],
            })))
            .mount(&mock_server)
            .await;

        let pods = client_for(&mock_server).list_pods().await.unwrap();

        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "p1");
        assert_eq!(pods[0].scheduler_name, "my-scheduler");
        assert_eq!(pods[0].placement, Placement::new(Some("db"), None));
    }

    #[tokio::test]
    async fn test_list_pods_uses_configured_namespace() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/batch/pods"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"kind": "PodList", "items": []})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = ApiClientConfig::new(mock_server.uri());
        config.namespace = "batch".to_string();
        let client = ApiClient::new(config).unwrap();

        assert!(client.list_pods().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_nodes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "NodeList",
                "items": [make_node("n1", "db", ""), make_node("n2", "web", "public")],
            })))
            .mount(&mock_server)
            .await;

        let nodes = client_for(&mock_server).list_nodes().await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "n1");
        assert_eq!(nodes[0].placement, Placement::new(Some("db"), None));
        assert_eq!(
            nodes[1].placement,
            Placement::new(Some("web"), Some("public"))
        );
    }

    #[tokio::test]
    async fn test_list_nodes_without_items_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"kind": "Status"})),
            )
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).list_nodes().await.unwrap_err();
        assert!(matches!(err, ClientError::DecodeFailed { .. }));
    }

    #[tokio::test]
    async fn test_list_pods_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/default/pods"))
            .respond_with(ResponseTemplate::new(500).set_body_string("etcd unavailable"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).list_pods().await.unwrap_err();
        match err {
            ClientError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "etcd unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bind_pod_posts_binding() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/default/pods/p1/binding"))
            .and(header("content-type", "application/json"))
            .and(header("x-custom-header", "myvalue"))
            .and(body_json(serde_json::json!({
                "apiVersion": "v1",
                "kind": "Binding",
                "metadata": {"name": "p1"},
                "target": {"apiVersion": "v1", "kind": "Node", "name": "n1"},
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let binding = Binding {
            pod_name: "p1".to_string(),
            namespace: "default".to_string(),
            node_name: "n1".to_string(),
        };
        let ack = client_for(&mock_server).bind(&binding).await.unwrap();

        assert_eq!(ack.pod_name, "p1");
        assert_eq!(ack.node_name, "n1");
        assert_eq!(ack.status, 201);
    }

    #[tokio::test]
    async fn test_bind_pod_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/default/pods/p1/binding"))
            .respond_with(ResponseTemplate::new(409).set_body_string("pod p1 is already assigned"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let binding = Binding {
            pod_name: "p1".to_string(),
            namespace: "default".to_string(),
            node_name: "n1".to_string(),
        };
        let err = client_for(&mock_server).bind(&binding).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: 409, .. }
        ));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"items": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let mut config = ApiClientConfig::new(mock_server.uri());
        config.request_timeout = Duration::from_millis(50);
        let client = ApiClient::new(config).unwrap();

        let err = client.list_nodes().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
    }

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("X-Custom-Header: myvalue").unwrap();
        assert_eq!(name.as_str(), "x-custom-header");
        assert_eq!(value.to_str().unwrap(), "myvalue");

        assert!(parse_header("no-colon").is_err());
        assert!(parse_header("bad name: v").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = ApiClient::new(ApiClientConfig::new("not a url"))
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidConfig { .. }));

        // Parses as scheme "localhost" without a host
        let err = ApiClient::new(ApiClientConfig::new("localhost:8001"))
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidConfig { .. }));
        assert!(ApiClient::new(ApiClientConfig::new("ftp://localhost:8001")).is_err());

        let mut config = ApiClientConfig::new("http://localhost:8001");
        config.request_timeout = Duration::ZERO;
        assert!(matches!(
            ApiClient::new(config).err().unwrap(),
            ClientError::InvalidConfig { .. }
        ));

        let mut config = ApiClientConfig::new("http://localhost:8001/");
        config.namespace = String::new();
        assert!(ApiClient::new(config).is_err());

        let client = ApiClient::new(ApiClientConfig::new("http://localhost:8001/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001");
        assert_eq!(client.namespace(), "default");
    }
}
