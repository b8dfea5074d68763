//! PostgREST client for the records portal
//!
//! This crate talks to the `/rest/v1/<table>` endpoints of a Supabase
//! project. It covers the subset the portal needs:
//!
//! - `select` with column lists and embedded relations
//! - Filtering (`eq`, `in`)
//! - Ordering and limits
//! - `insert`, `update` and `delete` returning the affected rows

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Error body returned by PostgREST on a failed request
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// HTTP status of a rejected request, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. }
            | PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }

    /// PostgreSQL / PostgREST error code (e.g. `23505`)
    pub fn code(&self) -> Option<&str> {
        match self {
            PostgrestError::ApiError { details, .. } => details.code.as_deref(),
            _ => None,
        }
    }

    /// The server's own message, without the status decoration
    pub fn message(&self) -> String {
        match self {
            PostgrestError::ApiError { details, .. } => details
                .message
                .clone()
                .unwrap_or_else(|| details.to_string()),
            PostgrestError::UnparsedApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Query builder bound to one table
#[derive(Clone, Debug)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl PostgrestClient {
    /// Create a client for `table`, authenticating with `api_key`
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        http_client: Client,
    ) -> Result<Self, PostgrestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).map_err(|_| {
                PostgrestError::InvalidParameters("API key is not a valid header value".into())
            })?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: HashMap::new(),
            timeout: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Set the bearer token sent with every request
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Target a schema other than `public`
    pub fn schema(self, schema_name: &str) -> Result<Self, PostgrestError> {
        self.with_header("Accept-Profile", schema_name)?
            .with_header("Content-Profile", schema_name)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Columns to return, including embedded relations such as
    /// `*,student:student_id(id,first_name)`
    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[&str]) -> Self {
        let value_list = values.join(",");
        self.query_params
            .insert(column.to_string(), format!("in.({})", value_list));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order.as_str()));
        self
    }

    pub fn limit(mut self, count: i32) -> Self {
        self.query_params
            .insert("limit".to_string(), count.to_string());
        self
    }

    /// Run the query and deserialize every returned row
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, PostgrestError> {
        let response = self.send(Method::GET, None, false).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Insert `values` and return the created rows
    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let body = serde_json::to_vec(&values)?;
        let response = self.send(Method::POST, Some(body), true).await?;
        read_representation(response).await
    }

    /// Update the rows matched by the current filters and return them
    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        if !self.has_filter() {
            return Err(PostgrestError::InvalidParameters(
                "Refusing to update without a filter".to_string(),
            ));
        }
        let body = serde_json::to_vec(&values)?;
        let response = self.send(Method::PATCH, Some(body), true).await?;
        read_representation(response).await
    }

    /// Delete the rows matched by the current filters and return them
    pub async fn delete(&self) -> Result<Value, PostgrestError> {
        if !self.has_filter() {
            return Err(PostgrestError::InvalidParameters(
                "Refusing to delete without a filter".to_string(),
            ));
        }
        let response = self.send(Method::DELETE, None, true).await?;
        read_representation(response).await
    }

    fn has_filter(&self) -> bool {
        self.query_params
            .keys()
            .any(|k| !matches!(k.as_str(), "select" | "order" | "limit"))
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        for (key, value) in &self.query_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url.to_string())
    }

    async fn send(
        &self,
        method: Method,
        body: Option<Vec<u8>>,
        representation: bool,
    ) -> Result<Response, PostgrestError> {
        let url = self.build_url()?;
        debug!("{} {} ({})", method, url, self.table());

        let mut headers = self.headers.clone();
        if representation {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("return=representation"),
            );
        }

        let mut request = self
            .http_client
            .request(method, &url)
            .headers(headers);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(PostgrestError::NetworkError)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        debug!("request failed with {}: {}", status, error_text);

        match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
            Ok(details) => Err(PostgrestError::ApiError { details, status }),
            Err(_) => Err(PostgrestError::UnparsedApiError {
                message: error_text,
                status,
            }),
        }
    }
}

// An empty body on success (204) reads as `Null`.
async fn read_representation(response: Response) -> Result<Value, PostgrestError> {
    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    if body_text.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(&body_text)
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, table: &str) -> PostgrestClient {
        PostgrestClient::new(&server.uri(), "fake-key", table, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_table_name_survives_builder_chain() {
        let client = PostgrestClient::new(
            "http://localhost:3000/",
            "fake-key",
            "service",
            reqwest::Client::new(),
        )
        .unwrap()
        .eq("id", "1")
        .limit(1);
        assert_eq!(client.table(), "service");
    }

    #[tokio::test]
    async fn test_select_with_order_and_filters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student"))
            .and(query_param("select", "id,ssid"))
            .and(query_param("status", "eq.Active"))
            .and(query_param("order", "last_name.asc"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "ssid": "S-1" },
                { "id": 2, "ssid": "S-2" }
            ])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "student")
            .select("id,ssid")
            .eq("status", "Active")
            .order("last_name", SortOrder::Ascending)
            .execute::<Value>()
            .await;

        let data = result.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(
            data.first()
                .and_then(|v: &Value| v.get("ssid"))
                .and_then(Value::as_str),
            Some("S-1")
        );
    }

    #[tokio::test]
    async fn test_in_list_filter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/app_user"))
            .and(query_param("role", "in.(Practitioner,Supervisor)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "app_user")
            .in_list("role", &["Practitioner", "Supervisor"])
            .execute::<Value>()
            .await;

        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let mock_server = MockServer::start().await;

        let payload = json!({ "claim_number": "C-100" });
        Mock::given(method("POST"))
            .and(path("/rest/v1/claim"))
            .and(header("prefer", "return=representation"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": 7, "claim_number": "C-100", "status": "Incomplete" }
            ])))
            .mount(&mock_server)
            .await;

        let created = client(&mock_server, "claim").insert(&payload).await.unwrap();

        assert_eq!(created[0]["id"], 7);
        assert_eq!(created[0]["status"], "Incomplete");
    }

    #[tokio::test]
    async fn test_update_patches_filtered_rows() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/service"))
            .and(query_param("id", "eq.3"))
            .and(body_json(json!({ "status": "Completed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 3, "status": "Completed" }
            ])))
            .mount(&mock_server)
            .await;

        let updated = client(&mock_server, "service")
            .eq("id", "3")
            .update(json!({ "status": "Completed" }))
            .await
            .unwrap();

        assert_eq!(updated[0]["status"], "Completed");
    }

    #[tokio::test]
    async fn test_update_without_filter_is_rejected() {
        let mock_server = MockServer::start().await;

        let result = client(&mock_server, "service")
            .select("*")
            .update(json!({ "status": "Completed" }))
            .await;

        assert!(matches!(result, Err(PostgrestError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_delete_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/claim"))
            .and(query_param("id", "eq.9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let deleted = client(&mock_server, "claim").eq("id", "9").delete().await.unwrap();

        assert_eq!(deleted, Value::Null);
    }

    #[tokio::test]
    async fn test_api_error_is_parsed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/student"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"student_ssid_key\"",
                "details": "Key (ssid)=(S-1) already exists.",
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "student")
            .insert(json!({ "ssid": "S-1" }))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("23505"));
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert!(err.message().contains("student_ssid_key"));
    }

    #[tokio::test]
    async fn test_unparsed_error_keeps_raw_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "student")
            .execute::<Value>()
            .await
            .unwrap_err();

        match err {
            PostgrestError::UnparsedApiError { message, status } => {
                assert_eq!(message, "Bad gateway");
                assert_eq!(status, StatusCode::BAD_GATEWAY);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schema_sets_profile_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student"))
            .and(header("accept-profile", "portal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "student")
            .schema("portal")
            .unwrap()
            .execute::<Value>()
            .await;

        assert!(result.is_ok());
    }
}
