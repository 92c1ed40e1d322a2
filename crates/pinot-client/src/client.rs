use pinot_core::Document;
use pinot_core::schema::SchemaDocument;
use pinot_core::table_id::{Flavor, TableId};
use pinot_core::user::{Component, UserRecord};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthMode;
use crate::config::ClientConfig;
use crate::error::ClientError;

const DATABASE_HEADER: &str = "Database";

/// Client for the Pinot controller REST API.
///
/// Every call is a single request with the configured timeout; nothing is
/// retried. Dropping a returned future aborts the in-flight request.
#[derive(Debug, Clone)]
pub struct PinotClient {
    http: reqwest::Client,
    base: Url,
    auth: AuthMode,
    database: Option<String>,
}

impl PinotClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let raw = config.controller_url.trim().trim_end_matches('/');
        let base = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(raw.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        let auth = AuthMode::select(config);
        tracing::debug!(controller = %base, auth = auth.kind(), "pinot client configured");

        Ok(Self {
            http,
            base,
            auth,
            database: config.database.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // ── Schemas ──────────────────────────────────────────────────────────

    pub async fn create_schema(&self, schema: &SchemaDocument) -> Result<(), ClientError> {
        let url = self.url(&["schemas"])?;
        self.send(Method::POST, url, Some(schema)).await?;
        Ok(())
    }

    pub async fn get_schema(&self, name: &str) -> Result<Value, ClientError> {
        let url = self.url(&["schemas", name])?;
        let body = self.send(Method::GET, url, None::<&()>).await?;
        parse_body(&body)
    }

    /// `PUT /schemas/{schemaName}`, the name taken from the document.
    pub async fn update_schema(&self, schema: &SchemaDocument) -> Result<(), ClientError> {
        if schema.schema_name.is_empty() {
            return Err(ClientError::MissingField("schemaName"));
        }
        let url = self.url(&["schemas", &schema.schema_name])?;
        self.send(Method::PUT, url, Some(schema)).await?;
        Ok(())
    }

    pub async fn delete_schema(&self, name: &str) -> Result<(), ClientError> {
        let url = self.url(&["schemas", name])?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    // ── Tables ───────────────────────────────────────────────────────────

    pub async fn create_table(&self, config: &Document) -> Result<(), ClientError> {
        let url = self.url(&["tables"])?;
        self.send(Method::POST, url, Some(config)).await?;
        Ok(())
    }

    /// Raw `GET /tables/{compositeId}` body, still wrapped under its flavor key.
    pub async fn get_table(&self, table_id: &str) -> Result<Value, ClientError> {
        let url = self.url(&["tables", table_id])?;
        let body = self.send(Method::GET, url, None::<&()>).await?;
        parse_body(&body)
    }

    /// `PUT /tables/{tableName}`, the name taken from the document.
    pub async fn update_table(&self, config: &Document) -> Result<(), ClientError> {
        let name = config
            .get("tableName")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or(ClientError::MissingField("tableName"))?;
        let url = self.url(&["tables", name])?;
        self.send(Method::PUT, url, Some(config)).await?;
        Ok(())
    }

    /// `DELETE /tables/{logical}?type=FLAVOR`. A 404 counts as already gone.
    pub async fn delete_table_by_logical(
        &self,
        logical: &str,
        flavor: Flavor,
    ) -> Result<(), ClientError> {
        let mut url = self.url(&["tables", logical])?;
        url.query_pairs_mut().append_pair("type", flavor.as_str());
        match self.send(Method::DELETE, url, None::<&()>).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(table = logical, flavor = %flavor, "table already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Legacy `DELETE /tables/{compositeId}`.
    pub async fn delete_table(&self, table_id: &str) -> Result<(), ClientError> {
        let url = self.url(&["tables", table_id])?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    pub async fn reload_table_segments(&self, table: &TableId) -> Result<(), ClientError> {
        let mut url = self.url(&["segments", &table.logical, "reload"])?;
        url.query_pairs_mut()
            .append_pair("type", table.flavor.as_str());
        self.send(Method::POST, url, None::<&()>).await?;
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────────

    pub async fn create_user(&self, user: &UserRecord) -> Result<(), ClientError> {
        let url = self.url(&["users"])?;
        self.send(Method::POST, url, Some(user)).await?;
        Ok(())
    }

    /// Raw `GET /users/{username}` body. Its shape varies across controller
    /// versions; see [`pinot_core::user::disambiguate`].
    pub async fn get_user(&self, username: &str, component: Component) -> Result<Value, ClientError> {
        let url = self.user_url(username, component)?;
        let body = self.send(Method::GET, url, None::<&()>).await?;
        parse_body(&body)
    }

    pub async fn update_user(&self, user: &UserRecord) -> Result<(), ClientError> {
        if user.username.is_empty() {
            return Err(ClientError::MissingField("username"));
        }
        let url = self.user_url(&user.username, user.component)?;
        self.send(Method::PUT, url, Some(user)).await?;
        Ok(())
    }

    pub async fn delete_user(&self, username: &str, component: Component) -> Result<(), ClientError> {
        if username.is_empty() {
            return Err(ClientError::MissingField("username"));
        }
        let url = self.user_url(username, component)?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    // ── Plumbing ─────────────────────────────────────────────────────────

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // Both parameter names are sent; controllers disagree on which one they read.
    fn user_url(&self, username: &str, component: Component) -> Result<Url, ClientError> {
        let mut url = self.url(&["users", username])?;
        url.query_pairs_mut()
            .append_pair("component", component.as_str())
            .append_pair("componentType", component.as_str());
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String, ClientError> {
        tracing::debug!(method = %method, url = %url, "controller request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(value) = self.auth.header_value() {
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(database) = &self.database {
            request = request.header(DATABASE_HEADER, database);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() >= 400 {
            tracing::debug!(method = %method, url = %url, status = status.as_u16(), "controller error response");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

fn parse_body(body: &str) -> Result<Value, ClientError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
