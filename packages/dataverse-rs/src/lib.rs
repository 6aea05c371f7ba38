//! Minimal Dataverse (OData Web API) client
//!
//! A clean client for collection-level create and delete calls against a
//! Dataverse-style OData endpoint, with no domain-specific logic. Foreign
//! keys are supplied at creation time via `@odata.bind` properties on the
//! payload — callers build those with [`DataverseService::bind`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dataverse::{DataverseOptions, DataverseService};
//! use serde_json::json;
//!
//! let service = DataverseService::new(DataverseOptions {
//!     base_url: "https://org.api.crm.dynamics.com/api/data/v9.2".into(),
//!     access_token: token,
//! })?;
//!
//! let contact_id = service
//!     .create("contacts", json!({"firstname": "Ada", "lastname": "Lovelace"}))
//!     .await?;
//!
//! let address_id = service
//!     .create("customeraddresses", json!({
//!         "line1": "1 Main St",
//!         "parentid_contact@odata.bind": DataverseService::bind("contacts", contact_id),
//!     }))
//!     .await?;
//! ```

pub mod error;
pub mod models;

use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DataverseError, Result};
use crate::models::ODataErrorResponse;

/// Connection settings for a Dataverse environment.
#[derive(Debug, Clone)]
pub struct DataverseOptions {
    /// Web API root, e.g. `https://org.api.crm.dynamics.com/api/data/v9.2`
    pub base_url: String,
    /// Bearer token for the service principal. Token acquisition is the
    /// caller's concern.
    pub access_token: String,
}

/// Client for one Dataverse environment.
#[derive(Debug, Clone)]
pub struct DataverseService {
    options: DataverseOptions,
    client: Client,
}

impl DataverseService {
    pub fn new(options: DataverseOptions) -> Result<Self> {
        if options.base_url.is_empty() {
            return Err(DataverseError::Config("base_url must not be empty".into()));
        }
        let client = Client::builder().build()?;
        Ok(Self { options, client })
    }

    /// Render an `@odata.bind` value pointing at an existing record.
    pub fn bind(entity_set: &str, id: Uuid) -> String {
        format!("/{}({})", entity_set, id)
    }

    /// Create a record in `entity_set` and return its generated id.
    ///
    /// Dataverse answers a successful create with `204 No Content` and an
    /// `OData-EntityId` header naming the new record.
    pub async fn create(&self, entity_set: &str, payload: Value) -> Result<Uuid> {
        let url = format!("{}/{}", self.options.base_url.trim_end_matches('/'), entity_set);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.options.access_token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let entity_id = response
            .headers()
            .get("OData-EntityId")
            .and_then(|v| v.to_str().ok())
            .ok_or(DataverseError::MissingEntityId)?;

        parse_entity_id(entity_id)
    }

    /// Delete a record by id. Used for saga compensation.
    pub async fn delete(&self, entity_set: &str, id: Uuid) -> Result<()> {
        let url = format!(
            "{}/{}({})",
            self.options.base_url.trim_end_matches('/'),
            entity_set,
            id
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.options.access_token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .send()
            .await?;

        // A delete of an already-gone record is treated as done.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(entity_set, %id, "delete target already absent");
            return Ok(());
        }

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }

    async fn api_error(response: Response) -> DataverseError {
        let status = response.status().as_u16();
        match response.json::<ODataErrorResponse>().await {
            Ok(body) => DataverseError::Api {
                status,
                code: body.error.code,
                message: body.error.message,
            },
            Err(_) => DataverseError::Api {
                status,
                code: None,
                message: "unparseable error body".into(),
            },
        }
    }
}

/// Extract the GUID from an `OData-EntityId` header value, e.g.
/// `https://org.api.crm.dynamics.com/api/data/v9.2/contacts(00000000-0000-0000-0000-000000000000)`.
fn parse_entity_id(header: &str) -> Result<Uuid> {
    let open = header
        .rfind('(')
        .ok_or_else(|| DataverseError::Parse(format!("no '(' in entity id: {header}")))?;
    let close = header
        .rfind(')')
        .ok_or_else(|| DataverseError::Parse(format!("no ')' in entity id: {header}")))?;
    if close <= open + 1 {
        return Err(DataverseError::Parse(format!("empty entity id: {header}")));
    }
    Uuid::parse_str(&header[open + 1..close])
        .map_err(|e| DataverseError::Parse(format!("bad GUID in entity id: {e}")))
}
