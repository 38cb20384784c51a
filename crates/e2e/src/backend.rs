//! GraphQL client for the registry backend
//!
//! Every call is a single POST without retries or caching. The backend's
//! answer is validated before anything typed is handed back: transport
//! status first, then JSON, then the `errors` list, then `data`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use edgecheck_common::{ApiDeployApp, AppPage, AppSummary};

use crate::error::{E2eError, E2eResult};

/// Raw GraphQL response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,

    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

impl<T> GraphQlResponse<T> {
    /// Pick the meaningful branch of the envelope.
    ///
    /// A non-empty `errors` list wins over `data`.
    pub fn into_result(self) -> E2eResult<T> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            let rendered = serde_json::to_string(&errors)
                .unwrap_or_else(|_| format!("{:?}", errors));
            return Err(E2eError::GraphQl(rendered));
        }
        self.data.ok_or(E2eError::GraphQlNoData)
    }
}

const QUERY_APP_BY_ID: &str = r#"
query($id:ID!) {
  node(id:$id) {
    ... on DeployApp {
      id
      url
    }
  }
}
"#;

const QUERY_APPS_IN_NAMESPACE: &str = r#"
query($namespace:String!, $after:String) {
  getNamespace(name:$namespace) {
    apps(sortBy:NEWEST, after:$after) {
      pageInfo {
        endCursor
      }
      edges {
        node {
          id
          deleted
          createdAt
        }
      }
    }
  }
}
"#;

const MUTATION_DELETE_APP: &str = r#"
mutation($id:ID!) {
  deleteApp(input:{id:$id}) {
    success
  }
}
"#;

#[derive(Debug, Deserialize)]
struct NodeData {
    node: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceData {
    get_namespace: Option<NamespaceApps>,
}

#[derive(Debug, Deserialize)]
struct NamespaceApps {
    apps: AppConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppConnection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Option<AppEdge>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppEdge {
    node: Option<AppSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAppData {
    delete_app: Option<DeleteAppPayload>,
}

#[derive(Debug, Deserialize)]
struct DeleteAppPayload {
    success: bool,
}

/// Client for the registry GraphQL API
#[derive(Debug, Clone)]
pub struct BackendClient {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a query and decode its `data` into `T`
    pub async fn gql_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> E2eResult<T> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(serde_json::to_vec(&json!({
                "query": query,
                "variables": variables,
            }))?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!("Sending GraphQL query to {}", self.url);
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(E2eError::GraphQlStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphQlResponse<Value> = serde_json::from_str(&body)
            .map_err(|source| E2eError::GraphQlParse {
                source,
                body: body.clone(),
            })?;
        let data = envelope.into_result()?;
        if data.is_null() {
            return Err(E2eError::GraphQlNoData);
        }

        serde_json::from_value(data.clone())
            .map_err(|e| E2eError::GraphQlDecode(format!("{}: {}", e, data)))
    }

    /// Load an app by its id
    pub async fn get_app_by_id(&self, app_id: &str) -> E2eResult<ApiDeployApp> {
        let data: NodeData = self
            .gql_query(QUERY_APP_BY_ID, json!({ "id": app_id }))
            .await?;

        let node = match data.node {
            Some(node) if !node.is_null() => node,
            _ => {
                debug!("Backend returned no node for app {}", app_id);
                return Err(E2eError::AppNotFound(app_id.to_string()));
            }
        };

        serde_json::from_value(node.clone())
            .map_err(|e| E2eError::GraphQlDecode(format!("app node {}: {}", node, e)))
    }

    /// One page of apps in a namespace, newest first
    pub async fn apps_in_namespace(
        &self,
        namespace: &str,
        after: Option<&str>,
    ) -> E2eResult<AppPage> {
        let data: NamespaceData = self
            .gql_query(
                QUERY_APPS_IN_NAMESPACE,
                json!({ "namespace": namespace, "after": after }),
            )
            .await?;

        let connection = data
            .get_namespace
            .ok_or_else(|| E2eError::NamespaceNotFound(namespace.to_string()))?
            .apps;

        let apps = connection
            .edges
            .into_iter()
            .flatten()
            .filter_map(|edge| edge.node)
            .collect();

        Ok(AppPage {
            apps,
            last_cursor: connection.page_info.end_cursor,
        })
    }

    /// Every app in a namespace, following cursors until the listing ends
    pub async fn all_apps_in_namespace(&self, namespace: &str) -> E2eResult<Vec<AppSummary>> {
        let mut apps = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.apps_in_namespace(namespace, cursor.as_deref()).await?;
            let empty = page.apps.is_empty();
            apps.extend(page.apps);

            match page.last_cursor {
                Some(next) if !empty && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        debug!("Listed {} apps in namespace {}", apps.len(), namespace);
        Ok(apps)
    }

    /// Delete an app through the backend mutation
    pub async fn delete_app(&self, app_id: &str) -> E2eResult<()> {
        let data: DeleteAppData = self
            .gql_query(MUTATION_DELETE_APP, json!({ "id": app_id }))
            .await?;

        match data.delete_app {
            Some(payload) if payload.success => Ok(()),
            _ => Err(E2eError::DeleteFailed(app_id.to_string())),
        }
    }
}
