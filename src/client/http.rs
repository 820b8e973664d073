//! REST implementation of the remote client
//!
//! Identity objects (groups, users, roles) live in the IAM admin API of the
//! tenant's realm; everything else in the platform API. The API key is an
//! offline refresh token exchanged for short-lived bearer tokens.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::types::*;
use super::RemoteClient;
use crate::common::config::ConnectionSettings;
use crate::common::{Error, Result};

/// IAM client that owns the platform's roles
const AST_APP: &str = "ast-app";

/// Refresh the bearer token this long before it expires
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

const RESULTS_PAGE_SIZE: usize = 200;

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    300
}

#[derive(Deserialize)]
struct IamClient {
    id: String,
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Deserialize, Default)]
struct ApplicationList {
    #[serde(default)]
    applications: Vec<Application>,
}

#[derive(Deserialize, Default)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize, Default)]
struct PresetList {
    #[serde(default)]
    presets: Vec<Preset>,
}

#[derive(Deserialize, Default)]
struct ScanList {
    #[serde(default)]
    scans: Vec<Scan>,
}

#[derive(Deserialize)]
struct UploadTarget {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQueryWire {
    #[serde(rename = "lang")]
    language: String,
    group: String,
    name: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    severity: String,
}

#[derive(Deserialize)]
struct CompileOutcome {
    success: bool,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResultPage {
    #[serde(default)]
    results: Vec<ResultWire>,
    #[serde(default)]
    total_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultWire {
    #[serde(default)]
    id: String,
    #[serde(default)]
    similarity_id: i64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    data: ResultData,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResultData {
    #[serde(default)]
    query_id: u64,
    #[serde(default)]
    query_name: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    language_name: String,
    #[serde(default)]
    result_hash: String,
}

impl From<ResultWire> for ScanResult {
    fn from(wire: ResultWire) -> Self {
        Self {
            id: wire.id,
            hash: wire.data.result_hash,
            similarity_id: wire.similarity_id,
            query_id: wire.data.query_id,
            language: wire.data.language_name,
            group: wire.data.group,
            query_name: wire.data.query_name,
            state: wire.state,
            severity: wire.severity,
        }
    }
}

/// Client for the platform and IAM REST APIs
pub struct HttpClient {
    http: reqwest::Client,
    settings: ConnectionSettings,
    api_key: String,
    token: Mutex<Option<AccessToken>>,
    /// IAM clientId -> internal client UUID
    iam_clients: Mutex<HashMap<String, String>>,
}

impl HttpClient {
    /// Build a client without contacting the remote
    pub fn new(settings: ConnectionSettings, api_key: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("crud-e2e");

        if let Some(proxy) = &settings.proxy_url {
            builder = builder
                .proxy(reqwest::Proxy::all(proxy)?)
                .danger_accept_invalid_certs(true);
            tracing::info!("Running with proxy: {}", proxy);
        }

        Ok(Self {
            http: builder.build()?,
            settings,
            api_key: api_key.to_string(),
            token: Mutex::new(None),
            iam_clients: Mutex::new(HashMap::new()),
        })
    }

    /// Build a client and authenticate, failing fast on bad credentials
    pub async fn connect(settings: ConnectionSettings, api_key: &str) -> Result<Self> {
        let client = Self::new(settings, api_key)?;
        client.bearer().await?;
        Ok(client)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.settings.cx1_url, path)
    }

    fn iam_url(&self, path: &str) -> String {
        format!(
            "{}/auth/admin/realms/{}{}",
            self.settings.iam_url, self.settings.tenant, path
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/auth/realms/{}/protocol/openid-connect/token",
            self.settings.iam_url, self.settings.tenant
        )
    }

    /// Current bearer token, refreshed when close to expiry
    async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if current.expires_at > Instant::now() + TOKEN_MARGIN {
                return Ok(current.value.clone());
            }
        }

        let fresh = self.authenticate().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn authenticate(&self) -> Result<AccessToken> {
        tracing::debug!("Requesting access token from {}", self.token_url());
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", AST_APP),
                ("refresh_token", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!("{}: {}", status, body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("unreadable token response: {}", e)))?;

        Ok(AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.bearer().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        let method = request.method().to_string();
        let path = request.url().path().to_string();
        tracing::trace!("{} {}", method, request.url());

        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(Error::Remote {
            method,
            path,
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let builder = self.request(Method::GET, url).await?.query(query);
        Ok(self.execute(builder).await?.json().await?)
    }

    async fn send_json(&self, method: Method, url: &str, body: &Value) -> Result<Response> {
        let builder = self.request(method, url).await?.json(body);
        self.execute(builder).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, url).await?;
        self.execute(builder).await?;
        Ok(())
    }

    /// Internal UUID of an IAM client
    async fn iam_client_id(&self, client_id: &str) -> Result<String> {
        if let Some(id) = self.iam_clients.lock().await.get(client_id) {
            return Ok(id.clone());
        }

        let clients: Vec<IamClient> = self
            .get_json(&self.iam_url("/clients"), &[("clientId", client_id)])
            .await?;
        let client = clients
            .into_iter()
            .find(|c| c.client_id == client_id)
            .ok_or_else(|| Error::not_found("IAM client", client_id))?;

        self.iam_clients
            .lock()
            .await
            .insert(client_id.to_string(), client.id.clone());
        Ok(client.id)
    }

    async fn ast_app_roles_url(&self) -> Result<String> {
        let id = self.iam_client_id(AST_APP).await?;
        Ok(self.iam_url(&format!("/clients/{}/roles", id)))
    }

    async fn user_roles_url(&self, user: &User) -> Result<String> {
        let id = self.iam_client_id(AST_APP).await?;
        Ok(self.iam_url(&format!(
            "/users/{}/role-mappings/clients/{}",
            user.id, id
        )))
    }
}

impl fmt::Display for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tenant {} on {} (IAM {})",
            self.settings.tenant, self.settings.cx1_url, self.settings.iam_url
        )
    }
}

/// Identifier at the end of a `Location` header
fn created_id(response: &Response) -> Result<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| location.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Internal("response carries no Location header".to_string()))
}

/// Turn a 404 into a not-found error for the named entity
fn missing_as<'a>(kind: &'static str, key: &'a str) -> impl FnOnce(Error) -> Error + 'a {
    move |e| match e {
        Error::Remote { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            Error::not_found(kind, key)
        }
        other => other,
    }
}

/// Depth-first search of a group tree for an exact name
fn find_group(groups: &[Group], name: &str) -> Option<Group> {
    for group in groups {
        if group.name == name {
            return Some(group.clone());
        }
        if let Some(found) = find_group(&group.sub_groups, name) {
            return Some(found);
        }
    }
    None
}

fn scan_config(request: &ScanRequest) -> Vec<Value> {
    request
        .engines
        .iter()
        .map(|engine| {
            let mut value = serde_json::Map::new();
            if engine == "sast" {
                value.insert("incremental".into(), json!(request.incremental.to_string()));
                if let Some(preset) = &request.preset {
                    value.insert("presetName".into(), json!(preset));
                }
            }
            json!({ "type": engine, "value": value })
        })
        .collect()
}

fn predicate_body(project: &Project, result: &ScanResult, predicate: &ResultPredicate) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("similarityId".into(), json!(result.similarity_id.to_string()));
    body.insert("projectId".into(), json!(project.id));
    for (key, value) in [
        ("state", &predicate.state),
        ("severity", &predicate.severity),
        ("comment", &predicate.comment),
    ] {
        if !value.is_empty() {
            body.insert(key.into(), json!(value));
        }
    }
    Value::Array(vec![Value::Object(body)])
}

#[async_trait]
impl RemoteClient for HttpClient {
    // === Groups ===

    async fn get_group_by_name(&self, name: &str) -> Result<Group> {
        let groups: Vec<Group> = self
            .get_json(
                &self.iam_url("/groups"),
                &[("search", name), ("briefRepresentation", "true")],
            )
            .await?;
        find_group(&groups, name).ok_or_else(|| Error::not_found("Group", name))
    }

    async fn create_group(&self, name: &str, parent: Option<&Group>) -> Result<Group> {
        let (url, path) = match parent {
            Some(parent) => (
                self.iam_url(&format!("/groups/{}/children", parent.id)),
                format!("{}/{}", parent.path, name),
            ),
            None => (self.iam_url("/groups"), format!("/{}", name)),
        };
        let response = self.send_json(Method::POST, &url, &json!({ "name": name })).await?;
        Ok(Group {
            id: created_id(&response)?,
            name: name.to_string(),
            path,
            parent_id: parent.map(|p| p.id.clone()),
            sub_groups: Vec::new(),
        })
    }

    async fn update_group(&self, group: &Group) -> Result<()> {
        let url = self.iam_url(&format!("/groups/{}", group.id));
        self.send_json(Method::PUT, &url, &json!({ "name": group.name }))
            .await?;
        Ok(())
    }

    async fn delete_group(&self, group: &Group) -> Result<()> {
        self.delete(&self.iam_url(&format!("/groups/{}", group.id)))
            .await
    }

    async fn get_client_role_by_name(&self, client_id: &str, name: &str) -> Result<Role> {
        let id = self.iam_client_id(client_id).await?;
        let url = self.iam_url(&format!("/clients/{}/roles/{}", id, name));
        let key = format!("{}/{}", client_id, name);
        self.get_json(&url, &[])
            .await
            .map_err(missing_as("Client role", &key))
    }

    async fn get_group_client_roles(&self, group: &Group, client_id: &str) -> Result<Vec<Role>> {
        let id = self.iam_client_id(client_id).await?;
        let url = self.iam_url(&format!(
            "/groups/{}/role-mappings/clients/{}",
            group.id, id
        ));
        self.get_json(&url, &[]).await
    }

    async fn add_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()> {
        let id = self.iam_client_id(client_id).await?;
        let url = self.iam_url(&format!(
            "/groups/{}/role-mappings/clients/{}",
            group.id, id
        ));
        self.send_json(Method::POST, &url, &serde_json::to_value(roles)?)
            .await?;
        Ok(())
    }

    async fn remove_group_client_roles(
        &self,
        group: &Group,
        client_id: &str,
        roles: &[Role],
    ) -> Result<()> {
        let id = self.iam_client_id(client_id).await?;
        let url = self.iam_url(&format!(
            "/groups/{}/role-mappings/clients/{}",
            group.id, id
        ));
        self.send_json(Method::DELETE, &url, &serde_json::to_value(roles)?)
            .await?;
        Ok(())
    }

    // === Users ===

    async fn create_user(&self, user: &User) -> Result<User> {
        let response = self
            .send_json(Method::POST, &self.iam_url("/users"), &serde_json::to_value(user)?)
            .await?;
        let mut created = user.clone();
        created.id = created_id(&response)?;
        Ok(created)
    }

    async fn get_user_by_name(&self, username: &str) -> Result<User> {
        let users: Vec<User> = self
            .get_json(
                &self.iam_url("/users"),
                &[("username", username), ("exact", "true")],
            )
            .await?;
        users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .ok_or_else(|| Error::not_found("User", username))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let users: Vec<User> = self
            .get_json(&self.iam_url("/users"), &[("email", email), ("exact", "true")])
            .await?;
        users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| Error::not_found("User", email))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let url = self.iam_url(&format!("/users/{}", user.id));
        self.send_json(Method::PUT, &url, &serde_json::to_value(user)?)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        self.delete(&self.iam_url(&format!("/users/{}", user.id)))
            .await
    }

    async fn get_user_groups(&self, user: &User) -> Result<Vec<Group>> {
        let url = self.iam_url(&format!("/users/{}/groups", user.id));
        self.get_json(&url, &[]).await
    }

    async fn add_user_to_group(&self, user: &User, group_id: &str) -> Result<()> {
        let url = self.iam_url(&format!("/users/{}/groups/{}", user.id, group_id));
        let builder = self.request(Method::PUT, &url).await?;
        self.execute(builder).await?;
        Ok(())
    }

    async fn remove_user_from_group(&self, user: &User, group_id: &str) -> Result<()> {
        self.delete(&self.iam_url(&format!("/users/{}/groups/{}", user.id, group_id)))
            .await
    }

    async fn get_user_roles(&self, user: &User) -> Result<Vec<Role>> {
        let url = self.user_roles_url(user).await?;
        self.get_json(&url, &[]).await
    }

    async fn add_user_roles(&self, user: &User, roles: &[Role]) -> Result<()> {
        let url = self.user_roles_url(user).await?;
        self.send_json(Method::POST, &url, &serde_json::to_value(roles)?)
            .await?;
        Ok(())
    }

    async fn remove_user_roles(&self, user: &User, roles: &[Role]) -> Result<()> {
        let url = self.user_roles_url(user).await?;
        self.send_json(Method::DELETE, &url, &serde_json::to_value(roles)?)
            .await?;
        Ok(())
    }

    // === Roles ===

    async fn create_role(&self, name: &str, description: &str) -> Result<Role> {
        let url = self.ast_app_roles_url().await?;
        self.send_json(
            Method::POST,
            &url,
            &json!({ "name": name, "description": description }),
        )
        .await?;
        self.get_role_by_name(name).await
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role> {
        let url = format!("{}/{}", self.ast_app_roles_url().await?, name);
        self.get_json(&url, &[])
            .await
            .map_err(missing_as("Role", name))
    }

    async fn update_role(&self, role: &Role) -> Result<()> {
        let url = self.iam_url(&format!("/roles-by-id/{}", role.id));
        self.send_json(Method::PUT, &url, &serde_json::to_value(role)?)
            .await?;
        Ok(())
    }

    async fn delete_role(&self, role: &Role) -> Result<()> {
        self.delete(&self.iam_url(&format!("/roles-by-id/{}", role.id)))
            .await
    }

    async fn get_role_composites(&self, role: &Role) -> Result<Vec<Role>> {
        let url = self.iam_url(&format!("/roles-by-id/{}/composites", role.id));
        self.get_json(&url, &[]).await
    }

    async fn add_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()> {
        let url = self.iam_url(&format!("/roles-by-id/{}/composites", role.id));
        self.send_json(Method::POST, &url, &serde_json::to_value(composites)?)
            .await?;
        Ok(())
    }

    async fn remove_role_composites(&self, role: &Role, composites: &[Role]) -> Result<()> {
        let url = self.iam_url(&format!("/roles-by-id/{}/composites", role.id));
        self.send_json(Method::DELETE, &url, &serde_json::to_value(composites)?)
            .await?;
        Ok(())
    }

    // === Applications ===

    async fn create_application(&self, application: &Application) -> Result<Application> {
        let response = self
            .send_json(
                Method::POST,
                &self.api_url("/applications"),
                &serde_json::to_value(application)?,
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn get_application_by_name(&self, name: &str) -> Result<Application> {
        let list: ApplicationList = self
            .get_json(&self.api_url("/applications"), &[("name", name)])
            .await?;
        list.applications
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::not_found("Application", name))
    }

    async fn update_application(&self, application: &Application) -> Result<()> {
        let url = self.api_url(&format!("/applications/{}", application.id));
        self.send_json(Method::PUT, &url, &serde_json::to_value(application)?)
            .await?;
        Ok(())
    }

    async fn delete_application(&self, application: &Application) -> Result<()> {
        self.delete(&self.api_url(&format!("/applications/{}", application.id)))
            .await
    }

    // === Projects ===

    async fn create_project(&self, project: &Project) -> Result<Project> {
        let response = self
            .send_json(
                Method::POST,
                &self.api_url("/projects"),
                &serde_json::to_value(project)?,
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        let list: ProjectList = self
            .get_json(&self.api_url("/projects"), &[("names", name)])
            .await?;
        list.projects
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::not_found("Project", name))
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        let url = self.api_url(&format!("/projects/{}", project.id));
        self.send_json(Method::PUT, &url, &serde_json::to_value(project)?)
            .await?;
        Ok(())
    }

    async fn delete_project(&self, project: &Project) -> Result<()> {
        self.delete(&self.api_url(&format!("/projects/{}", project.id)))
            .await
    }

    // === Queries ===

    async fn get_query_by_id(&self, id: u64) -> Result<Query> {
        let catalog: Vec<Query> = self.get_json(&self.api_url("/queries"), &[]).await?;
        catalog
            .into_iter()
            .find(|q| q.id == id)
            .ok_or_else(|| Error::not_found("Query", format!("#{}", id)))
    }

    async fn get_query_by_name(&self, language: &str, group: &str, name: &str) -> Result<Query> {
        let catalog: Vec<Query> = self.get_json(&self.api_url("/queries"), &[]).await?;
        catalog
            .into_iter()
            .find(|q| {
                q.language.eq_ignore_ascii_case(language)
                    && q.group.eq_ignore_ascii_case(group)
                    && q.name.eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| {
                Error::not_found("Query", format!("{} -> {} -> {}", language, group, name))
            })
    }

    async fn get_audit_query(
        &self,
        scope: &QueryScope,
        language: &str,
        group: &str,
        name: &str,
    ) -> Result<AuditQuery> {
        let queries: Vec<AuditQueryWire> = self
            .get_json(
                &self.api_url("/cx-audit/queries"),
                &[("level", scope.level()), ("levelId", scope.level_id())],
            )
            .await?;
        queries
            .into_iter()
            .find(|q| q.language == language && q.group == group && q.name == name)
            .map(|q| AuditQuery {
                scope: scope.clone(),
                language: q.language,
                group: q.group,
                name: q.name,
                source: q.source,
                severity: q.severity,
            })
            .ok_or_else(|| {
                Error::not_found(
                    "Query",
                    format!("{}: {} -> {} -> {}", scope, language, group, name),
                )
            })
    }

    async fn save_audit_query(&self, query: &AuditQuery) -> Result<AuditQuery> {
        let url = self.api_url(&format!(
            "/cx-audit/queries/{}/{}",
            query.scope.level(),
            query.scope.level_id()
        ));
        let body = json!({
            "lang": query.language,
            "group": query.group,
            "name": query.name,
            "source": query.source,
            "severity": query.severity,
        });
        self.send_json(Method::PUT, &url, &body).await?;
        Ok(query.clone())
    }

    async fn compile_audit_query(&self, query: &AuditQuery) -> Result<()> {
        let body = json!({
            "lang": query.language,
            "source": query.source,
            "level": query.scope.level(),
            "levelId": query.scope.level_id(),
        });
        let outcome: CompileOutcome = self
            .send_json(Method::POST, &self.api_url("/cx-audit/queries/compile"), &body)
            .await?
            .json()
            .await?;
        if outcome.success {
            Ok(())
        } else {
            Err(Error::Compile(outcome.errors.join("; ")))
        }
    }

    async fn delete_audit_query(&self, query: &AuditQuery) -> Result<()> {
        let url = self.api_url(&format!(
            "/cx-audit/queries/{}/{}",
            query.scope.level(),
            query.scope.level_id()
        ));
        let path = query.path();
        let builder = self
            .request(Method::DELETE, &url)
            .await?
            .query(&[("path", path.as_str())]);
        self.execute(builder)
            .await
            .map_err(missing_as("Query", &path))?;
        Ok(())
    }

    // === Presets ===

    async fn create_preset(&self, preset: &Preset) -> Result<Preset> {
        let body = json!({
            "name": preset.name,
            "description": preset.description,
            "queryIds": preset.query_ids,
        });
        let created: Value = self
            .send_json(Method::POST, &self.api_url("/presets"), &body)
            .await?
            .json()
            .await?;
        let id = created["id"]
            .as_u64()
            .ok_or_else(|| Error::Internal("preset creation returned no id".to_string()))?;
        Ok(Preset {
            id,
            ..preset.clone()
        })
    }

    async fn get_preset_by_name(&self, name: &str) -> Result<Preset> {
        let list: PresetList = self
            .get_json(
                &self.api_url("/presets"),
                &[("exact_match", "true"), ("name", name)],
            )
            .await?;
        let summary = list
            .presets
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::not_found("Preset", name))?;
        self.get_json(&self.api_url(&format!("/presets/{}", summary.id)), &[])
            .await
    }

    async fn update_preset(&self, preset: &Preset) -> Result<()> {
        let url = self.api_url(&format!("/presets/{}", preset.id));
        self.send_json(Method::PUT, &url, &serde_json::to_value(preset)?)
            .await?;
        Ok(())
    }

    async fn delete_preset(&self, preset: &Preset) -> Result<()> {
        self.delete(&self.api_url(&format!("/presets/{}", preset.id)))
            .await
    }

    // === Scans ===

    async fn start_scan(&self, request: &ScanRequest) -> Result<Scan> {
        let (scan_type, handler) = match &request.source {
            ScanSource::Archive(bytes) => {
                let target: UploadTarget = self
                    .send_json(Method::POST, &self.api_url("/uploads"), &json!({}))
                    .await?
                    .json()
                    .await?;
                // Upload URLs are pre-signed and take no bearer token.
                let upload = self
                    .http
                    .put(&target.url)
                    .header(header::CONTENT_TYPE, "application/zip")
                    .body(bytes.clone());
                self.execute(upload).await?;
                (
                    "upload",
                    json!({ "uploadUrl": target.url, "branch": request.branch }),
                )
            }
            ScanSource::Repository(url) => (
                "git",
                json!({ "repoUrl": url, "branch": request.branch }),
            ),
        };

        let body = json!({
            "project": { "id": request.project_id },
            "type": scan_type,
            "handler": handler,
            "config": scan_config(request),
        });
        Ok(self
            .send_json(Method::POST, &self.api_url("/scans"), &body)
            .await?
            .json()
            .await?)
    }

    async fn get_scan_by_id(&self, id: &str) -> Result<Scan> {
        self.get_json(&self.api_url(&format!("/scans/{}", id)), &[])
            .await
            .map_err(missing_as("Scan", id))
    }

    async fn get_last_scan(&self, project: &Project, branch: Option<&str>) -> Result<Scan> {
        let mut query = vec![
            ("project-id", project.id.as_str()),
            ("limit", "1"),
            ("sort", "-created_at"),
        ];
        if let Some(branch) = branch {
            query.push(("branch", branch));
        }
        let list: ScanList = self.get_json(&self.api_url("/scans"), &query).await?;
        list.scans
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("Scan", format!("last scan of {}", project.name)))
    }

    async fn delete_scan(&self, scan: &Scan) -> Result<()> {
        self.delete(&self.api_url(&format!("/scans/{}", scan.id)))
            .await
    }

    // === Results ===

    async fn get_scan_results(&self, scan: &Scan) -> Result<Vec<ScanResult>> {
        let mut results = Vec::new();
        let limit = RESULTS_PAGE_SIZE.to_string();
        loop {
            let offset = results.len().to_string();
            let page: ResultPage = self
                .get_json(
                    &self.api_url("/results"),
                    &[
                        ("scan-id", scan.id.as_str()),
                        ("limit", limit.as_str()),
                        ("offset", offset.as_str()),
                    ],
                )
                .await?;
            let received = page.results.len();
            results.extend(page.results.into_iter().map(ScanResult::from));
            if received == 0 || results.len() >= page.total_count {
                break;
            }
        }
        tracing::debug!("Scan {} has {} results", scan.id, results.len());
        Ok(results)
    }

    async fn add_result_predicate(
        &self,
        project: &Project,
        result: &ScanResult,
        predicate: &ResultPredicate,
    ) -> Result<()> {
        self.send_json(
            Method::POST,
            &self.api_url("/sast-results-predicates"),
            &predicate_body(project, result, predicate),
        )
        .await?;
        Ok(())
    }
}
