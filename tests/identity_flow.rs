//! End-to-end flows against an in-process fake identity + object-storage service

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use stratus_client::{
    Config, Context, Error, ErrorKind, IdentitySnapshot, ListObjectsOptions, ObjectMetadata,
    RequestOptions,
};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeCloud {
    base_url: String,
    tokens: HashSet<String>,
    token_requests: usize,
    containers: BTreeMap<String, BTreeMap<String, (Bytes, HashMap<String, String>)>>,
}

type Shared = Arc<Mutex<FakeCloud>>;

// Helper to spawn a server on a random port
async fn spawn_server() -> (String, Shared) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let state: Shared = Arc::new(Mutex::new(FakeCloud {
        base_url: base_url.clone(),
        ..Default::default()
    }));

    let app = Router::new()
        .route("/v2.0/tokens", post(issue_token))
        .route("/v2.0/tenants", get(list_tenants))
        .route("/v1/{account}", get(list_containers))
        .route("/v1/{account}/{container}", any(container_op))
        .route("/v1/{account}/{container}/{*object}", any(object_op))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, state)
}

async fn issue_token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut cloud = state.lock();
    cloud.token_requests += 1;
    let auth = &body["auth"];

    let valid = if let Some(id) = auth["token"]["id"].as_str() {
        cloud.tokens.contains(id)
    } else {
        auth["passwordCredentials"]["username"] == "alice"
            && auth["passwordCredentials"]["password"] == "secret"
    };
    if !valid {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }

    let tenant = match (auth["tenantId"].as_str(), auth["tenantName"].as_str()) {
        (Some(id), _) => Some((id.to_string(), format!("project-{id}"))),
        (None, Some(name)) => Some((format!("id-{name}"), name.to_string())),
        _ => None,
    };

    let token_id = format!("token-{}", cloud.tokens.len() + 1);
    cloud.tokens.insert(token_id.clone());

    let account = tenant.as_ref().map(|(id, _)| id.as_str()).unwrap_or("none");
    let mut token = json!({
        "id": token_id,
        "expires": (Utc::now() + Duration::hours(12)).to_rfc3339(),
    });
    if let Some((id, name)) = &tenant {
        token["tenant"] = json!({"id": id, "name": name});
    }

    Json(json!({"access": {
        "token": token,
        "serviceCatalog": [
            {
                "name": "swift",
                "type": "object-store",
                "endpoints": [{
                    "region": "local",
                    "publicURL": format!("{}/v1/AUTH_{account}", cloud.base_url)
                }]
            },
            {
                "name": "keystone",
                "type": "identity",
                "endpoints": [{"region": "local", "publicURL": format!("{}/v2.0", cloud.base_url)}]
            }
        ],
        "user": {"id": "u1", "name": "alice", "roles": [{"name": "member"}]}
    }}))
    .into_response()
}

fn authorized(cloud: &FakeCloud, headers: &HeaderMap) -> bool {
    headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| cloud.tokens.contains(t))
}

async fn list_tenants(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let cloud = state.lock();
    if !authorized(&cloud, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"tenants": [
        {"id": "t1", "name": "project-t1", "enabled": true},
        {"id": "t2", "name": "project-t2", "enabled": true}
    ]}))
    .into_response()
}

async fn list_containers(
    State(state): State<Shared>,
    Path(_account): Path<String>,
    headers: HeaderMap,
) -> Response {
    let cloud = state.lock();
    if !authorized(&cloud, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if cloud.containers.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    let listing: Vec<Value> = cloud
        .containers
        .iter()
        .map(|(name, objects)| {
            let bytes: usize = objects.values().map(|(data, _)| data.len()).sum();
            json!({"name": name, "count": objects.len(), "bytes": bytes})
        })
        .collect();
    Json(listing).into_response()
}

async fn container_op(
    State(state): State<Shared>,
    method: HttpMethod,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut cloud = state.lock();
    if !authorized(&cloud, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match method.as_str() {
        "PUT" => {
            cloud.containers.entry(container).or_default();
            StatusCode::CREATED.into_response()
        }
        "HEAD" => match cloud.containers.get(&container) {
            Some(objects) => (
                StatusCode::NO_CONTENT,
                [("x-container-object-count", objects.len().to_string())],
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "DELETE" => match cloud.containers.get(&container) {
            Some(objects) if !objects.is_empty() => StatusCode::CONFLICT.into_response(),
            Some(_) => {
                cloud.containers.remove(&container);
                StatusCode::NO_CONTENT.into_response()
            }
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "GET" => match cloud.containers.get(&container) {
            Some(objects) => {
                let listing: Vec<Value> = objects
                    .iter()
                    .map(|(name, (data, _))| {
                        json!({
                            "name": name,
                            "bytes": data.len(),
                            "hash": "",
                            "content_type": "application/octet-stream"
                        })
                    })
                    .collect();
                Json(listing).into_response()
            }
            None => StatusCode::NOT_FOUND.into_response(),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn object_op(
    State(state): State<Shared>,
    method: HttpMethod,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut cloud = state.lock();
    if !authorized(&cloud, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(objects) = cloud.containers.get_mut(&container) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match method.as_str() {
        "PUT" => {
            let metadata = headers
                .iter()
                .filter_map(|(name, value)| {
                    let key = name.as_str().strip_prefix("x-object-meta-")?;
                    Some((key.to_string(), value.to_str().ok()?.to_string()))
                })
                .collect();
            objects.insert(object, (body, metadata));
            (StatusCode::CREATED, [("etag", "\"fake-etag\"")]).into_response()
        }
        "GET" | "HEAD" => match objects.get(&object) {
            Some((data, metadata)) => {
                let mut response_headers = HeaderMap::new();
                for (key, value) in metadata {
                    let name = format!("x-object-meta-{key}");
                    response_headers.insert(
                        axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        value.parse().unwrap(),
                    );
                }
                response_headers.insert("etag", "fake-etag".parse().unwrap());
                let body = if method == HttpMethod::HEAD { Bytes::new() } else { data.clone() };
                (StatusCode::OK, response_headers, body).into_response()
            }
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "DELETE" => match objects.remove(&object) {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "COPY" => {
            let Some(entry) = objects.get(&object).cloned() else {
                return StatusCode::NOT_FOUND.into_response();
            };
            let destination = headers
                .get("destination")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string();
            let Some((dest_container, dest_object)) = destination.split_once('/') else {
                return StatusCode::PRECONDITION_FAILED.into_response();
            };
            match cloud.containers.get_mut(dest_container) {
                Some(dest) => {
                    dest.insert(dest_object.to_string(), entry);
                    StatusCode::CREATED.into_response()
                }
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn config(base_url: &str) -> Config {
    Config::new(format!("{base_url}/v2.0"))
        .with_user("alice", "secret")
        .with_tenant_id("t1")
}

#[tokio::test]
async fn test_identity_lifecycle() {
    let (base_url, state) = spawn_server().await;
    let mut ctx = Context::new(config(&base_url).with_tenant_id("")).unwrap();

    // 1. Authenticate unscoped
    let identity = ctx.identity().await.unwrap();
    assert!(!identity.is_expired());
    assert!(identity.tenant_id().is_none());
    assert_eq!(identity.user().unwrap()["name"], "alice");

    // 2. Tenants visible to the token
    let tenants = identity.tenants(None).await.unwrap();
    assert_eq!(tenants.len(), 2);

    // 3. Rescope to a tenant, then back to unscoped
    let first_token = identity.token().unwrap().to_string();
    let scoped = identity.rescope_using_tenant_id(&tenants[0].id).await.unwrap();
    assert_ne!(scoped, first_token);
    assert_eq!(identity.tenant_id(), Some("t1"));
    assert_eq!(identity.tenant_name(), Some("project-t1"));

    identity.rescope_using_tenant_id("").await.unwrap();
    assert!(identity.tenant_id().is_none());
    assert!(identity.token_details().unwrap().tenant.is_none());

    identity.rescope_using_tenant_name("ops").await.unwrap();
    assert_eq!(identity.tenant_id(), Some("id-ops"));

    // 4. Catalog lookups need no network
    let before = state.lock().token_requests;
    assert_eq!(identity.service_catalog(Some("object-store")).len(), 1);
    assert!(identity.service_catalog(Some("dns")).is_empty());
    assert_eq!(state.lock().token_requests, before);
    assert_eq!(before, 4);
}

#[tokio::test]
async fn test_wrong_password() {
    let (base_url, _) = spawn_server().await;
    let config = Config::new(format!("{base_url}/v2.0")).with_user("alice", "nope");
    let mut ctx = Context::new(config).unwrap();

    let err = ctx.identity().await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailure { .. }));
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
}

#[tokio::test]
async fn test_object_storage_lifecycle() {
    let (base_url, _) = spawn_server().await;
    let mut ctx = Context::new(config(&base_url)).unwrap();
    let storage = ctx.object_storage().await.unwrap();
    assert!(storage.url().to_string().ends_with("/v1/AUTH_t1"));

    // 1. Empty account
    assert!(storage.containers().await.unwrap().is_empty());
    assert!(!storage.has_container("docs").await.unwrap());

    // 2. Create containers and upload
    storage.create_container("docs").await.unwrap();
    storage.create_container("archive").await.unwrap();
    assert!(storage.has_container("docs").await.unwrap());

    let metadata = ObjectMetadata::new().with_metadata("Author", "alice");
    let etag = storage
        .save_object("docs", "reports/q1 summary.txt", "hello world", Some(&metadata))
        .await
        .unwrap();
    assert_eq!(etag, "fake-etag");

    // 3. Read back
    assert!(storage.has_object("docs", "reports/q1 summary.txt").await.unwrap());
    assert!(!storage.has_object("docs", "missing.txt").await.unwrap());
    let object = storage.object("docs", "reports/q1 summary.txt").await.unwrap();
    assert_eq!(object.data.as_ref(), b"hello world");
    assert_eq!(object.head.metadata.get("author").map(String::as_str), Some("alice"));

    // 4. Copy, list, and clean up
    storage
        .copy_object("docs", "reports/q1 summary.txt", "archive", "q1.txt")
        .await
        .unwrap();
    let listing = storage
        .objects("archive", &ListObjectsOptions::new())
        .await
        .unwrap();
    assert_eq!(listing.objects.len(), 1);
    assert_eq!(listing.objects[0].name, "q1.txt");
    assert_eq!(listing.objects[0].bytes, 11);

    let err = storage.delete_container("docs").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Conflict));

    storage.delete_object("docs", "reports/q1 summary.txt").await.unwrap();
    storage.delete_container("docs").await.unwrap();
    assert!(!storage.has_container("docs").await.unwrap());

    let containers = storage.containers().await.unwrap();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].name, "archive");
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let (base_url, state) = spawn_server().await;

    let mut first = Context::new(config(&base_url)).unwrap();
    first.identity().await.unwrap();
    let saved = serde_json::to_string(&first.identity_snapshot().unwrap()).unwrap();
    assert_eq!(state.lock().token_requests, 1);

    // A second process restores the session instead of logging in again
    let mut second = Context::new(Config::new(format!("{base_url}/v2.0"))).unwrap();
    let snapshot: IdentitySnapshot = serde_json::from_str(&saved).unwrap();
    second.restore_identity(snapshot);

    let identity = second.identity().await.unwrap();
    assert_eq!(identity.tenant_id(), Some("t1"));
    assert!(!identity.is_expired());

    let storage = second.object_storage().await.unwrap();
    storage.create_container("restored").await.unwrap();
    assert_eq!(state.lock().token_requests, 1);
}

#[tokio::test]
async fn test_raw_and_raising_responses() {
    let (base_url, _) = spawn_server().await;
    let ctx = Context::new(Config::new(format!("{base_url}/v2.0"))).unwrap();
    let client = ctx.client();
    let url: stratus_client::Url = format!("{base_url}/v2.0/tenants").parse().unwrap();

    // Raw by default: the caller branches on status
    let response = client.get(url.clone(), &RequestOptions::new()).await.unwrap();
    assert_eq!(response.status_code(), 401);

    client.set_raise_errors(true);
    let err = client.get(url, &RequestOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
    assert_eq!(err.request_error().unwrap().response().status_code(), 401);
}
