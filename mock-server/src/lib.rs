use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub version: u64,
}

impl Item {
    pub fn etag(&self) -> String {
        format!("\"{}-{}\"", self.id, self.version)
    }
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub title: String,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct Delay {
    #[serde(default)]
    pub ms: u64,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).patch(update_item).delete(delete_item))
        .route("/status/{code}", get(echo_status))
        .route("/slow", get(slow))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let items = db.read().await;
    Json(items.values().cloned().collect())
}

async fn create_item(State(db): State<Db>, Json(input): Json<CreateItem>) -> Response {
    let item = Item {
        id: Uuid::new_v4(),
        title: input.title,
        version: 1,
    };
    db.write().await.insert(item.id, item.clone());
    tracing::info!(id = %item.id, "item created");
    (StatusCode::CREATED, [(header::ETAG, item.etag())], Json(item)).into_response()
}

/// Answers 304 with no body when `If-None-Match` carries the current ETag.
async fn get_item(State(db): State<Db>, Path(id): Path<Uuid>, headers: HeaderMap) -> Response {
    let items = db.read().await;
    let Some(item) = items.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let etag = item.etag();
    let fresh = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if fresh {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }
    ([(header::ETAG, etag)], Json(item.clone())).into_response()
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItem>,
) -> Result<Response, StatusCode> {
    let mut items = db.write().await;
    let item = items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        item.title = title;
    }
    item.version += 1;
    Ok(([(header::ETAG, item.etag())], Json(item.clone())).into_response())
}

async fn delete_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, StatusCode> {
    let mut items = db.write().await;
    items.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

async fn echo_status(Path(code): Path<u16>) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")).into_response())
}

async fn slow(Query(delay): Query<Delay>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(delay.ms)).await;
    "finally"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: Uuid::nil(),
            title: "Test".to_string(),
            version: 3,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Test");
        assert_eq!(json["version"], 3);
    }

    #[test]
    fn etag_tracks_version() {
        let mut item = Item {
            id: Uuid::nil(),
            title: "Test".to_string(),
            version: 1,
        };
        let before = item.etag();
        item.version += 1;
        assert_ne!(before, item.etag());
        assert!(before.starts_with('"') && before.ends_with('"'));
    }

    #[test]
    fn create_item_rejects_missing_title() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_item_all_fields_optional() {
        let input: UpdateItem = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
    }

    #[test]
    fn delay_defaults_to_zero() {
        let delay: Delay = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(delay.ms, 0);
    }
}
