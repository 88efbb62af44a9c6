use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Query;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde_json::Value;
use tower::ServiceBuilder;

use crate::auth::{self, IdentityProvider};
use crate::err::{handler404, Payload};
use crate::import;
use crate::repo::{Repository, Resource};
use crate::resources::{Courses, Students, Tests};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn repo<R: Resource>(&self) -> Repository<R> {
        Repository::new(self.store.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route(
            "/test",
            post(create::<Tests>)
                .delete(delete::<Tests>)
                .patch(update::<Tests>)
                .get(find::<Tests>),
        )
        .route("/test/start", patch(update_start_time))
        .route(
            "/students",
            post(create::<Students>)
                .delete(delete::<Students>)
                .patch(update::<Students>)
                .get(find::<Students>),
        )
        .route("/students/extraTime", patch(update_extra_time))
        .route(
            "/course",
            post(create::<Courses>)
                .delete(delete::<Courses>)
                .patch(update::<Courses>)
                .get(find::<Courses>),
        )
        .route("/entra-id/flow", get(auth::login_flow).post(auth::login_callback))
        .route("/entra-id/session", get(auth::session_info))
        .fallback(handler404.into_service())
        .layer(ServiceBuilder::new().layer(Extension(state)))
}

async fn create<R: Resource>(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<StatusCode> {
    state.repo::<R>().create(body).await?;
    Ok(StatusCode::CREATED)
}

async fn delete<R: Resource>(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<StatusCode> {
    state.repo::<R>().delete(body).await?;
    Ok(StatusCode::OK)
}

async fn update<R: Resource>(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<StatusCode> {
    state.repo::<R>().update(body).await?;
    Ok(StatusCode::OK)
}

async fn find<R: Resource>(
    Extension(state): Extension<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Payload<Json<Vec<Value>>> {
    let records = state.repo::<R>().find(&query).await?;
    Ok(Json(records.collect()))
}

async fn update_start_time(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<StatusCode> {
    state.repo::<Tests>().update_start_time(body).await?;
    Ok(StatusCode::OK)
}

async fn update_extra_time(
    Extension(state): Extension<AppState>,
    Json(body): Json<Value>,
) -> Payload<StatusCode> {
    state.repo::<Students>().update_extra_time(body).await?;
    Ok(StatusCode::OK)
}

async fn upload(Extension(state): Extension<AppState>, Json(body): Json<Value>) -> Payload<StatusCode> {
    import::import(state.store.as_ref(), body).await?;
    Ok(StatusCode::CREATED)
}
