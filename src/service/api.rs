use crate::{
    application::app::Application,
    config::Config,
    domain::errors::ReconcileError,
    infrastructure::admission::AdmissionController,
};
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::presenter::{
    present_accounts, present_transactions, AccountView, ListResponse, TransactionView,
};

type ApiError = (StatusCode, String);

pub fn router<A>(app: Arc<A>, admission: AdmissionController) -> Router
where
    A: Application + Send + Sync + 'static,
{
    Router::new()
        .route("/accounts", get(get_accounts::<A>))
        .route(
            "/accounts/:account_uuid/transactions",
            get(get_account_transactions::<A>),
        )
        .route_layer(middleware::from_fn_with_state(admission, admit))
        .with_state(app)
        .layer(CorsLayer::permissive())
}

pub async fn start_server<A>(
    shutdown: broadcast::Sender<()>,
    app: Arc<A>,
    config: &Config,
) -> anyhow::Result<()>
where
    A: Application + Send + Sync + 'static,
{
    let admission = AdmissionController::new(config.rate_limit, config.burst_limit);
    let router = router(app, admission);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .map_err(|e| {
            tracing::error!("API server could not bind port {}: {}", config.port, e);
            anyhow::anyhow!("binding port {}: {}", config.port, e)
        })?;

    let server = axum::serve(listener, router).into_future();

    tracing::info!("API server started on port {}", config.port);

    let mut shutdown_rx = shutdown.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::warn!("API server received shutdown signal");
        }
        result = server => {
            if let Err(e) = result {
                tracing::error!("API server stopped unexpectedly: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

async fn admit(State(admission): State<AdmissionController>, req: Request, next: Next) -> Response {
    if admission.allow() {
        next.run(req).await
    } else {
        (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
    }
}

fn reconcile_status(error: &ReconcileError) -> StatusCode {
    match error {
        ReconcileError::NotFound(_) => StatusCode::NOT_FOUND,
        ReconcileError::UpstreamUnavailable(_) | ReconcileError::UpstreamProtocol(_) => {
            StatusCode::BAD_GATEWAY
        }
        ReconcileError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn get_accounts<A: Application + Send + Sync + 'static>(
    State(app_state): State<Arc<A>>,
) -> Result<Json<ListResponse<AccountView>>, ApiError> {
    app_state
        .get_accounts()
        .await
        .map(|accounts| Json(present_accounts(&accounts)))
        .map_err(|e| {
            tracing::error!("Failed to retrieve accounts: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve accounts".to_string(),
            )
        })
}

async fn get_account_transactions<A: Application + Send + Sync + 'static>(
    State(app_state): State<Arc<A>>,
    Path(account_uuid): Path<String>,
) -> Result<Json<ListResponse<TransactionView>>, ApiError> {
    app_state
        .get_account_transactions(&account_uuid)
        .await
        .map(|page| Json(present_transactions(&page)))
        .map_err(|e| {
            let status = reconcile_status(&e);
            if status.is_server_error() {
                tracing::error!("Failed to reconcile account {}: {}", account_uuid, e);
            }
            (status, e.to_string())
        })
}
