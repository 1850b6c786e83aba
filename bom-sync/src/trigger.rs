//! HTTP trigger served as an Azure Functions custom handler.
//!
//! The Functions host forwards the request unchanged (`enableForwardingHttpRequest`)
//! to `/api/HttpTrigger1` on `FUNCTIONS_CUSTOMHANDLER_PORT`. Method, query and
//! body are ignored: every request performs one full run.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use bom_sync_core::contract::{SheetSource, Uploader};
use bom_sync_core::synchronise::{synchronise, SynchroniseReport};
use bom_sync_core::SyncError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::load_config::FunctionConfig;

pub const FUNCTION_ROUTE: &str = "/api/HttpTrigger1";
pub const SUCCESS_MESSAGE: &str = "Data processed and uploaded successfully.";

/// Dependencies shared by every request.
#[derive(Clone)]
pub struct TriggerState {
    pub config: Arc<FunctionConfig>,
    pub sheets: Arc<dyn SheetSource>,
    pub uploader: Arc<dyn Uploader>,
}

pub fn router(state: TriggerState) -> Router {
    Router::new()
        .route(FUNCTION_ROUTE, any(http_trigger))
        .route("/", any(http_trigger))
        .with_state(state)
}

/// Resolves the run settings and performs one synchronisation.
pub async fn run_once(
    config: &FunctionConfig,
    sheets: &dyn SheetSource,
    uploader: &dyn Uploader,
) -> Result<SynchroniseReport, SyncError> {
    let run = config.resolve()?;
    synchronise(&run, sheets, uploader).await
}

pub async fn http_trigger(State(state): State<TriggerState>) -> Response {
    info!("[TRIGGER] HTTP trigger function processed a request.");
    match run_once(&state.config, state.sheets.as_ref(), state.uploader.as_ref()).await {
        Ok(report) => {
            info!(?report, "[TRIGGER] Run complete");
            (StatusCode::OK, SUCCESS_MESSAGE).into_response()
        }
        Err(e) => {
            error!(kind = e.kind(), error = %e, "[TRIGGER][ERROR] Run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred: {e}"),
            )
                .into_response()
        }
    }
}

pub async fn serve(addr: SocketAddr, state: TriggerState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, route = FUNCTION_ROUTE, "[TRIGGER] Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
