//! Reference registry service.
//!
//! # Responsibilities
//! - Issue claim keys and answer key checks
//! - Record attendee wallets, one row per `(wallet, event)`
//! - Serve the organizer's submission list
//! - Mint through a backend-held key and record the outcome per row
//!
//! Organizer endpoints sit behind [`admin_auth`].

use alloy::primitives::Address;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::contract::ContractGateway;
use crate::blockchain::minter::BadgeMinter;
use crate::blockchain::types::tx_hash_string;
use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::registry::auth::admin_auth;
use crate::registry::store::{now_secs, RegistryStore, StoreError};
use crate::registry::types::{
    ErrorBody, GenerateClaimLinkRequest, GenerateClaimLinkResponse, HealthResponse,
    MintPoapRequest, MintPoapResponse, SubmitAddressRequest, SubmitAddressResponse,
    SubmittedAddressesQuery, SubmittedAddressesResponse, ValidateKeyRequest, ValidateKeyResponse,
};

/// Application state injected into handlers.
pub struct AppState<G> {
    pub store: RegistryStore,
    pub config: Arc<RegistryConfig>,
    /// `None` when no chain signer is configured; mint requests get 503.
    pub minter: Option<Arc<BadgeMinter<G>>>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            minter: self.minter.clone(),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn store_error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::InvalidKey => StatusCode::BAD_REQUEST,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Duplicate | StoreError::AlreadyMinted | StoreError::MintInProgress => {
            StatusCode::CONFLICT
        }
    };
    error_response(status, err.to_string())
}

fn parse_wallet(raw: &str) -> Option<Address> {
    raw.trim().parse::<Address>().ok()
}

pub struct RegistryServer<G> {
    router: Router,
    store: RegistryStore,
    _gateway: std::marker::PhantomData<G>,
}

impl<G: ContractGateway + 'static> RegistryServer<G> {
    pub fn new(
        config: RegistryConfig,
        api_key: &str,
        store: RegistryStore,
        minter: Option<BadgeMinter<G>>,
    ) -> Self {
        let state = AppState {
            store: store.clone(),
            config: Arc::new(config),
            minter: minter.map(Arc::new),
        };
        let router = Self::build_router(state, Arc::from(api_key));

        Self {
            router,
            store,
            _gateway: std::marker::PhantomData,
        }
    }

    /// Build the router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState<G>, api_key: Arc<str>) -> Router {
        let max_body = state.config.max_body_bytes;
        let timeout = Duration::from_secs(state.config.request_timeout_secs);

        let admin = Router::new()
            .route("/api/generate-claim-link", post(generate_claim_link::<G>))
            .route("/api/submitted-addresses", get(submitted_addresses::<G>))
            .route("/api/mint-poap", post(mint_poap::<G>))
            .route_layer(middleware::from_fn_with_state(api_key, admin_auth));

        Router::new()
            .route("/api/validate-key", post(validate_key::<G>))
            .route("/api/submit-address", post(submit_address::<G>))
            .route("/api/health", get(health))
            .merge(admin)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(max_body))
            .layer(TimeoutLayer::new(timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then flush the store to disk.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Registry server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        self.store.save().await?;
        tracing::info!("Registry server stopped");
        Ok(())
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn generate_claim_link<G: ContractGateway + 'static>(
    State(state): State<AppState<G>>,
    Json(req): Json<GenerateClaimLinkRequest>,
) -> Response {
    let event_id = req.event_id.trim();
    if event_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "event_id is required");
    }
    if req.expiry_minutes == 0 || req.expiry_minutes > state.config.max_expiry_minutes {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "expiry_minutes must be between 1 and {}",
                state.config.max_expiry_minutes
            ),
        );
    }

    let claim = state.store.create_key(event_id, req.expiry_minutes, now_secs());
    metrics::record_claim_link();
    tracing::info!(event_id = %event_id, expires_at = claim.expires_at, "Claim link issued");

    let claim_url = format!(
        "{}/claim?key={}",
        state.config.claim_base_url.trim_end_matches('/'),
        claim.key
    );
    Json(GenerateClaimLinkResponse { claim_url }).into_response()
}

async fn validate_key<G: ContractGateway + 'static>(
    State(state): State<AppState<G>>,
    Json(req): Json<ValidateKeyRequest>,
) -> Json<ValidateKeyResponse> {
    let claim = state.store.lookup_key(req.key.trim(), now_secs());
    metrics::record_key_validation(claim.is_some());

    Json(match claim {
        Some(claim) => ValidateKeyResponse {
            success: true,
            event_id: Some(claim.event_id),
            expires_at: Some(claim.expires_at),
        },
        None => ValidateKeyResponse {
            success: false,
            event_id: None,
            expires_at: None,
        },
    })
}

async fn submit_address<G: ContractGateway + 'static>(
    State(state): State<AppState<G>>,
    Json(req): Json<SubmitAddressRequest>,
) -> Response {
    let Some(wallet) = parse_wallet(&req.wallet) else {
        metrics::record_submission("invalid_address");
        return error_response(StatusCode::BAD_REQUEST, "Invalid wallet address");
    };

    match state.store.submit(req.key.trim(), wallet, now_secs()) {
        Ok(row) => {
            metrics::record_submission("accepted");
            tracing::info!(event_id = %row.event_id, wallet = %row.wallet_address, "Wallet submitted");
            Json(SubmitAddressResponse {
                success: true,
                id: Some(row.id),
            })
            .into_response()
        }
        Err(e) => {
            metrics::record_submission(match e {
                StoreError::Duplicate => "duplicate",
                _ => "invalid_key",
            });
            store_error_response(e)
        }
    }
}

async fn submitted_addresses<G: ContractGateway + 'static>(
    State(state): State<AppState<G>>,
    Query(query): Query<SubmittedAddressesQuery>,
) -> Json<SubmittedAddressesResponse> {
    let addresses = state
        .store
        .list(query.event_key.trim())
        .iter()
        .map(|row| row.to_record())
        .collect();
    Json(SubmittedAddressesResponse { addresses })
}

async fn mint_poap<G: ContractGateway + 'static>(
    State(state): State<AppState<G>>,
    Json(req): Json<MintPoapRequest>,
) -> Response {
    let Some(minter) = state.minter.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Minting is not configured");
    };
    let Some(wallet) = parse_wallet(&req.wallet) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid wallet address");
    };
    let event_id = req.event_key.trim().to_string();

    if let Err(e) = state.store.begin_mint(&event_id, wallet) {
        return store_error_response(e);
    }

    // The mint runs detached so a dropped request still records its outcome.
    let store = state.store.clone();
    let task = tokio::spawn(async move {
        let outcome = minter
            .mint(wallet, &event_id)
            .await
            .map(tx_hash_string)
            .map_err(|e| e.to_string());
        store.finish_mint(&event_id, wallet, outcome.clone());
        outcome
    });

    match task.await {
        Ok(Ok(tx_hash)) => {
            metrics::record_mint("minted");
            Json(MintPoapResponse { tx_hash }).into_response()
        }
        Ok(Err(reason)) => {
            metrics::record_mint("failed");
            tracing::warn!(wallet = %wallet, reason = %reason, "Mint failed");
            error_response(StatusCode::BAD_GATEWAY, reason)
        }
        Err(e) => {
            metrics::record_mint("failed");
            tracing::error!(error = %e, "Mint task aborted");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Mint task aborted")
        }
    }
}
