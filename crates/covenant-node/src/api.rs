//! HTTP gateway for the Covenant node.
//!
//! Each mutating endpoint runs exactly one ledger invocation; read
//! endpoints run read-only queries. Engine errors map onto HTTP status
//! codes in [`error_response`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use covenant_core::{Amount, ApplicantSignals, Coin, Contract, ContractKind, Provenance, Rate};
use covenant_engine::{EngineError, NewContract, TransferReceipt};
use covenant_ledger::{Invocation, Receipt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::NodeState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Request / response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result of a committed invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommittedResponse<T> {
    pub tx_id: String,
    pub timestamp: i64,
    pub result: T,
}

impl<T> From<Receipt<T>> for CommittedResponse<T> {
    fn from(receipt: Receipt<T>) -> Self {
        Self {
            tx_id: receipt.tx_id.to_string(),
            timestamp: receipt.timestamp,
            result: receipt.output,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Approved at origination, or claimed at check time.
    pub accepted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    #[serde(default = "default_reason")]
    pub reason: Provenance,
}

fn default_reason() -> Provenance {
    Provenance::Transfer
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContractRequest {
    pub applicant: String,
    pub business_id: String,
    pub kind: String,
    pub amount: Amount,
    pub issuer: String,
    #[serde(default)]
    pub rate: Rate,
    #[serde(default)]
    pub period_days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRequest {
    pub credit: f64,
    pub income: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanCheckRequest {
    pub credit: f64,
    pub income: Amount,
    /// Caller's clock in seconds; defaults to the invocation timestamp.
    #[serde(default)]
    pub current_time: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsuranceCheckRequest {
    pub credit: f64,
    pub income: Amount,
    pub is_sudden: bool,
    #[serde(default)]
    pub contingency_info: String,
}

// --- Error mapping ---

pub fn status_for(e: &EngineError) -> StatusCode {
    match e {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::AlreadyExists(_) | EngineError::InvalidState { .. } => StatusCode::CONFLICT,
        EngineError::NotClaimable(_)
        | EngineError::NoFunds(_)
        | EngineError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UnknownKind(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        EngineError::Serialization(_) | EngineError::Core(_) | EngineError::Ledger(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn error_response(e: EngineError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(error = %e, "invocation failed");
    } else {
        tracing::debug!(error = %e, %status, "invocation refused");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    tracing::error!(error = %e, "ledger task join error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("ledger task join error: {}", e),
        }),
    )
}

/// Run one ledger invocation on the blocking pool. The ledger lock and
/// store I/O are synchronous.
async fn invoke<T, F>(state: &Arc<NodeState>, f: F) -> ApiResult<CommittedResponse<T>>
where
    T: Send + 'static,
    F: FnOnce(&NodeState, &mut Invocation<'_>) -> Result<T, EngineError> + Send + 'static,
{
    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || state.ledger.invoke(|inv| f(&state, inv)))
        .await
        .map_err(join_error)?;
    result.map(|r| Json(r.into())).map_err(error_response)
}

/// Run a read-only query on the blocking pool.
async fn evaluate<T, F>(state: &Arc<NodeState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&NodeState, &Invocation<'_>) -> Result<T, EngineError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.ledger.evaluate(|inv| f(&state, inv)))
        .await
        .map_err(join_error)?
        .map_err(error_response)
}

fn parse_kind(kind: &str) -> Result<ContractKind, ApiError> {
    kind.parse::<ContractKind>()
        .map_err(|e| error_response(e.into()))
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_balance(
    State(state): State<Arc<NodeState>>,
    Path(owner): Path<String>,
) -> ApiResult<BalanceResponse> {
    let query_owner = owner.clone();
    let balance = evaluate(&state, move |s, inv| {
        s.engine.coins().total_balance(inv, &query_owner)
    })
    .await?;
    Ok(Json(BalanceResponse { owner, balance }))
}

async fn handle_list_coins(
    State(state): State<Arc<NodeState>>,
    Path(owner): Path<String>,
) -> ApiResult<Vec<Coin>> {
    evaluate(&state, move |s, inv| {
        s.engine.coins().list_coins_by_owner(inv, &owner)
    })
    .await
    .map(Json)
}

async fn handle_read_coin(
    State(state): State<Arc<NodeState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<Coin> {
    evaluate(&state, move |s, inv| s.engine.coins().read_coin(inv, &owner, &id))
        .await
        .map(Json)
}

async fn handle_deposit(
    State(state): State<Arc<NodeState>>,
    Path(owner): Path<String>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<CommittedResponse<Coin>> {
    invoke(&state, move |s, inv| {
        s.engine.coins().deposit(inv, &owner, req.amount)
    })
    .await
}

async fn handle_transfer(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<CommittedResponse<TransferReceipt>> {
    invoke(&state, move |s, inv| {
        s.engine
            .coins()
            .transfer(inv, &req.from, &req.to, req.amount, req.reason)
    })
    .await
}

async fn handle_create_contract(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<CreateContractRequest>,
) -> ApiResult<CommittedResponse<Contract>> {
    let new = NewContract {
        kind: parse_kind(&req.kind)?,
        applicant: req.applicant,
        business_id: req.business_id,
        amount: req.amount,
        issuer: req.issuer,
        rate: req.rate,
        period_days: req.period_days,
    };
    invoke(&state, move |s, inv| s.engine.create_contract(inv, new)).await
}

async fn handle_list_contracts(
    State(state): State<Arc<NodeState>>,
    Path(applicant): Path<String>,
) -> ApiResult<Vec<Contract>> {
    evaluate(&state, move |s, inv| {
        s.engine.list_all_contracts_by_owner(inv, &applicant)
    })
    .await
    .map(Json)
}

async fn handle_read_contract(
    State(state): State<Arc<NodeState>>,
    Path((applicant, kind, business_id)): Path<(String, String, String)>,
) -> ApiResult<Contract> {
    let kind = parse_kind(&kind)?;
    evaluate(&state, move |s, inv| {
        s.engine.read_contract(inv, kind, &applicant, &business_id)
    })
    .await
    .map(Json)
}

async fn handle_start_loan(
    State(state): State<Arc<NodeState>>,
    Path((applicant, business_id)): Path<(String, String)>,
    Json(req): Json<StartRequest>,
) -> ApiResult<CommittedResponse<DecisionResponse>> {
    let signals = ApplicantSignals::new(req.credit, req.income);
    invoke(&state, move |s, inv| {
        let accepted = s.engine.start_loan(inv, &applicant, &business_id, &signals)?;
        Ok(DecisionResponse { accepted })
    })
    .await
}

async fn handle_check_loan(
    State(state): State<Arc<NodeState>>,
    Path((applicant, business_id)): Path<(String, String)>,
    Json(req): Json<LoanCheckRequest>,
) -> ApiResult<CommittedResponse<DecisionResponse>> {
    let signals = ApplicantSignals::new(req.credit, req.income);
    invoke(&state, move |s, inv| {
        let now = req.current_time.unwrap_or_else(|| inv.timestamp());
        let accepted = s
            .engine
            .loan_contract_check(inv, &applicant, &business_id, &signals, now)?;
        Ok(DecisionResponse { accepted })
    })
    .await
}

async fn handle_start_insurance(
    State(state): State<Arc<NodeState>>,
    Path((applicant, business_id)): Path<(String, String)>,
    Json(req): Json<StartRequest>,
) -> ApiResult<CommittedResponse<DecisionResponse>> {
    let signals = ApplicantSignals::new(req.credit, req.income);
    invoke(&state, move |s, inv| {
        let accepted = s
            .engine
            .start_insurance(inv, &applicant, &business_id, &signals)?;
        Ok(DecisionResponse { accepted })
    })
    .await
}

async fn handle_check_insurance(
    State(state): State<Arc<NodeState>>,
    Path((applicant, business_id)): Path<(String, String)>,
    Json(req): Json<InsuranceCheckRequest>,
) -> ApiResult<CommittedResponse<DecisionResponse>> {
    let signals = ApplicantSignals::new(req.credit, req.income);
    invoke(&state, move |s, inv| {
        let accepted = s.engine.insurance_contract_check(
            inv,
            &applicant,
            &business_id,
            &signals,
            req.is_sudden,
            &req.contingency_info,
        )?;
        Ok(DecisionResponse { accepted })
    })
    .await
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/accounts/{owner}/balance", get(handle_balance))
        .route("/api/v1/accounts/{owner}/coins", get(handle_list_coins))
        .route("/api/v1/accounts/{owner}/coins/{id}", get(handle_read_coin))
        .route("/api/v1/accounts/{owner}/deposit", post(handle_deposit))
        .route("/api/v1/transfers", post(handle_transfer))
        .route("/api/v1/contracts", post(handle_create_contract))
        .route("/api/v1/contracts/{applicant}", get(handle_list_contracts))
        .route(
            "/api/v1/contracts/{applicant}/{kind}/{business_id}",
            get(handle_read_contract),
        )
        .route(
            "/api/v1/loans/{applicant}/{business_id}/start",
            post(handle_start_loan),
        )
        .route(
            "/api/v1/loans/{applicant}/{business_id}/check",
            post(handle_check_loan),
        )
        .route(
            "/api/v1/insurances/{applicant}/{business_id}/start",
            post(handle_start_insurance),
        )
        .route(
            "/api/v1/insurances/{applicant}/{business_id}/check",
            post(handle_check_insurance),
        )
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<NodeState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP gateway started");
    axum::serve(listener, app).await?;
    Ok(())
}
