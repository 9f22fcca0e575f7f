//! Axum REST API handlers.
//!
//! Governance routes call straight into the shared [`Engine`]; event routes
//! read the indexed copy from SQLite.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dao_engine::{
    Address, Amount, ContributionReceipt, DaoError, Engine, PaymentReceipt, ProposalId,
    ProposalStatus, ProposalView, Tier, Vote, VoteReceipt,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::IndexerError;
use crate::events::StoredEvent;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub engine: Arc<Engine>,
}

// ─────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Dao(DaoError),
    BadRequest(String),
    Internal(IndexerError),
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        ApiError::Dao(err)
    }
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        ApiError::Internal(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Dao(e) => match e {
                DaoError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                DaoError::NotFound(_) => StatusCode::NOT_FOUND,
                DaoError::InvalidState { .. }
                | DaoError::DuplicateVote { .. }
                | DaoError::VoteNotPassed { .. } => StatusCode::CONFLICT,
                DaoError::InvalidAmount { .. }
                | DaoError::InvalidProposal(_)
                | DaoError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DaoError::TransferFailed { .. } => StatusCode::BAD_GATEWAY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, code) = match &self {
            ApiError::Dao(e) => (e.to_string(), Some(e.code())),
            ApiError::BadRequest(msg) => (msg.clone(), None),
            ApiError::Internal(e) => (e.to_string(), None),
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(field: &str, raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

fn parse_amount(raw: &str) -> Result<Amount, DaoError> {
    raw.trim().parse().map_err(|_| DaoError::InvalidAmount {
        amount: 0,
        reason: "must be a non-negative integer in base units",
    })
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────
//
// Amounts travel as decimal strings in both directions; they routinely
// exceed 2^53.

#[derive(Deserialize)]
pub struct ContributeRequest {
    pub member: String,
    pub amount: String,
}

#[derive(Deserialize)]
pub struct CreateProposalRequest {
    pub creator: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub beneficiary: String,
    pub amount: String,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub voter: String,
    pub choice: bool,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Serialize)]
pub struct ContributionResponse {
    pub member: Address,
    pub amount: String,
    pub new_balance: String,
    pub new_total_balance: String,
}

impl From<ContributionReceipt> for ContributionResponse {
    fn from(r: ContributionReceipt) -> Self {
        Self {
            member: r.member,
            amount: r.amount.to_string(),
            new_balance: r.new_balance.to_string(),
            new_total_balance: r.new_total_balance.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub address: Address,
    pub tier: Tier,
    pub balance: String,
    pub stakeholders_balance: String,
    pub contributors_balance: String,
    pub is_stakeholder: bool,
    pub is_contributor: bool,
}

#[derive(Debug, Serialize)]
pub struct TreasuryResponse {
    pub total_balance: String,
    pub total_contributed: String,
    pub total_paid_out: String,
    pub member_count: usize,
    pub proposal_count: usize,
    pub event_count: usize,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: ProposalId,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub beneficiary: Address,
    pub amount: String,
    pub creator: Address,
    pub status: ProposalStatus,
    pub upvotes: String,
    pub downvotes: String,
    pub vote_count: usize,
}

impl From<ProposalView> for ProposalResponse {
    fn from(p: ProposalView) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            beneficiary: p.beneficiary,
            amount: p.amount.to_string(),
            creator: p.creator,
            status: p.status,
            upvotes: p.upvotes.to_string(),
            downvotes: p.downvotes.to_string(),
            vote_count: p.vote_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub proposal_id: ProposalId,
    pub voter: Address,
    pub choice: bool,
    pub weight: String,
    pub upvotes: String,
    pub downvotes: String,
}

impl From<VoteReceipt> for VoteResponse {
    fn from(r: VoteReceipt) -> Self {
        Self {
            proposal_id: r.proposal_id,
            voter: r.voter,
            choice: r.choice,
            weight: r.weight.to_string(),
            upvotes: r.upvotes.to_string(),
            downvotes: r.downvotes.to_string(),
        }
    }
}

/// One recorded vote, in cast order.
#[derive(Debug, Serialize)]
pub struct VoteEntry {
    pub voter: Address,
    pub choice: bool,
    pub weight: String,
    pub sequence: u64,
}

impl From<Vote> for VoteEntry {
    fn from(v: Vote) -> Self {
        Self {
            voter: v.voter,
            choice: v.choice,
            weight: v.weight.to_string(),
            sequence: v.sequence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub proposal_id: ProposalId,
    pub beneficiary: Address,
    pub amount: String,
    pub remaining_balance: String,
}

impl From<PaymentReceipt> for PaymentResponse {
    fn from(r: PaymentReceipt) -> Self {
        Self {
            proposal_id: r.proposal_id,
            beneficiary: r.beneficiary,
            amount: r.amount.to_string(),
            remaining_balance: r.remaining_balance.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FinalizedResponse {
    pub id: ProposalId,
    pub status: ProposalStatus,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub proposal_id: ProposalId,
    pub count: usize,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug, Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /contributions`
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ContributeRequest>,
) -> ApiResult<ContributionResponse> {
    let member = parse_address("member", &req.member)?;
    let amount = parse_amount(&req.amount)?;
    Ok(Json(state.engine.contribute(&member, amount)?.into()))
}

/// `GET /members/:address`
pub async fn get_member(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<MemberResponse> {
    let member = parse_address("address", &address)?;
    let engine = &state.engine;
    Ok(Json(MemberResponse {
        tier: engine.member_tier(&member),
        balance: engine.balance_of(&member).to_string(),
        stakeholders_balance: engine.stakeholders_balance(&member).to_string(),
        contributors_balance: engine.contributors_balance(&member).to_string(),
        is_stakeholder: engine.stakeholder_status(&member),
        is_contributor: engine.is_contributor(&member),
        address: member,
    }))
}

/// `GET /treasury`
pub async fn get_treasury(State(state): State<Arc<ApiState>>) -> ApiResult<TreasuryResponse> {
    let snap = state.engine.snapshot();
    Ok(Json(TreasuryResponse {
        total_balance: snap.total_balance.to_string(),
        total_contributed: snap.total_contributed.to_string(),
        total_paid_out: snap.total_paid_out.to_string(),
        member_count: snap.member_count,
        proposal_count: snap.proposals.len(),
        event_count: snap.event_count,
    }))
}

/// `POST /proposals`
///
/// The creator's tier is checked before the proposal body is parsed, so a
/// non-stakeholder is refused whatever the rest of the request holds.
pub async fn create_proposal(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let creator = parse_address("creator", &req.creator)?;
    let tier = state.engine.member_tier(&creator);
    if tier < Tier::Stakeholder {
        return Err(DaoError::Unauthorized {
            member: creator,
            required: Tier::Stakeholder,
            actual: tier,
        }
        .into());
    }

    // A malformed beneficiary is a malformed proposal, not a malformed request.
    let beneficiary = Address::parse(&req.beneficiary).map_err(DaoError::from)?;
    let amount = parse_amount(&req.amount)?;

    let id = state
        .engine
        .create_proposal(&creator, req.title, req.description, beneficiary, amount)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /proposals`
pub async fn list_proposals(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<Vec<ProposalResponse>> {
    Ok(Json(
        state.engine.proposals().into_iter().map(Into::into).collect(),
    ))
}

/// `GET /proposals/:id`
pub async fn get_proposal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
) -> ApiResult<ProposalResponse> {
    Ok(Json(state.engine.get_proposal(id)?.into()))
}

/// `POST /proposals/:id/votes`
pub async fn perform_vote(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<VoteResponse> {
    let voter = parse_address("voter", &req.voter)?;
    Ok(Json(state.engine.perform_vote(&voter, id, req.choice)?.into()))
}

/// `GET /proposals/:id/votes`
pub async fn get_proposal_votes(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
) -> ApiResult<Vec<VoteEntry>> {
    Ok(Json(
        state
            .engine
            .proposal_votes(id)?
            .into_iter()
            .map(Into::into)
            .collect(),
    ))
}

/// `POST /proposals/:id/finalize`
pub async fn finalize_proposal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<FinalizedResponse> {
    let caller = parse_address("caller", &req.caller)?;
    let status = state.engine.finalize_proposal(&caller, id)?;
    Ok(Json(FinalizedResponse { id, status }))
}

/// `POST /proposals/:id/payout`
pub async fn pay_beneficiary(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<PaymentResponse> {
    let caller = parse_address("caller", &req.caller)?;
    Ok(Json(state.engine.pay_beneficiary(&caller, id)?.into()))
}

/// `GET /proposals/:id/events`
///
/// Returns all indexed events for the given proposal.
pub async fn get_proposal_events(
    State(state): State<Arc<ApiState>>,
    Path(proposal_id): Path<ProposalId>,
) -> ApiResult<EventsResponse> {
    let events = db::get_events_for_proposal(&state.pool, proposal_id as i64).await?;
    Ok(Json(EventsResponse {
        proposal_id,
        count: events.len(),
        events,
    }))
}

/// `GET /events`
///
/// Returns all indexed events.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> ApiResult<AllEventsResponse> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}
