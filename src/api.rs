use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use dashmap::DashMap;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::account::{Account, AccountError};
use crate::battle::{Battle, BattleError};
use crate::config::{RateLimitConfig, ServerConfig};
use crate::data::CaseRegistry;
use crate::db::Database;
use crate::fair::{DrawError, ReceiptSigner, RevealedSeed};
use crate::house::{House, HouseError};
use crate::protocol::*;

const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
const MAX_LEADERBOARD_LIMIT: u32 = 100;
const DEFAULT_DRAW_HISTORY_LIMIT: u32 = 50;
const MAX_DRAW_HISTORY_LIMIT: u32 = 500;

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    house: Arc<House>,
    db: Arc<Database>,
    open_rate_limiter: RateLimiter,
    deposit_rate_limiter: RateLimiter,
}

impl AppState {
    /// Load cases, connect the database and restore persisted accounts.
    pub async fn new(config: &ServerConfig) -> Result<Self, String> {
        let db = Database::new(&config.database_url)
            .await
            .map_err(|e| format!("Failed to initialize database: {}", e))?;

        // Load case registry from TOML files
        let mut cases = CaseRegistry::new();
        cases.load_from_directory(&config.data_dir, &config.odds)?;
        if cases.is_empty() {
            warn!("No cases loaded from {:?}", config.data_dir);
        }

        let signer = match &config.receipt_key {
            Some(key) => ReceiptSigner::from_hex(key)?,
            None => {
                warn!("No receipt_key configured, receipts will not verify after a restart");
                ReceiptSigner::random()
            }
        };

        let house = House::new(Arc::new(cases), signer);
        let accounts = db
            .load_accounts()
            .await
            .map_err(|e| format!("Failed to load accounts: {}", e))?;
        let seeds = db
            .load_active_seeds()
            .await
            .map_err(|e| format!("Failed to load seeds: {}", e))?;
        house.restore(accounts, seeds);

        Ok(Self::from_parts(house, db, &config.rate_limit))
    }

    pub fn from_parts(house: House, db: Database, limits: &RateLimitConfig) -> Self {
        Self {
            house: Arc::new(house),
            db: Arc::new(db),
            open_rate_limiter: RateLimiter::new(limits.open_requests, limits.window_secs),
            deposit_rate_limiter: RateLimiter::new(limits.deposit_requests, limits.window_secs),
        }
    }

    /// Drop finished battles past `battle_retention` and rate-limit windows
    /// that have expired.
    pub fn prune(&self, battle_retention: Duration) {
        let battles = self.house.prune_battles(battle_retention);
        let limits = self.open_rate_limiter.prune() + self.deposit_rate_limiter.prune();
        if battles > 0 || limits > 0 {
            info!("Pruned {} finished battles and {} rate limit entries", battles, limits);
        }
    }

    // Write-through persistence. The in-memory state is authoritative, so a
    // failed write is logged and the request still succeeds.

    async fn persist_account(&self, account: &Account) {
        if let Err(e) = self.db.save_account(account).await {
            error!("Failed to save account {}: {}", account.id, e);
        }
    }

    async fn persist_seed(&self, account_id: Uuid) {
        if let Some(pair) = self.house.seed_pair(account_id) {
            if let Err(e) = self.db.save_active_seed(account_id, &pair).await {
                error!("Failed to save seed pair for {}: {}", account_id, e);
            }
        }
    }

    async fn persist_revealed(&self, revealed: &RevealedSeed) {
        if let Err(e) = self.db.record_revealed_seed(revealed).await {
            error!("Failed to record revealed seed {}: {}", revealed.server_seed_hash, e);
        }
    }

    async fn persist_battle(&self, battle: &Battle) {
        for seat in &battle.seats {
            if let Ok(account) = self.house.account(seat.account_id) {
                self.persist_account(&account).await;
            }
        }
        if let Some(server_seed) = &battle.revealed_server_seed {
            let revealed = RevealedSeed {
                server_seed: server_seed.clone(),
                server_seed_hash: battle.server_seed_hash.clone(),
                client_seed: battle.id.to_string(),
                draws: battle.rounds as u64 * battle.seats.len() as u64,
            };
            self.persist_revealed(&revealed).await;
        }
    }
}

/// Rate limiter entry: (request_count, window_start_time)
type RateLimitEntry = (u32, std::time::Instant);

/// Simple IP-based rate limiter
#[derive(Clone)]
struct RateLimiter {
    /// IP -> (request_count, window_start)
    entries: Arc<DashMap<String, RateLimitEntry>>,
    /// Max requests per window
    max_requests: u32,
    /// Window duration
    window_duration: Duration,
}

impl RateLimiter {
    fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_requests,
            window_duration: Duration::from_secs(window_secs),
        }
    }

    /// Check if request is allowed. Returns true if allowed, false if rate limited.
    fn check(&self, ip: &str) -> bool {
        let now = std::time::Instant::now();

        let mut entry = self.entries.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset window if expired
        if now.duration_since(*window_start) > self.window_duration {
            *count = 0;
            *window_start = now;
        }

        if *count >= self.max_requests {
            return false;
        }

        *count += 1;
        true
    }

    /// Remove entries whose window has expired. Returns how many were removed.
    fn prune(&self) -> usize {
        let now = std::time::Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, window_start)| now.duration_since(*window_start) <= self.window_duration);
        before.saturating_sub(self.entries.len())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
    }
}

fn house_status(err: &HouseError) -> StatusCode {
    match err {
        HouseError::CaseNotFound(_) => StatusCode::NOT_FOUND,
        HouseError::SeedNotRevealed(_) => StatusCode::CONFLICT,
        HouseError::BadSignature | HouseError::ReceiptMismatch { .. } | HouseError::Verify(_) => {
            StatusCode::BAD_REQUEST
        }
        HouseError::Account(e) => match e {
            AccountError::NotFound(_) | AccountError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            AccountError::InvalidUsername(_)
            | AccountError::InvalidAmount(_)
            | AccountError::DuplicateItem(_)
            | AccountError::NothingToSell => StatusCode::BAD_REQUEST,
            AccountError::UsernameTaken(_) | AccountError::InsufficientBalance { .. } => StatusCode::CONFLICT,
            AccountError::Overflow => StatusCode::INTERNAL_SERVER_ERROR,
        },
        HouseError::Battle(e) => match e {
            BattleError::NotFound(_) => StatusCode::NOT_FOUND,
            BattleError::InvalidRounds(_) | BattleError::InvalidPlayers(_) => StatusCode::BAD_REQUEST,
            BattleError::Full | BattleError::AlreadyJoined | BattleError::NotWaiting | BattleError::NotCreator => {
                StatusCode::CONFLICT
            }
            BattleError::Overflow | BattleError::Draw(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        HouseError::Draw(DrawError::InvalidClientSeed(_)) => StatusCode::BAD_REQUEST,
        HouseError::Draw(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<HouseError> for ApiError {
    fn from(err: HouseError) -> Self {
        let status = house_status(&err);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// HTTP Handlers - Cases
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}

async fn list_cases(State(state): State<AppState>, Query(query): Query<CaseListQuery>) -> Json<CaseListResponse> {
    let cases = state
        .house
        .cases(query.game.as_deref())
        .iter()
        .map(|case| CaseSummary::from(case.as_ref()))
        .collect();

    Json(CaseListResponse {
        success: true,
        cases,
        games: state.house.games(),
    })
}

async fn get_case(State(state): State<AppState>, Path(case_id): Path<String>) -> ApiResult<CaseResponse> {
    let case = state.house.case(&case_id)?;
    Ok(Json(CaseResponse {
        success: true,
        case: CaseDetail::from(case.as_ref()),
    }))
}

async fn open_case(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(case_id): Path<String>,
    Json(req): Json<OpenCaseRequest>,
) -> ApiResult<OpenCaseResponse> {
    let client_ip = addr.ip().to_string();
    if !state.open_rate_limiter.check(&client_ip) {
        warn!("Rate limit exceeded for case opening from {}", client_ip);
        return Err(ApiError::rate_limited());
    }

    let outcome = state.house.open_case(req.account_id, &case_id)?;

    state.persist_account(&outcome.account).await;
    state.persist_seed(req.account_id).await;
    if let Err(e) = state.db.record_draw(&outcome.receipt.receipt).await {
        error!("Failed to record draw {}: {}", outcome.receipt.receipt.draw_id, e);
    }

    Ok(Json(OpenCaseResponse {
        success: true,
        item: outcome.item,
        receipt: outcome.receipt,
        balance: outcome.account.balance,
        level: outcome.account.progress.level,
        level_up: outcome.level_up,
    }))
}

// ============================================================================
// HTTP Handlers - Accounts
// ============================================================================

async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state.house.create_account(&req.username)?;
    state.persist_account(&account).await;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            success: true,
            account: AccountView::from(&account),
        }),
    ))
}

async fn get_account(State(state): State<AppState>, Path(account_id): Path<Uuid>) -> ApiResult<AccountResponse> {
    let account = state.house.account(account_id)?;
    Ok(Json(AccountResponse {
        success: true,
        account: AccountView::from(&account),
    }))
}

async fn deposit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<DepositResponse> {
    let client_ip = addr.ip().to_string();
    if !state.deposit_rate_limiter.check(&client_ip) {
        warn!("Rate limit exceeded for deposit from {}", client_ip);
        return Err(ApiError::rate_limited());
    }

    let (outcome, account) = state.house.deposit(account_id, req.amount)?;
    state.persist_account(&account).await;

    Ok(Json(DepositResponse {
        success: true,
        amount: outcome.amount,
        bonus: outcome.bonus,
        balance: outcome.balance,
    }))
}

async fn sell_item(
    State(state): State<AppState>,
    Path((account_id, uid)): Path<(Uuid, Uuid)>,
) -> ApiResult<SellResponse> {
    let (item, account) = state.house.sell_item(account_id, uid)?;
    state.persist_account(&account).await;

    Ok(Json(SellResponse {
        success: true,
        item,
        balance: account.balance,
    }))
}

async fn sell_items(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<SellItemsRequest>,
) -> ApiResult<SellItemsResponse> {
    let (items, total, account) = state.house.sell_items(account_id, &req.uids)?;
    state.persist_account(&account).await;

    Ok(Json(SellItemsResponse {
        success: true,
        items,
        total,
        balance: account.balance,
    }))
}

async fn leaderboard(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Json<LeaderboardResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    Json(LeaderboardResponse {
        success: true,
        entries: state.house.leaderboard(limit as usize),
    })
}

// ============================================================================
// HTTP Handlers - Seeds and Verification
// ============================================================================

async fn get_seeds(State(state): State<AppState>, Path(account_id): Path<Uuid>) -> ApiResult<SeedResponse> {
    let active = state.house.seed_commitment(account_id)?;
    state.persist_seed(account_id).await;
    Ok(Json(SeedResponse {
        success: true,
        active,
        revealed: None,
    }))
}

async fn set_client_seed(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<ClientSeedRequest>,
) -> ApiResult<SeedResponse> {
    let (revealed, active) = state.house.set_client_seed(account_id, &req.client_seed)?;
    if let Some(revealed) = &revealed {
        state.persist_revealed(revealed).await;
    }
    state.persist_seed(account_id).await;

    Ok(Json(SeedResponse {
        success: true,
        active,
        revealed,
    }))
}

async fn rotate_seed(State(state): State<AppState>, Path(account_id): Path<Uuid>) -> ApiResult<SeedResponse> {
    let (revealed, active) = state.house.rotate_seed(account_id)?;
    if let Some(revealed) = &revealed {
        state.persist_revealed(revealed).await;
    }
    state.persist_seed(account_id).await;

    Ok(Json(SeedResponse {
        success: true,
        active,
        revealed,
    }))
}

async fn draw_history(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<DrawHistoryResponse> {
    state.house.account(account_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_DRAW_HISTORY_LIMIT)
        .clamp(1, MAX_DRAW_HISTORY_LIMIT);
    let draws = state.db.draws_for_account(account_id, limit).await?;

    Ok(Json(DrawHistoryResponse { success: true, draws }))
}

async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> ApiResult<VerifyResponse> {
    let server_seed = match req.server_seed {
        Some(seed) => seed,
        None => {
            let hash = &req.receipt.receipt.proof.server_seed_hash;
            match state.db.find_revealed_seed(hash).await? {
                Some(revealed) => revealed.server_seed,
                None => return Err(HouseError::SeedNotRevealed(hash.clone()).into()),
            }
        }
    };

    match state.house.verify_receipt(&req.receipt, &server_seed) {
        Ok(draw) => Ok(Json(VerifyResponse {
            success: true,
            valid: true,
            draw: Some(draw),
            reason: None,
        })),
        // A receipt that fails the check is a valid answer, not a request error
        Err(e @ (HouseError::BadSignature | HouseError::ReceiptMismatch { .. } | HouseError::Verify(_))) => {
            info!("Receipt {} failed verification: {}", req.receipt.receipt.draw_id, e);
            Ok(Json(VerifyResponse {
                success: true,
                valid: false,
                draw: None,
                reason: Some(e.to_string()),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// HTTP Handlers - Battles
// ============================================================================

async fn list_battles(State(state): State<AppState>, Query(query): Query<BattleListQuery>) -> Json<BattleListResponse> {
    Json(BattleListResponse {
        success: true,
        battles: state.house.battles(query.status),
    })
}

async fn create_battle(
    State(state): State<AppState>,
    Json(req): Json<CreateBattleRequest>,
) -> Result<(StatusCode, Json<BattleResponse>), ApiError> {
    let battle = state
        .house
        .create_battle(req.account_id, &req.case_id, req.rounds, req.max_players)?;
    state.persist_battle(&battle).await;

    Ok((StatusCode::CREATED, Json(BattleResponse { success: true, battle })))
}

async fn get_battle(State(state): State<AppState>, Path(battle_id): Path<Uuid>) -> ApiResult<BattleResponse> {
    let battle = state.house.battle(battle_id)?;
    Ok(Json(BattleResponse { success: true, battle }))
}

async fn join_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(req): Json<BattleActionRequest>,
) -> ApiResult<BattleResponse> {
    let battle = state.house.join_battle(battle_id, req.account_id)?;
    state.persist_battle(&battle).await;
    Ok(Json(BattleResponse { success: true, battle }))
}

async fn cancel_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
    Json(req): Json<BattleActionRequest>,
) -> ApiResult<BattleResponse> {
    let battle = state.house.cancel_battle(battle_id, req.account_id)?;
    state.persist_battle(&battle).await;
    Ok(Json(BattleResponse { success: true, battle }))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Cases
        .route("/api/cases", get(list_cases))
        .route("/api/cases/:id", get(get_case))
        .route("/api/cases/:id/open", post(open_case))
        // Accounts
        .route("/api/accounts", post(create_account))
        .route("/api/accounts/:id", get(get_account))
        .route("/api/accounts/:id/deposit", post(deposit))
        .route("/api/accounts/:id/items/sell", post(sell_items))
        .route("/api/accounts/:id/items/:uid/sell", post(sell_item))
        .route("/api/accounts/:id/draws", get(draw_history))
        // Provably fair
        .route("/api/accounts/:id/seeds", get(get_seeds))
        .route("/api/accounts/:id/seeds/client", put(set_client_seed))
        .route("/api/accounts/:id/seeds/rotate", post(rotate_seed))
        .route("/api/verify", post(verify))
        .route("/api/leaderboard", get(leaderboard))
        // Battles
        .route("/api/battles", get(list_battles).post(create_battle))
        .route("/api/battles/:id", get(get_battle))
        .route("/api/battles/:id/join", post(join_battle))
        .route("/api/battles/:id/cancel", post(cancel_battle))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CaseDefinition;
    use crate::money::Money;
    use crate::odds::{OddsConfig, OddsTable, PricedItem};
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn registry() -> CaseRegistry {
        let items = ["sticker:30", "pistol:120", "rifle:900", "knife:6000"]
            .iter()
            .map(|spec| {
                let (id, cents) = spec.split_once(':').unwrap();
                PricedItem {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    value: Money(cents.parse().unwrap()),
                    image: None,
                }
            })
            .collect();
        let mut cases = CaseRegistry::new();
        cases.insert(CaseDefinition {
            id: "mirage".to_string(),
            display_name: "Mirage".to_string(),
            game: "cs2".to_string(),
            price: Money(300),
            image: None,
            odds: OddsTable::build(Money(300), items, 9_000, &OddsConfig::default()).unwrap(),
        });
        cases
    }

    async fn app_with_limits(limits: RateLimitConfig) -> Router {
        let house = House::new(Arc::new(registry()), ReceiptSigner::random());
        let db = Database::in_memory().await.unwrap();
        router(AppState::from_parts(house, db, &limits))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    async fn app() -> Router {
        app_with_limits(RateLimitConfig::default()).await
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn funded_account(app: &Router, name: &str, cents: i64) -> String {
        let (status, body) = send(app, "POST", "/api/accounts", Some(json!({ "username": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["account"]["id"].as_str().unwrap().to_string();
        let (status, _) = send(app, "POST", &format!("/api/accounts/{}/deposit", id), Some(json!({ "amount": cents }))).await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    #[tokio::test]
    async fn test_health_and_cases() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = send(&app, "GET", "/api/cases?game=cs2", None).await;
        assert_eq!(body["cases"].as_array().unwrap().len(), 1);
        let (_, body) = send(&app, "GET", "/api/cases?game=dota2", None).await;
        assert!(body["cases"].as_array().unwrap().is_empty());

        let (status, body) = send(&app, "GET", "/api/cases/mirage", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["case"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        let total: f64 = items.iter().map(|i| i["probability"].as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(body["case"]["fingerprint"].as_str().unwrap().len(), 64);

        let (status, body) = send(&app, "GET", "/api/cases/nuke", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_open_and_verify() {
        let app = app().await;
        let id = funded_account(&app, "opener", 1_000).await;

        let (status, opened) = send(&app, "POST", "/api/cases/mirage/open", Some(json!({ "account_id": id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened["balance"], 700);
        let receipt = opened["receipt"].clone();

        // Still committed: no revealed seed to check against
        let (status, _) = send(&app, "POST", "/api/verify", Some(json!({ "receipt": receipt }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, rotated) = send(&app, "POST", &format!("/api/accounts/{}/seeds/rotate", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rotated["revealed"]["draws"], 1);
        assert_eq!(rotated["active"]["nonce"], 0);

        let (status, verified) = send(&app, "POST", "/api/verify", Some(json!({ "receipt": receipt }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["valid"], true);
        assert_eq!(verified["draw"]["item_id"], opened["item"]["item_id"]);

        let mut tampered = receipt.clone();
        tampered["receipt"]["value"] = json!(1_000_000);
        let (_, verified) = send(&app, "POST", "/api/verify", Some(json!({ "receipt": tampered }))).await;
        assert_eq!(verified["valid"], false);

        let (_, history) = send(&app, "GET", &format!("/api/accounts/{}/draws", id), None).await;
        assert_eq!(history["draws"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_errors() {
        let app = app().await;
        let id = funded_account(&app, "shortfall", 200).await;

        let (status, body) = send(&app, "POST", "/api/cases/mirage/open", Some(json!({ "account_id": id }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("insufficient balance"));

        let missing = Uuid::new_v4().to_string();
        let (status, _) = send(&app, "POST", "/api/cases/mirage/open", Some(json!({ "account_id": missing }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", &format!("/api/accounts/{}/deposit", id), Some(json!({ "amount": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deposit_rate_limited() {
        let limits = RateLimitConfig {
            window_secs: 60,
            open_requests: 100,
            deposit_requests: 2,
        };
        let app = app_with_limits(limits).await;
        let id = funded_account(&app, "spammer", 100).await;

        let uri = format!("/api/accounts/{}/deposit", id);
        let (status, _) = send(&app, "POST", &uri, Some(json!({ "amount": 100 }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "POST", &uri, Some(json!({ "amount": 100 }))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_client_seed_and_sell() {
        let app = app().await;
        let id = funded_account(&app, "seeder", 1_000).await;

        let uri = format!("/api/accounts/{}/seeds/client", id);
        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "client_seed": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, "PUT", &uri, Some(json!({ "client_seed": "my-lucky-seed" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"]["client_seed"], "my-lucky-seed");

        let (_, opened) = send(&app, "POST", "/api/cases/mirage/open", Some(json!({ "account_id": id }))).await;
        assert_eq!(opened["receipt"]["receipt"]["proof"]["client_seed"], "my-lucky-seed");
        let uid = opened["item"]["uid"].as_str().unwrap();
        let value = opened["item"]["value"].as_i64().unwrap();

        let (status, sold) = send(&app, "POST", &format!("/api/accounts/{}/items/{}/sell", id, uid), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sold["balance"].as_i64().unwrap(), 700 + value);

        let (status, _) = send(&app, "POST", &format!("/api/accounts/{}/items/{}/sell", id, uid), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sell_selected_items() {
        let app = app().await;
        let id = funded_account(&app, "bulkseller", 1_000).await;

        let mut uids = Vec::new();
        let mut total = 0;
        for _ in 0..3 {
            let (_, opened) = send(&app, "POST", "/api/cases/mirage/open", Some(json!({ "account_id": id }))).await;
            uids.push(opened["item"]["uid"].as_str().unwrap().to_string());
            total += opened["item"]["value"].as_i64().unwrap();
        }
        let uri = format!("/api/accounts/{}/items/sell", id);

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "uids": [uids[0], Uuid::new_v4()] }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "POST", &uri, Some(json!({ "uids": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, account) = send(&app, "GET", &format!("/api/accounts/{}", id), None).await;
        assert_eq!(account["account"]["inventory"].as_array().unwrap().len(), 3);

        let (status, sold) = send(&app, "POST", &uri, Some(json!({ "uids": uids }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sold["items"].as_array().unwrap().len(), 3);
        assert_eq!(sold["total"].as_i64().unwrap(), total);
        assert_eq!(sold["balance"].as_i64().unwrap(), 100 + total);
    }

    #[test]
    fn test_rate_limiter_prunes_expired_windows() {
        let limiter = RateLimiter::new(5, 60);
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
        let expired = std::time::Instant::now().checked_sub(Duration::from_secs(120)).unwrap();
        limiter.entries.insert("10.0.0.3".to_string(), (5, expired));

        assert_eq!(limiter.prune(), 1);
        assert_eq!(limiter.entries.len(), 2);
        assert!(!limiter.entries.contains_key("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_battle_endpoints() {
        let app = app().await;
        let alice = funded_account(&app, "alice", 1_000).await;
        let bob = funded_account(&app, "bob", 1_000).await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/battles",
            Some(json!({ "account_id": alice, "case_id": "mirage", "rounds": 2, "max_players": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let battle_id = created["battle"]["id"].as_str().unwrap().to_string();

        let (_, waiting) = send(&app, "GET", "/api/battles?status=waiting", None).await;
        assert_eq!(waiting["battles"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/battles/{}/cancel", battle_id),
            Some(json!({ "account_id": bob })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, done) = send(
            &app,
            "POST",
            &format!("/api/battles/{}/join", battle_id),
            Some(json!({ "account_id": bob })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["battle"]["status"], "completed");
        assert!(done["battle"]["revealed_server_seed"].is_string());

        let (_, board) = send(&app, "GET", "/api/leaderboard?limit=5", None).await;
        let entries = board["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["battles_won"], 1);

        let (status, _) = send(&app, "GET", &format!("/api/battles/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
