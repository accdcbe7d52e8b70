use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, LeaderboardEntry, OwnedItem};
use crate::battle::{Battle, BattleStatus};
use crate::data::{CaseDefinition, GameSummary};
use crate::fair::{DrawReceipt, RevealedSeed, SeedCommitment, SignedReceipt};
use crate::house::VerifiedDraw;
use crate::money::Money;
use crate::odds::Rarity;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenCaseRequest {
    pub account_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Cents
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct SellItemsRequest {
    pub uids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ClientSeedRequest {
    pub client_seed: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub receipt: SignedReceipt,
    /// Looked up among revealed seeds when omitted
    pub server_seed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBattleRequest {
    pub account_id: Uuid,
    pub case_id: String,
    pub rounds: u32,
    pub max_players: u32,
}

/// Join or cancel
#[derive(Debug, Deserialize)]
pub struct BattleActionRequest {
    pub account_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CaseListQuery {
    pub game: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BattleListQuery {
    pub status: Option<BattleStatus>,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CaseSummary {
    pub id: String,
    pub display_name: String,
    pub game: String,
    pub price: Money,
    pub image: Option<String>,
    pub item_count: usize,
    pub realized_rtp_bps: f64,
}

impl From<&CaseDefinition> for CaseSummary {
    fn from(case: &CaseDefinition) -> Self {
        Self {
            id: case.id.clone(),
            display_name: case.display_name.clone(),
            game: case.game.clone(),
            price: case.price,
            image: case.image.clone(),
            item_count: case.odds.len(),
            realized_rtp_bps: case.odds.realized_rtp_bps(),
        }
    }
}

/// One row of a published odds table
#[derive(Debug, Serialize)]
pub struct OddsItemView {
    pub id: String,
    pub display_name: String,
    pub image: Option<String>,
    pub value: Money,
    pub rarity: Rarity,
    pub weight: u64,
    pub probability: f64,
}

#[derive(Debug, Serialize)]
pub struct CaseDetail {
    pub id: String,
    pub display_name: String,
    pub game: String,
    pub price: Money,
    pub image: Option<String>,
    pub target_rtp_bps: u32,
    pub realized_rtp_bps: f64,
    /// Expected item value per opening, in cents
    pub expected_value: f64,
    pub total_weight: u64,
    pub fingerprint: String,
    pub items: Vec<OddsItemView>,
}

impl From<&CaseDefinition> for CaseDetail {
    fn from(case: &CaseDefinition) -> Self {
        let odds = &case.odds;
        let items = odds
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| OddsItemView {
                id: entry.item.id.clone(),
                display_name: entry.item.display_name.clone(),
                image: entry.item.image.clone(),
                value: entry.item.value,
                rarity: entry.rarity,
                weight: entry.weight,
                probability: odds.probability(i),
            })
            .collect();

        Self {
            id: case.id.clone(),
            display_name: case.display_name.clone(),
            game: case.game.clone(),
            price: odds.case_price(),
            image: case.image.clone(),
            target_rtp_bps: odds.target_rtp_bps(),
            realized_rtp_bps: odds.realized_rtp_bps(),
            expected_value: odds.expected_value(),
            total_weight: odds.total_weight(),
            fingerprint: odds.fingerprint().to_string(),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub balance: Money,
    pub level: i32,
    pub xp: i64,
    pub xp_to_next_level: i64,
    pub level_progress: f32,
    pub total_deposited: Money,
    pub total_spent: Money,
    pub total_won: Money,
    pub cases_opened: u64,
    pub battles_won: u32,
    pub battles_lost: u32,
    pub inventory_value: Money,
    pub inventory: Vec<OwnedItem>,
    pub created_at: i64,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            balance: account.balance,
            level: account.progress.level,
            xp: account.progress.xp,
            xp_to_next_level: account.progress.xp_to_next_level(),
            level_progress: account.progress.level_progress(),
            total_deposited: account.total_deposited,
            total_spent: account.total_spent,
            total_won: account.total_won,
            cases_opened: account.cases_opened,
            battles_won: account.battles_won,
            battles_lost: account.battles_lost,
            inventory_value: account.inventory_value(),
            inventory: account.inventory.clone(),
            created_at: account.created_at,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub success: bool,
    pub cases: Vec<CaseSummary>,
    pub games: Vec<GameSummary>,
}

#[derive(Debug, Serialize)]
pub struct CaseResponse {
    pub success: bool,
    pub case: CaseDetail,
}

#[derive(Debug, Serialize)]
pub struct OpenCaseResponse {
    pub success: bool,
    pub item: OwnedItem,
    pub receipt: SignedReceipt,
    pub balance: Money,
    pub level: i32,
    pub level_up: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub account: AccountView,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub success: bool,
    pub amount: Money,
    pub bonus: Money,
    pub balance: Money,
}

#[derive(Debug, Serialize)]
pub struct SellResponse {
    pub success: bool,
    pub item: OwnedItem,
    pub balance: Money,
}

#[derive(Debug, Serialize)]
pub struct SellItemsResponse {
    pub success: bool,
    pub items: Vec<OwnedItem>,
    pub total: Money,
    pub balance: Money,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
    pub active: SeedCommitment,
    /// Present when the call retired a server seed
    pub revealed: Option<RevealedSeed>,
}

#[derive(Debug, Serialize)]
pub struct DrawHistoryResponse {
    pub success: bool,
    pub draws: Vec<DrawReceipt>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub valid: bool,
    pub draw: Option<VerifiedDraw>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct BattleResponse {
    pub success: bool,
    pub battle: Battle,
}

#[derive(Debug, Serialize)]
pub struct BattleListResponse {
    pub success: bool,
    pub battles: Vec<Battle>,
}
