use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::account::{Account, Progress};
use crate::fair::{DrawProof, DrawReceipt, RevealedSeed, SeedPair, ServerSeed};
use crate::money::Money;

fn decode_error<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

fn parse_uuid(value: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(decode_error)
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect(database_url, 5).await
    }

    /// In-memory sqlite keeps one database per connection, so tests use a single connection
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                balance INTEGER NOT NULL DEFAULT 0,
                xp INTEGER NOT NULL DEFAULT 0,
                total_deposited INTEGER NOT NULL DEFAULT 0,
                total_spent INTEGER NOT NULL DEFAULT 0,
                total_won INTEGER NOT NULL DEFAULT 0,
                cases_opened INTEGER NOT NULL DEFAULT 0,
                battles_won INTEGER NOT NULL DEFAULT 0,
                battles_lost INTEGER NOT NULL DEFAULT 0,
                inventory_json TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS draws (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                case_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                value INTEGER NOT NULL,
                server_seed_hash TEXT NOT NULL,
                client_seed TEXT NOT NULL,
                nonce INTEGER NOT NULL,
                roll INTEGER NOT NULL,
                total_weight INTEGER NOT NULL,
                item_index INTEGER NOT NULL,
                odds_fingerprint TEXT NOT NULL,
                issued_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_draws_account ON draws(account_id, issued_at)")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS revealed_seeds (
                server_seed_hash TEXT PRIMARY KEY,
                server_seed TEXT NOT NULL,
                client_seed TEXT NOT NULL,
                draws INTEGER NOT NULL,
                revealed_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS active_seeds (
                account_id TEXT PRIMARY KEY,
                server_seed TEXT NOT NULL,
                client_seed TEXT NOT NULL,
                nonce INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Insert or overwrite the stored copy of an account
    pub async fn save_account(&self, account: &Account) -> Result<(), sqlx::Error> {
        let inventory_json = serde_json::to_string(&account.inventory).map_err(decode_error)?;

        sqlx::query(
            r#"INSERT INTO accounts (
                id, username, balance, xp, total_deposited, total_spent, total_won,
                cases_opened, battles_won, battles_lost, inventory_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                balance = excluded.balance,
                xp = excluded.xp,
                total_deposited = excluded.total_deposited,
                total_spent = excluded.total_spent,
                total_won = excluded.total_won,
                cases_opened = excluded.cases_opened,
                battles_won = excluded.battles_won,
                battles_lost = excluded.battles_lost,
                inventory_json = excluded.inventory_json"#,
        )
        .bind(account.id.to_string())
        .bind(&account.username)
        .bind(account.balance.cents())
        .bind(account.progress.xp)
        .bind(account.total_deposited.cents())
        .bind(account.total_spent.cents())
        .bind(account.total_won.cents())
        .bind(account.cases_opened as i64)
        .bind(account.battles_won as i64)
        .bind(account.battles_lost as i64)
        .bind(&inventory_json)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_accounts(&self) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, username, balance, xp, total_deposited, total_spent, total_won,
                cases_opened, battles_won, battles_lost, inventory_json, created_at
            FROM accounts"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    // ========================================================================
    // Draw history
    // ========================================================================

    pub async fn record_draw(&self, receipt: &DrawReceipt) -> Result<(), sqlx::Error> {
        let proof = &receipt.proof;
        sqlx::query(
            r#"INSERT INTO draws (
                id, account_id, case_id, item_id, value, server_seed_hash, client_seed,
                nonce, roll, total_weight, item_index, odds_fingerprint, issued_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(receipt.draw_id.to_string())
        .bind(receipt.account_id.to_string())
        .bind(&receipt.case_id)
        .bind(&receipt.item_id)
        .bind(receipt.value.cents())
        .bind(&proof.server_seed_hash)
        .bind(&proof.client_seed)
        // sqlite integers are signed; u64 values round-trip through the bit pattern
        .bind(proof.nonce as i64)
        .bind(proof.roll as i64)
        .bind(proof.total_weight as i64)
        .bind(proof.index as i64)
        .bind(&proof.odds_fingerprint)
        .bind(receipt.issued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent draws first
    pub async fn draws_for_account(&self, account_id: Uuid, limit: u32) -> Result<Vec<DrawReceipt>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, account_id, case_id, item_id, value, server_seed_hash, client_seed,
                nonce, roll, total_weight, item_index, odds_fingerprint, issued_at
            FROM draws WHERE account_id = ?
            ORDER BY issued_at DESC, nonce DESC
            LIMIT ?"#,
        )
        .bind(account_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(receipt_from_row).collect()
    }

    // ========================================================================
    // Seeds
    // ========================================================================

    pub async fn record_revealed_seed(&self, revealed: &RevealedSeed) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO revealed_seeds (server_seed_hash, server_seed, client_seed, draws)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(server_seed_hash) DO NOTHING"#,
        )
        .bind(&revealed.server_seed_hash)
        .bind(&revealed.server_seed)
        .bind(&revealed.client_seed)
        .bind(revealed.draws as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_revealed_seed(&self, server_seed_hash: &str) -> Result<Option<RevealedSeed>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT server_seed_hash, server_seed, client_seed, draws FROM revealed_seeds WHERE server_seed_hash = ?",
        )
        .bind(server_seed_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RevealedSeed {
            server_seed_hash: r.get("server_seed_hash"),
            server_seed: r.get("server_seed"),
            client_seed: r.get("client_seed"),
            draws: r.get::<i64, _>("draws") as u64,
        }))
    }

    /// Store an account's active pair.
    ///
    /// Snapshots are written after the account lock is released, so they can
    /// land out of order. A write never lowers the nonce of the stored seed and
    /// never brings back a seed that has already been revealed.
    pub async fn save_active_seed(&self, account_id: Uuid, pair: &SeedPair) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO active_seeds (account_id, server_seed, client_seed, nonce)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                server_seed = excluded.server_seed,
                client_seed = excluded.client_seed,
                nonce = excluded.nonce
            WHERE NOT EXISTS (
                SELECT 1 FROM revealed_seeds WHERE revealed_seeds.server_seed = excluded.server_seed
            )
            AND (
                active_seeds.server_seed <> excluded.server_seed
                OR excluded.nonce > active_seeds.nonce
            )"#,
        )
        .bind(account_id.to_string())
        .bind(pair.server_seed.to_hex())
        .bind(&pair.client_seed)
        .bind(pair.nonce as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_active_seeds(&self) -> Result<Vec<(Uuid, SeedPair)>, sqlx::Error> {
        let rows = sqlx::query("SELECT account_id, server_seed, client_seed, nonce FROM active_seeds")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let account_id = parse_uuid(&r.get::<String, _>("account_id"))?;
                let seed_hex: String = r.get("server_seed");
                let server_seed = ServerSeed::from_hex(&seed_hex)
                    .ok_or_else(|| sqlx::Error::Decode(format!("bad server seed for {}", account_id).into()))?;
                Ok((
                    account_id,
                    SeedPair {
                        server_seed,
                        client_seed: r.get("client_seed"),
                        nonce: r.get::<i64, _>("nonce") as u64,
                    },
                ))
            })
            .collect()
    }
}

fn account_from_row(r: &SqliteRow) -> Result<Account, sqlx::Error> {
    let inventory_json: String = r.get("inventory_json");
    Ok(Account {
        id: parse_uuid(&r.get::<String, _>("id"))?,
        username: r.get("username"),
        balance: Money(r.get("balance")),
        progress: Progress::from_xp(r.get("xp")),
        total_deposited: Money(r.get("total_deposited")),
        total_spent: Money(r.get("total_spent")),
        total_won: Money(r.get("total_won")),
        cases_opened: r.get::<i64, _>("cases_opened") as u64,
        battles_won: r.get::<i64, _>("battles_won") as u32,
        battles_lost: r.get::<i64, _>("battles_lost") as u32,
        inventory: serde_json::from_str(&inventory_json).map_err(decode_error)?,
        created_at: r.get("created_at"),
    })
}

fn receipt_from_row(r: &SqliteRow) -> Result<DrawReceipt, sqlx::Error> {
    Ok(DrawReceipt {
        draw_id: parse_uuid(&r.get::<String, _>("id"))?,
        account_id: parse_uuid(&r.get::<String, _>("account_id"))?,
        case_id: r.get("case_id"),
        item_id: r.get("item_id"),
        value: Money(r.get("value")),
        proof: DrawProof {
            server_seed_hash: r.get("server_seed_hash"),
            client_seed: r.get("client_seed"),
            nonce: r.get::<i64, _>("nonce") as u64,
            roll: r.get::<i64, _>("roll") as u64,
            total_weight: r.get::<i64, _>("total_weight") as u64,
            index: r.get::<i64, _>("item_index") as usize,
            odds_fingerprint: r.get("odds_fingerprint"),
        },
        issued_at: r.get("issued_at"),
    })
}
