//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket is persisted as a single document with a version stamp.
//! `save` only succeeds if the stored version still matches the one the
//! caller loaded, which lets concurrent writers detect each other.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::timeouts::{with_default_timeout, with_long_timeout};
use crate::bracket::{Bracket, BracketError, BracketResult, TournamentId};

/// Trait for bracket persistence
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Load a bracket, `BracketNotFound` if it was never inserted
    async fn load(&self, tournament_id: TournamentId) -> BracketResult<Bracket>;

    /// Store a new bracket. Returns its first version.
    async fn insert(&self, bracket: &Bracket) -> BracketResult<u64>;

    /// Replace a bracket if its stored version is still `expected_version`.
    /// Returns the new version.
    async fn save(&self, bracket: &Bracket, expected_version: u64) -> BracketResult<u64>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> BracketResult<()>;
}

/// Process-local repository
#[derive(Default)]
pub struct InMemoryBracketRepository {
    brackets: RwLock<HashMap<TournamentId, Bracket>>,
}

impl InMemoryBracketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BracketRepository for InMemoryBracketRepository {
    async fn load(&self, tournament_id: TournamentId) -> BracketResult<Bracket> {
        self.brackets
            .read()
            .await
            .get(&tournament_id)
            .cloned()
            .ok_or(BracketError::BracketNotFound(tournament_id))
    }

    async fn insert(&self, bracket: &Bracket) -> BracketResult<u64> {
        let mut brackets = self.brackets.write().await;
        if brackets.contains_key(&bracket.tournament_id()) {
            return Err(BracketError::BracketAlreadyExists(bracket.tournament_id()));
        }

        let mut stored = bracket.clone();
        stored.set_version(1);
        brackets.insert(stored.tournament_id(), stored);
        Ok(1)
    }

    async fn save(&self, bracket: &Bracket, expected_version: u64) -> BracketResult<u64> {
        let tournament_id = bracket.tournament_id();
        let mut brackets = self.brackets.write().await;
        let current = brackets
            .get_mut(&tournament_id)
            .ok_or(BracketError::BracketNotFound(tournament_id))?;

        if current.version() != expected_version {
            return Err(BracketError::VersionConflict {
                tournament: tournament_id,
                expected: expected_version,
            });
        }

        let version = expected_version + 1;
        *current = bracket.clone();
        current.set_version(version);
        Ok(version)
    }

    async fn health_check(&self) -> BracketResult<()> {
        Ok(())
    }
}

/// PostgreSQL implementation storing each bracket as a JSONB document
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    /// Table backing the repository
    pub const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS playoff_brackets (
            tournament_id UUID PRIMARY KEY,
            version BIGINT NOT NULL,
            state JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#;

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the bracket table if it does not exist
    pub async fn migrate(&self) -> BracketResult<()> {
        with_long_timeout(sqlx::query(Self::SCHEMA).execute(&self.pool)).await?;
        log::info!("playoff_brackets table ready");
        Ok(())
    }

    fn document(bracket: &Bracket, version: u64) -> BracketResult<serde_json::Value> {
        let mut stored = bracket.clone();
        stored.set_version(version);
        Ok(serde_json::to_value(&stored)?)
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn load(&self, tournament_id: TournamentId) -> BracketResult<Bracket> {
        let row = with_default_timeout(
            sqlx::query("SELECT state FROM playoff_brackets WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(BracketError::BracketNotFound(tournament_id))?;

        let state: serde_json::Value = row.try_get("state")?;
        Ok(serde_json::from_value(state)?)
    }

    async fn insert(&self, bracket: &Bracket) -> BracketResult<u64> {
        let state = Self::document(bracket, 1)?;

        let result = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO playoff_brackets (tournament_id, version, state, created_at, updated_at)
                VALUES ($1, 1, $2, $3, $4)
                ON CONFLICT (tournament_id) DO NOTHING
                "#,
            )
            .bind(bracket.tournament_id())
            .bind(state)
            .bind(bracket.created_at())
            .bind(bracket.updated_at())
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::BracketAlreadyExists(bracket.tournament_id()));
        }

        Ok(1)
    }

    async fn save(&self, bracket: &Bracket, expected_version: u64) -> BracketResult<u64> {
        let version = expected_version + 1;
        let state = Self::document(bracket, version)?;

        let result = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE playoff_brackets
                SET version = $2, state = $3, updated_at = $4
                WHERE tournament_id = $1 AND version = $5
                "#,
            )
            .bind(bracket.tournament_id())
            .bind(version as i64)
            .bind(state)
            .bind(bracket.updated_at())
            .bind(expected_version as i64)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            // Either the row is gone or another writer bumped the version
            self.load(bracket.tournament_id()).await?;
            return Err(BracketError::VersionConflict {
                tournament: bracket.tournament_id(),
                expected: expected_version,
            });
        }

        Ok(version)
    }

    async fn health_check(&self) -> BracketResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{CompetitorSubmission, Points, TiebreakerPolicy};
    use uuid::Uuid;

    fn bracket() -> Bracket {
        let mut bracket = Bracket::new(
            Uuid::new_v4(),
            "Playoffs",
            vec![
                CompetitorSubmission::new(Uuid::new_v4(), "A", Points::new(100)),
                CompetitorSubmission::new(Uuid::new_v4(), "B", Points::new(90)),
            ],
            TiebreakerPolicy::default(),
        )
        .unwrap();
        bracket.generate().unwrap();
        bracket
    }

    #[tokio::test]
    async fn test_insert_and_load() {
        let repo = InMemoryBracketRepository::new();
        let bracket = bracket();

        assert_eq!(repo.insert(&bracket).await.unwrap(), 1);
        let loaded = repo.load(bracket.tournament_id()).await.unwrap();
        assert_eq!(loaded.version(), 1);
        assert_eq!(loaded.rounds(), bracket.rounds());
    }

    #[tokio::test]
    async fn test_insert_twice() {
        let repo = InMemoryBracketRepository::new();
        let bracket = bracket();

        repo.insert(&bracket).await.unwrap();
        assert!(matches!(
            repo.insert(&bracket).await,
            Err(BracketError::BracketAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing() {
        let repo = InMemoryBracketRepository::new();
        assert!(matches!(
            repo.load(Uuid::new_v4()).await,
            Err(BracketError::BracketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_checks_version() {
        let repo = InMemoryBracketRepository::new();
        let bracket = bracket();
        repo.insert(&bracket).await.unwrap();

        let loaded = repo.load(bracket.tournament_id()).await.unwrap();
        assert_eq!(repo.save(&loaded, 1).await.unwrap(), 2);

        assert!(matches!(
            repo.save(&loaded, 1).await,
            Err(BracketError::VersionConflict { expected: 1, .. })
        ));
        assert_eq!(repo.load(bracket.tournament_id()).await.unwrap().version(), 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(InMemoryBracketRepository::new().health_check().await.is_ok());
    }
}
