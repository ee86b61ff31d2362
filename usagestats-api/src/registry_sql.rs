//! PostgreSQL source registry adapter
//!
//! Maps the registry contract onto the relational `source` table:
//! `(id, kind, country_iso, identifier_prefix, parent_id)`, with `parent_id`
//! expressing the three-tier hierarchy. The pool is acquired once at startup
//! and shared by every request.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;

use usagestats_core::{
    ResolvedIndexSet, Source, SourceRegistry, StatsError, StatsResult,
};

use crate::config::RegistryConfig;

const SOURCE_BY_ID: &str =
    "SELECT id, kind, country_iso, identifier_prefix FROM source WHERE id = $1";

const REPOSITORY_BY_PREFIX: &str = "SELECT id, kind, country_iso, identifier_prefix \
     FROM source WHERE kind = 'repository' AND identifier_prefix = $1";

const CHILDREN_OF: &str = "SELECT id, kind, country_iso, identifier_prefix \
     FROM source WHERE parent_id = $1 ORDER BY id";

const SUBTREE_OF: &str = "WITH RECURSIVE subtree AS ( \
         SELECT id, kind, country_iso, identifier_prefix, parent_id \
         FROM source WHERE parent_id = $1 \
         UNION ALL \
         SELECT s.id, s.kind, s.country_iso, s.identifier_prefix, s.parent_id \
         FROM source s JOIN subtree t ON s.parent_id = t.id \
     ) \
     SELECT id, kind, country_iso, identifier_prefix FROM subtree ORDER BY id";

pub struct PostgresRegistry {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct SourceRow {
    id: String,
    kind: String,
    country_iso: String,
    identifier_prefix: Option<String>,
}

impl SourceRow {
    fn into_source(self) -> StatsResult<Source> {
        Ok(Source {
            id: self.id,
            kind: self.kind.parse()?,
            country_iso: self.country_iso,
            identifier_prefix: self.identifier_prefix,
        })
    }
}

impl PostgresRegistry {
    /// Connect the registry pool; an unreachable registry at boot is fatal
    pub async fn connect(config: &RegistryConfig) -> StatsResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
            .connect(&config.database_url)
            .await
            .map_err(|err| {
                StatsError::registry(format!("failed to connect to source registry: {}", err))
            })?;

        Ok(Self { pool })
    }

    async fn fetch_children(&self, parent_id: &str, sql: &str) -> StatsResult<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(registry_error)?;

        rows.into_iter().map(SourceRow::into_source).collect()
    }
}

fn registry_error(err: sqlx::Error) -> StatsError {
    StatsError::registry(err.to_string())
}

#[async_trait]
impl SourceRegistry for PostgresRegistry {
    async fn source_by_id(&self, id: &str) -> StatsResult<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>(SOURCE_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(registry_error)?;

        row.map(SourceRow::into_source).transpose()
    }

    async fn index_patterns_for_identifier_prefix(
        &self,
        prefix: &str,
    ) -> StatsResult<Option<ResolvedIndexSet>> {
        let row = sqlx::query_as::<_, SourceRow>(REPOSITORY_BY_PREFIX)
            .bind(prefix)
            .fetch_optional(&self.pool)
            .await
            .map_err(registry_error)?;

        Ok(row
            .map(SourceRow::into_source)
            .transpose()?
            .map(|source| ResolvedIndexSet::of(source.index_pattern())))
    }

    async fn index_patterns_for_national_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet> {
        let mut set = ResolvedIndexSet::of(source.index_pattern());
        for repository in self.fetch_children(&source.id, CHILDREN_OF).await? {
            set.insert(repository.index_pattern());
        }
        Ok(set)
    }

    async fn index_patterns_for_regional_source(
        &self,
        source: &Source,
    ) -> StatsResult<ResolvedIndexSet> {
        let mut set = ResolvedIndexSet::of(source.index_pattern());
        for descendant in self.fetch_children(&source.id, SUBTREE_OF).await? {
            set.insert(descendant.index_pattern());
        }
        Ok(set)
    }
}
