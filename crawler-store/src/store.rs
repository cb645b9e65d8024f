//! The production [`crawler_core::store::Store`] implementation, grounded in
//! the teacher's `postgres-lopez/src/master.rs` (`PostgresMasterBackend`:
//! prepare statements once at construction, `include_str!` the SQL bodies,
//! bind params positionally). Unlike the teacher's backend split across a
//! `MasterBackend`/`WorkerBackend` pair keyed by `wave_id`, there is exactly
//! one statement set here and no wave concept — every row is keyed directly
//! by its canonical URL.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::{Client, Statement};
use url::Url;

use crawler_core::error::Error as CoreError;
use crawler_core::model::CrawlResult;
use crawler_core::store::{Stats, Store};

const UPSERT_RESULT: &str = include_str!("sql/upsert_result.sql");
const INSERT_EDGE: &str = include_str!("sql/insert_edge.sql");
const EXISTS: &str = include_str!("sql/exists.sql");
const STATS_TOTAL: &str = include_str!("sql/stats_total.sql");
const STATS_BY_STATUS: &str = include_str!("sql/stats_by_status.sql");
const STATS_BY_DEPTH: &str = include_str!("sql/stats_by_depth.sql");
const STATS_TOP_DOMAINS: &str = include_str!("sql/stats_top_domains.sql");

pub struct PostgresStore {
    client: Arc<Client>,
    upsert_result: Statement,
    insert_edge: Statement,
    exists: Statement,
    stats_total: Statement,
    stats_by_status: Statement,
    stats_by_depth: Statement,
    stats_top_domains: Statement,
}

impl PostgresStore {
    pub async fn init(client: Arc<Client>) -> Result<PostgresStore, crate::error::Error> {
        let upsert_result = client.prepare(UPSERT_RESULT).await?;
        let insert_edge = client.prepare(INSERT_EDGE).await?;
        let exists = client.prepare(EXISTS).await?;
        let stats_total = client.prepare(STATS_TOTAL).await?;
        let stats_by_status = client.prepare(STATS_BY_STATUS).await?;
        let stats_by_depth = client.prepare(STATS_BY_DEPTH).await?;
        let stats_top_domains = client.prepare(STATS_TOP_DOMAINS).await?;

        Ok(PostgresStore {
            client,
            upsert_result,
            insert_edge,
            exists,
            stats_total,
            stats_by_status,
            stats_by_depth,
            stats_top_domains,
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_result(&self, result: &CrawlResult) -> Result<(), CoreError> {
        self.client
            .execute(
                &self.upsert_result,
                &[
                    &result.url.as_str(),
                    &result.title,
                    &(result.content_length as i64),
                    &result.status.as_str(),
                    &(result.depth as i16),
                    &(result.timestamp as i64),
                    &result.domain,
                    &result.response_time,
                    &result.error_message,
                ],
            )
            .await
            .map_err(crate::error::Error::from)?;

        Ok(())
    }

    async fn insert_edges(&self, edges: &[(Url, Url, u16)]) -> Result<(), CoreError> {
        let discovered_at = crawler_core::time::unix_now() as i64;

        for (source, target, depth) in edges {
            self.client
                .execute(
                    &self.insert_edge,
                    &[
                        &source.as_str(),
                        &target.as_str(),
                        &(*depth as i16),
                        &discovered_at,
                    ],
                )
                .await
                .map_err(crate::error::Error::from)?;
        }

        Ok(())
    }

    async fn exists(&self, url: &Url) -> Result<bool, CoreError> {
        let rows = self
            .client
            .query(&self.exists, &[&url.as_str()])
            .await
            .map_err(crate::error::Error::from)?;
        Ok(!rows.is_empty())
    }

    async fn stats(&self) -> Result<Stats, CoreError> {
        let total_row = self
            .client
            .query_one(&self.stats_total, &[])
            .await
            .map_err(crate::error::Error::from)?;
        let total: i64 = total_row.get(0);

        let status_rows = self
            .client
            .query(&self.stats_by_status, &[])
            .await
            .map_err(crate::error::Error::from)?;
        let by_status: HashMap<String, usize> = status_rows
            .iter()
            .map(|row| {
                let status: String = row.get(0);
                let count: i64 = row.get(1);
                (status, count as usize)
            })
            .collect();

        let depth_rows = self
            .client
            .query(&self.stats_by_depth, &[])
            .await
            .map_err(crate::error::Error::from)?;
        let by_depth: HashMap<u16, usize> = depth_rows
            .iter()
            .map(|row| {
                let depth: i16 = row.get(0);
                let count: i64 = row.get(1);
                (depth as u16, count as usize)
            })
            .collect();

        let domain_rows = self
            .client
            .query(&self.stats_top_domains, &[])
            .await
            .map_err(crate::error::Error::from)?;
        let top_domains: Vec<(String, usize)> = domain_rows
            .iter()
            .map(|row| {
                let domain: String = row.get(0);
                let count: i64 = row.get(1);
                (domain, count as usize)
            })
            .collect();

        Ok(Stats {
            total: total as usize,
            by_status,
            by_depth,
            top_domains,
        })
    }
}
