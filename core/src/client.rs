use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::SearchConfig;
use crate::error::{CoreError, Result};
use crate::fetch::Fetcher;
use crate::query::{request_url, Endpoint};
use crate::types::{CountStats, Cursor, Post, SearchQuery};

/// 検索APIクライアント
pub struct SearchClient {
    config: SearchConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl SearchClient {
    pub fn new(config: SearchConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// 1ページ分のレスを取得
    pub async fn fetch_page(&self, query: &SearchQuery, cursor: Cursor) -> Result<Vec<Post>> {
        self.get_json(Endpoint::Search, query, cursor).await
    }

    /// 件数を取得
    pub async fn fetch_count(&self, query: &SearchQuery, cursor: Cursor) -> Result<CountStats> {
        self.get_json(Endpoint::Count, query, cursor).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &SearchQuery,
        cursor: Cursor,
    ) -> Result<T> {
        let url = request_url(&self.config, endpoint, query, cursor);
        log::debug!("GET {}", url);

        let body = self
            .fetcher
            .get_text(&url)
            .await
            .map_err(CoreError::into_fetch_failed)?;

        decode(&body).map_err(|e| {
            log::warn!("Malformed {} response: {}", endpoint.path(), e);
            e.into_fetch_failed()
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}
