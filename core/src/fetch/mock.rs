use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use url::Url;

use super::Fetcher;
use crate::error::{CoreError, Result};
use crate::query::Endpoint;
use crate::types::{CountStats, Post};

#[derive(Debug, Clone)]
enum MockResponse {
    Body(String),
    Failure(String),
}

/// テスト用のモックFetcher実装
///
/// エンドポイントごとに応答を積んでおき、要求順に返す。
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<&'static str, VecDeque<MockResponse>>>>,
    requests: Arc<Mutex<Vec<String>>>,
    gates: Arc<Mutex<HashMap<&'static str, Arc<Semaphore>>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 検索結果ページを積む
    pub fn push_page(&self, posts: &[Post]) {
        let body = serde_json::to_string(posts).unwrap();
        self.push_body(Endpoint::Search, &body);
    }

    /// 件数を積む
    pub fn push_count(&self, stats: CountStats) {
        let body = serde_json::to_string(&stats).unwrap();
        self.push_body(Endpoint::Count, &body);
    }

    /// 生の応答本文を積む
    pub fn push_body(&self, endpoint: Endpoint, body: &str) {
        self.push(endpoint, MockResponse::Body(body.to_string()));
    }

    /// 通信失敗を積む
    pub fn push_failure(&self, endpoint: Endpoint, message: &str) {
        self.push(endpoint, MockResponse::Failure(message.to_string()));
    }

    /// エンドポイントへの応答を止める
    ///
    /// 返したセマフォに許可を足した数だけ応答が進む。
    pub fn hold(&self, endpoint: Endpoint) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(endpoint.path(), gate.clone());
        gate
    }

    /// 受け取ったURL（要求順）
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// エンドポイントへの要求の `cursor` パラメータ
    pub fn cursors(&self, endpoint: Endpoint) -> Vec<i32> {
        self.requests()
            .iter()
            .filter(|url| classify(url) == Some(endpoint))
            .filter_map(|url| param(url, "cursor"))
            .filter_map(|cursor| cursor.parse().ok())
            .collect()
    }

    fn push(&self, endpoint: Endpoint, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.entry(endpoint.path()).or_default().push_back(response);
    }
}

#[async_trait(?Send)]
impl Fetcher for MockFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());

        let endpoint = classify(url)
            .ok_or_else(|| CoreError::FetchFailed(format!("HTTP 404 ({})", url)))?;

        // 応答は要求した時点で確定させる
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(endpoint.path())
            .and_then(|queue| queue.pop_front());

        let gate = self.gates.lock().unwrap().get(endpoint.path()).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| CoreError::FetchFailed(e.to_string()))?
                .forget();
        }

        match response {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Failure(message)) => Err(CoreError::FetchFailed(message)),
            None => Err(CoreError::FetchFailed(format!("No mock response for {}", url))),
        }
    }
}

fn classify(url: &str) -> Option<Endpoint> {
    let url = Url::parse(url).ok()?;
    let path = url.path();
    if path.ends_with("/api/v1/search/count") {
        Some(Endpoint::Count)
    } else if path.ends_with("/api/v1/search") {
        Some(Endpoint::Search)
    } else {
        None
    }
}

fn param(url: &str, key: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    value
}
