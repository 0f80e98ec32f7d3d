pub mod types;
pub mod config;
pub mod query;
pub mod results;
pub mod pagination;
pub mod links;
pub mod fetch;
pub mod client;
pub mod error;

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;

pub use config::SearchConfig;
pub use error::{CoreError, Result};
pub use types::{CountStats, Cursor, PaginationState, Post, SearchQuery};

use crate::client::SearchClient;
use crate::fetch::Fetcher;
use crate::pagination::{Applied, CountRequest, LoadKind, PageRequest, Phase, SearchSession};
use crate::results::ResultSet;

/// ポーリングされずに溜められるイベント数の上限（超えたら古いものから捨てる）
pub const EVENT_BUFFER_LIMIT: usize = 256;

/// UIに通知する出来事
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    /// 新しい検索を開始した（表示をクリアする）
    Reset { generation: u64 },
    PageLoaded {
        kind: LoadKind,
        added: usize,
        state: PaginationState,
    },
    CountLoaded { count: CountStats },
    PageFailed { kind: LoadKind, message: String },
    CountFailed { message: String },
}

/// 検索の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub state: PaginationState,
    /// 件数（古い検索の件数だった場合は `Ok(None)`）
    pub count: Result<Option<CountStats>>,
}

/// SearchHandle: UIから使用されるメインAPI
///
/// シングルスレッド前提。`RefCell` の借用は `await` をまたがない。
pub struct SearchHandle {
    client: SearchClient,
    session: RefCell<SearchSession>,
    event_buffer: RefCell<VecDeque<SearchEvent>>,
}

impl SearchHandle {
    /// 初期化
    pub fn new(config: SearchConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let session = SearchSession::new(config.page_limit);
        Ok(Self {
            client: SearchClient::new(config, fetcher),
            session: RefCell::new(session),
            event_buffer: RefCell::new(VecDeque::new()),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        self.client.config()
    }

    /// 検索を送信
    ///
    /// 初回ページと件数を並行して取得し、それぞれ届いた時点で反映する。
    /// 初回ページの失敗はエラーで返し、件数の失敗は `SubmitOutcome::count` で返す。
    pub async fn submit(&self, query: SearchQuery) -> Result<SubmitOutcome> {
        let (page_req, count_req) = self.begin(query);

        let (state, count) = tokio::join!(self.run_page(page_req), self.run_count(count_req));
        Ok(SubmitOutcome { state: state?, count })
    }

    /// 新しい検索を開始して要求を返す（通信はしない）
    pub fn begin(&self, query: SearchQuery) -> (PageRequest, CountRequest) {
        log::info!("Search submitted: {:?}", query);
        let (page_req, count_req) = self.session.borrow_mut().submit(query);
        // 前の検索のイベントは表示に使われない
        self.event_buffer.borrow_mut().clear();
        self.push_event(SearchEvent::Reset {
            generation: page_req.ticket.generation,
        });
        (page_req, count_req)
    }

    /// 続きを読み込む
    ///
    /// 続きが無い・読み込み中の場合は何もせず現在の状態を返す。
    pub async fn load_more(&self) -> Result<PaginationState> {
        let request = self.session.borrow_mut().request_more();
        match request {
            Some(request) => self.run_page(request).await,
            None => Ok(self.state()),
        }
    }

    /// 失敗したページ取得を同じカーソルで再試行
    pub async fn retry(&self) -> Result<PaginationState> {
        let request = self.session.borrow_mut().retry();
        match request {
            Some(request) => self.run_page(request).await,
            None => Ok(self.state()),
        }
    }

    /// 失敗したページ取得を諦める
    pub fn abandon(&self) -> PaginationState {
        self.session.borrow_mut().abandon()
    }

    /// ページ要求を実行して結果を反映
    pub async fn run_page(&self, request: PageRequest) -> Result<PaginationState> {
        let result = self.client.fetch_page(&request.query, request.cursor).await;

        match result {
            Ok(page) => {
                let added = page.len();
                let applied = self.session.borrow_mut().apply_page(request.ticket, page);
                if let Applied::Current(state) = applied {
                    log::info!(
                        "{:?} page: {} posts (has_more={})",
                        request.kind,
                        added,
                        state.has_more
                    );
                    self.push_event(SearchEvent::PageLoaded {
                        kind: request.kind,
                        added,
                        state,
                    });
                }
                Ok(self.state())
            }
            Err(e) => {
                let applied = self.session.borrow_mut().fail_page(request.ticket);
                if applied.is_stale() {
                    log::debug!("Ignoring failure of superseded request: {}", e);
                    return Ok(self.state());
                }
                log::error!(
                    "Failed to load {:?} page at cursor {}: {}",
                    request.kind,
                    request.cursor,
                    e
                );
                self.push_event(SearchEvent::PageFailed {
                    kind: request.kind,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// 件数要求を実行して結果を反映
    pub async fn run_count(&self, request: CountRequest) -> Result<Option<CountStats>> {
        let result = self.client.fetch_count(&request.query, request.cursor).await;

        match result {
            Ok(stats) => {
                let applied = self.session.borrow_mut().apply_count(request.generation, stats);
                if let Applied::Current(count) = applied {
                    self.push_event(SearchEvent::CountLoaded { count });
                }
                Ok(applied.current())
            }
            Err(e) => {
                if request.generation != self.session.borrow().generation() {
                    return Ok(None);
                }
                log::warn!("Failed to load count: {}", e);
                self.push_event(SearchEvent::CountFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// UIイベントをポーリング
    pub fn poll_events(&self, max: u32) -> Vec<SearchEvent> {
        let mut buffer = self.event_buffer.borrow_mut();
        let n = buffer.len().min(max as usize);
        buffer.drain(..n).collect()
    }

    pub fn state(&self) -> PaginationState {
        self.session.borrow().state()
    }

    pub fn phase(&self) -> Phase {
        self.session.borrow().phase()
    }

    pub fn is_searching(&self) -> bool {
        self.session.borrow().is_searching()
    }

    pub fn cursor(&self) -> Cursor {
        self.session.borrow().cursor()
    }

    pub fn count(&self) -> Option<CountStats> {
        self.session.borrow().count()
    }

    pub fn query(&self) -> Option<SearchQuery> {
        self.session.borrow().query().cloned()
    }

    /// 取得済みの結果（借用中は検索操作を呼ばないこと）
    pub fn results(&self) -> Ref<'_, ResultSet> {
        Ref::map(self.session.borrow(), |s| s.results())
    }

    fn push_event(&self, event: SearchEvent) {
        let mut buffer = self.event_buffer.borrow_mut();
        if buffer.len() >= EVENT_BUFFER_LIMIT {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use crate::query::Endpoint;

    fn posts(nos: impl IntoIterator<Item = i32>) -> Vec<Post> {
        nos.into_iter()
            .map(|no| Post {
                no,
                ..Post::default()
            })
            .collect()
    }

    fn handle(mock: &MockFetcher, page_limit: Option<usize>) -> SearchHandle {
        let config = SearchConfig {
            base_url: "http://localhost:8080".to_string(),
            page_limit,
            ..SearchConfig::default()
        };
        SearchHandle::new(config, Arc::new(mock.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_load_more() {
        let mock = MockFetcher::new();
        mock.push_page(&posts((4901..=5000).rev()));
        mock.push_count(CountStats { total_res_count: 140, unique_id_count: 12 });
        mock.push_page(&posts((4861..=4900).rev()));

        let h = handle(&mock, Some(100));
        let outcome = h.submit(SearchQuery::default()).await.unwrap();
        assert_eq!(outcome.state, PaginationState { has_more: true, is_loading: false });
        let stats = CountStats { total_res_count: 140, unique_id_count: 12 };
        assert_eq!(outcome.count, Ok(Some(stats)));
        assert_eq!(h.cursor().value(), 4901);

        let state = h.load_more().await.unwrap();
        assert!(!state.has_more);
        assert_eq!(h.results().len(), 140);
        assert_eq!(h.cursor().value(), 4861);

        // 終端後は要求しない
        let state = h.load_more().await.unwrap();
        assert!(!state.has_more);
        assert_eq!(mock.cursors(Endpoint::Search), vec![i32::MAX, 4901]);
        assert_eq!(mock.cursors(Endpoint::Count), vec![i32::MAX]);
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let mock = MockFetcher::new();
        mock.push_page(&posts([3, 2]));
        mock.push_failure(Endpoint::Count, "HTTP 500");

        let h = handle(&mock, Some(100));
        let outcome = h.submit(SearchQuery::default()).await.unwrap();
        assert!(outcome.count.is_err());
        assert_eq!(h.count(), None);

        let events = h.poll_events(10);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SearchEvent::Reset { generation: 1 });
        assert!(matches!(
            events[1],
            SearchEvent::PageLoaded { kind: LoadKind::Initial, added: 2, .. }
        ));
        assert!(matches!(events[2], SearchEvent::CountFailed { .. }));
        assert!(h.poll_events(10).is_empty());
    }

    #[tokio::test]
    async fn test_page_failure_then_retry() {
        let mock = MockFetcher::new();
        mock.push_page(&posts([1, 2]));
        mock.push_count(CountStats::default());
        mock.push_failure(Endpoint::Search, "connection reset");
        mock.push_page(&posts([3]));

        let h = handle(&mock, Some(2));
        h.submit(SearchQuery { ascending: true, ..SearchQuery::default() }).await.unwrap();

        let err = h.load_more().await.unwrap_err();
        assert_eq!(err, CoreError::FetchFailed("connection reset".to_string()));
        assert_eq!(h.cursor().value(), 2);
        assert_eq!(h.results().len(), 2);
        assert_eq!(h.phase(), Phase::Stalled(LoadKind::More));

        // 失敗中は load_more しても新しい要求を出さない
        h.load_more().await.unwrap();
        assert_eq!(mock.cursors(Endpoint::Search), vec![0, 2]);

        let state = h.retry().await.unwrap();
        assert!(!state.has_more);
        assert_eq!(mock.cursors(Endpoint::Search), vec![0, 2, 2]);
        let nos: Vec<i32> = h.results().iter().map(|p| p.no).collect();
        assert_eq!(nos, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_initial_failure_is_returned() {
        let mock = MockFetcher::new();
        mock.push_body(Endpoint::Search, "not json");
        mock.push_count(CountStats { total_res_count: 5, unique_id_count: 1 });

        let h = handle(&mock, Some(100));
        let err = h.submit(SearchQuery::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::FetchFailed(_)));
        assert_eq!(h.cursor(), Cursor::DESCENDING_START);
        assert!(h.state().is_loading);
        assert!(!h.is_searching());
        // 件数は検索単位なので反映される
        assert_eq!(h.count().map(|c| c.total_res_count), Some(5));

        assert_eq!(h.abandon(), PaginationState::default());
    }

    #[tokio::test]
    async fn test_count_of_superseded_search_is_discarded() {
        let mock = MockFetcher::new();
        let gate = mock.hold(Endpoint::Count);
        mock.push_page(&posts([10]));
        mock.push_count(CountStats { total_res_count: 1, unique_id_count: 1 });
        mock.push_page(&posts([20]));
        mock.push_count(CountStats { total_res_count: 2, unique_id_count: 2 });

        let h = handle(&mock, Some(100));
        let q1 = SearchQuery::with_main_text("q1");
        let q2 = SearchQuery::with_main_text("q2");

        let first = h.submit(q1);
        let second = async {
            // Q1の初回ページが届くまで待つ
            while h.results().is_empty() {
                tokio::task::yield_now().await;
            }
            h.submit(q2).await
        };
        let release = async {
            while h.query().map(|q| q.main_text) != Some("q2".to_string()) {
                tokio::task::yield_now().await;
            }
            assert_eq!(h.count(), None);
            gate.add_permits(2);
        };

        let (first, second, ()) = tokio::join!(first, second, release);
        assert_eq!(first.unwrap().count, Ok(None));
        assert_eq!(
            second.unwrap().count,
            Ok(Some(CountStats { total_res_count: 2, unique_id_count: 2 }))
        );
        assert_eq!(h.count(), Some(CountStats { total_res_count: 2, unique_id_count: 2 }));
        let nos: Vec<i32> = h.results().iter().map(|p| p.no).collect();
        assert_eq!(nos, vec![20]);
    }

    #[tokio::test]
    async fn test_unpolled_events_stay_bounded() {
        let mock = MockFetcher::new();
        for _ in 0..3 {
            mock.push_page(&posts([1]));
            mock.push_count(CountStats::default());
        }

        let h = handle(&mock, Some(100));
        for _ in 0..3 {
            h.submit(SearchQuery::default()).await.unwrap();
        }
        // 最後の検索のイベントだけが残る
        let events = h.poll_events(u32::MAX);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SearchEvent::Reset { generation: 3 });

        for i in 0..(EVENT_BUFFER_LIMIT + 10) {
            h.push_event(SearchEvent::CountFailed { message: i.to_string() });
        }
        let events = h.poll_events(u32::MAX);
        assert_eq!(events.len(), EVENT_BUFFER_LIMIT);
        assert_eq!(events[0], SearchEvent::CountFailed { message: "10".to_string() });
    }

    #[tokio::test]
    async fn test_page_missing_no_leaves_cursor() {
        let mock = MockFetcher::new();
        mock.push_page(&posts([4, 5]));
        mock.push_count(CountStats::default());
        mock.push_body(Endpoint::Search, r#"[{"no": 6}, {"id": "x"}]"#);

        let h = handle(&mock, Some(2));
        h.submit(SearchQuery { ascending: true, ..SearchQuery::default() }).await.unwrap();
        assert_eq!(h.cursor().value(), 5);

        let err = h.load_more().await.unwrap_err();
        assert!(matches!(err, CoreError::FetchFailed(_)));
        assert_eq!(h.cursor().value(), 5);
        assert_eq!(h.results().len(), 2);
        assert_eq!(h.phase(), Phase::Stalled(LoadKind::More));
        assert_eq!(mock.cursors(Endpoint::Search), vec![0, 5]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfig {
            base_url: "::".to_string(),
            ..SearchConfig::default()
        };
        assert!(SearchHandle::new(config, Arc::new(MockFetcher::new())).is_err());
    }
}
