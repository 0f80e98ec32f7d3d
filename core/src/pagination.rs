//! カーソル方式のページング状態機械
//!
//! 状態遷移はすべてこのモジュールのメソッド経由で行う。
//! 通信はしない（`PageRequest` / `CountRequest` を返すだけ）ので、
//! 呼び出し側が取得結果を `apply_*` / `fail_page` で戻す。

use serde::Serialize;

use crate::results::ResultSet;
use crate::types::{CountStats, Cursor, PaginationState, Post, SearchQuery};

/// ページ取得の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    Initial,
    More,
}

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// まだ検索していない
    Idle,
    /// ページ取得中
    Loading(LoadKind),
    /// 取得失敗。再試行か中止を待っている
    Stalled(LoadKind),
    /// 続きを読める
    Ready,
    /// この検索ではもう続きが無い
    Exhausted,
}

/// 応答を要求に対応付けるための札
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub seq: u64,
}

/// ページ取得要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub ticket: Ticket,
    pub kind: LoadKind,
    pub query: SearchQuery,
    pub cursor: Cursor,
}

/// 件数取得要求（初期カーソルで1回だけ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRequest {
    pub generation: u64,
    pub query: SearchQuery,
    pub cursor: Cursor,
}

/// 応答を反映した結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied<T> {
    /// 現在の検索に反映した
    Current(T),
    /// 古い検索・中止済み要求への応答なので捨てた
    Stale,
}

impl<T> Applied<T> {
    pub fn current(self) -> Option<T> {
        match self {
            Applied::Current(value) => Some(value),
            Applied::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Applied::Stale)
    }
}

/// 1回の検索のページング状態
pub struct SearchSession {
    page_limit: Option<usize>,
    generation: u64,
    next_seq: u64,
    query: Option<SearchQuery>,
    cursor: Cursor,
    results: ResultSet,
    phase: Phase,
    has_more: bool,
    pending: Option<PageRequest>,
    count: Option<CountStats>,
}

impl SearchSession {
    /// `page_limit` が `None` なら、空ページが返るまで続きがあるとみなす
    pub fn new(page_limit: Option<usize>) -> Self {
        Self {
            page_limit,
            generation: 0,
            next_seq: 0,
            query: None,
            cursor: Cursor::DESCENDING_START,
            results: ResultSet::new(),
            phase: Phase::Idle,
            has_more: false,
            pending: None,
            count: None,
        }
    }

    /// 新しい検索を開始
    ///
    /// カーソル・結果・件数をリセットし、初回ページと件数の要求を返す。
    pub fn submit(&mut self, query: SearchQuery) -> (PageRequest, CountRequest) {
        self.generation += 1;
        self.cursor = query.initial_cursor();
        self.results.clear();
        self.count = None;
        self.has_more = false;
        self.query = Some(query.clone());

        let count_req = CountRequest {
            generation: self.generation,
            query: query.clone(),
            cursor: self.cursor,
        };
        let page_req = self.issue(LoadKind::Initial, query);

        log::debug!(
            "search #{} submitted (ascending={}, cursor={})",
            self.generation,
            page_req.query.ascending,
            self.cursor
        );

        (page_req, count_req)
    }

    /// 続きの取得要求
    ///
    /// 続きが無い・取得中・失敗後の場合は `None`（何もしない）。
    pub fn request_more(&mut self) -> Option<PageRequest> {
        if self.phase != Phase::Ready || !self.has_more {
            return None;
        }
        let query = self.query.clone()?;
        Some(self.issue(LoadKind::More, query))
    }

    /// 失敗した要求を同じカーソルで再発行
    pub fn retry(&mut self) -> Option<PageRequest> {
        let Phase::Stalled(kind) = self.phase else {
            return None;
        };
        let query = self.query.clone()?;
        log::info!("retrying {:?} page at cursor {}", kind, self.cursor);
        Some(self.issue(kind, query))
    }

    /// 取得中・失敗中の要求を諦める
    ///
    /// 初回取得なら検索自体を終了、追加取得なら元の状態に戻す。
    pub fn abandon(&mut self) -> PaginationState {
        let kind = match self.phase {
            Phase::Loading(kind) | Phase::Stalled(kind) => kind,
            _ => return self.state(),
        };
        self.pending = None;
        self.phase = match kind {
            LoadKind::Initial => {
                self.has_more = false;
                Phase::Exhausted
            }
            LoadKind::More => Phase::Ready,
        };
        self.state()
    }

    /// ページ取得成功を反映
    pub fn apply_page(&mut self, ticket: Ticket, page: Vec<Post>) -> Applied<PaginationState> {
        let Some(request) = self.take_pending(ticket) else {
            log::debug!("dropping stale page response {:?}", ticket);
            return Applied::Stale;
        };

        // 空ページでは末尾を参照しない
        match page.last() {
            None => {
                self.has_more = false;
            }
            Some(last) => {
                self.cursor = Cursor::after(last);
                self.has_more = self.is_full_page(page.len());
                self.results.append(page);
            }
        }
        self.phase = if self.has_more { Phase::Ready } else { Phase::Exhausted };

        log::debug!(
            "{:?} page applied: total={}, cursor={}, has_more={}",
            request.kind,
            self.results.len(),
            self.cursor,
            self.has_more
        );
        Applied::Current(self.state())
    }

    /// ページ取得失敗を反映（カーソルと has_more は変えない）
    pub fn fail_page(&mut self, ticket: Ticket) -> Applied<PaginationState> {
        match &self.pending {
            Some(request) if request.ticket == ticket => {
                self.phase = Phase::Stalled(request.kind);
                Applied::Current(self.state())
            }
            _ => Applied::Stale,
        }
    }

    /// 件数取得成功を反映
    pub fn apply_count(&mut self, generation: u64, stats: CountStats) -> Applied<CountStats> {
        if generation != self.generation {
            log::debug!("dropping count for superseded search #{}", generation);
            return Applied::Stale;
        }
        self.count = Some(stats);
        Applied::Current(stats)
    }

    pub fn state(&self) -> PaginationState {
        PaginationState {
            has_more: self.has_more,
            is_loading: matches!(self.phase, Phase::Loading(_) | Phase::Stalled(_)),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 初回ページを待っている間だけ true（検索ボタンの無効化用）
    pub fn is_searching(&self) -> bool {
        self.phase == Phase::Loading(LoadKind::Initial)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn count(&self) -> Option<CountStats> {
        self.count
    }

    fn issue(&mut self, kind: LoadKind, query: SearchQuery) -> PageRequest {
        self.next_seq += 1;
        let request = PageRequest {
            ticket: Ticket {
                generation: self.generation,
                seq: self.next_seq,
            },
            kind,
            query,
            cursor: self.cursor,
        };
        self.phase = Phase::Loading(kind);
        self.pending = Some(request.clone());
        request
    }

    fn take_pending(&mut self, ticket: Ticket) -> Option<PageRequest> {
        match &self.pending {
            Some(request)
                if request.ticket == ticket && self.phase == Phase::Loading(request.kind) =>
            {
                self.pending.take()
            }
            _ => None,
        }
    }

    fn is_full_page(&self, len: usize) -> bool {
        match self.page_limit {
            Some(limit) => len == limit,
            None => len > 0,
        }
    }
}
