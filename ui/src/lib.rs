mod location;
mod view;

pub use view::{OekakiView, PostView, ResLink, Snapshot};

use std::rc::Rc;
use std::sync::Arc;

use js_sys::Promise;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use ressearch_core::fetch::web::WebFetcher;
use ressearch_core::{SearchConfig, SearchHandle, SearchQuery};

/// WASM初期化とパニックフック設定
#[wasm_bindgen(start)]
pub fn start() {
    // パニック時にコンソールにスタックトレースを表示
    console_error_panic_hook::set_once();

    // ログ設定
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");

    log::info!("Res search WASM initialized");
}

/// 検索ページとのブリッジ
///
/// 描画はJS側が行い、ここは状態を渡すだけ。
#[wasm_bindgen]
pub struct SearchApp {
    handle: Rc<SearchHandle>,
}

#[wasm_bindgen]
impl SearchApp {
    /// 設定JSONから作成（省略時はデフォルト設定）
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SearchApp, JsValue> {
        let config = match config_json {
            Some(json) => SearchConfig::from_json(&json)?,
            None => SearchConfig::default(),
        };
        log::info!("Search app: base_url={}, oekaki={}", config.base_url, config.oekaki);

        let fetcher = Arc::new(WebFetcher::new(config.timeout_ms));
        let handle = SearchHandle::new(config, fetcher)?;
        Ok(Self {
            handle: Rc::new(handle),
        })
    }

    /// フォームの初期値（アドレスバーに条件があればそれ）
    pub fn initial_query(&self) -> Result<JsValue, JsValue> {
        let query = location::read_query().unwrap_or_default();
        to_js(&query)
    }

    /// アドレスバーに条件があれば自動で検索する
    pub fn restore_from_location(&self) -> Option<Promise> {
        let query = location::read_query()?;
        log::info!("Restoring search from location");
        Some(self.spawn_submit(query))
    }

    /// 検索を送信（条件はアドレスバーにも反映）
    pub fn submit(&self, query: JsValue) -> Result<Promise, JsValue> {
        let query: SearchQuery = serde_wasm_bindgen::from_value(query)?;
        if let Err(e) = location::write_query(&query) {
            log::warn!("Failed to update location: {:?}", e);
        }
        Ok(self.spawn_submit(query))
    }

    /// 無限スクロールから呼ばれる
    pub fn load_more(&self) -> Promise {
        let handle = self.handle.clone();
        future_to_promise(async move {
            let state = handle.load_more().await?;
            to_js(&state)
        })
    }

    pub fn retry(&self) -> Promise {
        let handle = self.handle.clone();
        future_to_promise(async move {
            let state = handle.retry().await?;
            to_js(&state)
        })
    }

    pub fn abandon(&self) -> Result<JsValue, JsValue> {
        to_js(&self.handle.abandon())
    }

    /// 前回以降のイベント
    pub fn poll_events(&self, max: u32) -> Result<JsValue, JsValue> {
        to_js(&self.handle.poll_events(max))
    }

    /// `offset` 件目以降の表示用レス
    pub fn posts(&self, offset: usize) -> Result<JsValue, JsValue> {
        to_js(&view::posts_from(&self.handle, offset))
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&Snapshot::of(&self.handle))
    }
}

impl SearchApp {
    fn spawn_submit(&self, query: SearchQuery) -> Promise {
        let handle = self.handle.clone();
        future_to_promise(async move {
            let outcome = handle.submit(query).await?;
            if let Err(e) = &outcome.count {
                log::warn!("Count unavailable: {}", e);
            }
            to_js(&outcome.state)
        })
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}
