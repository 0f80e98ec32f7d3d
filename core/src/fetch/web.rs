use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, RequestMode, Response, Window};

use super::Fetcher;
use crate::error::{CoreError, Result};

/// ブラウザの `fetch` を使う実装
pub struct WebFetcher {
    timeout_ms: Option<u32>,
}

impl WebFetcher {
    pub fn new(timeout_ms: Option<u32>) -> Self {
        Self { timeout_ms }
    }
}

#[async_trait(?Send)]
impl Fetcher for WebFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        let window =
            web_sys::window().ok_or_else(|| CoreError::Other("No window object".to_string()))?;

        let controller = AbortController::new()?;
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);
        opts.set_signal(Some(&controller.signal()));

        let request = Request::new_with_str_and_init(url, &opts)?;

        // 応答を受け取るまでタイマーを保持する
        let _timeout = match self.timeout_ms {
            Some(ms) => Some(AbortTimer::start(&window, &controller, ms)?),
            None => None,
        };

        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| CoreError::FetchFailed(format!("{} ({})", js_message(&e), url)))?;
        let response: Response = value.dyn_into()?;

        if !response.ok() {
            return Err(CoreError::FetchFailed(format!(
                "HTTP {} {} ({})",
                response.status(),
                response.status_text(),
                url
            )));
        }

        let body = JsFuture::from(response.text()?)
            .await
            .map_err(|e| CoreError::FetchFailed(js_message(&e)))?;
        body.as_string()
            .ok_or_else(|| CoreError::FetchFailed("Response body is not text".to_string()))
    }
}

/// 一定時間後にリクエストを中断するタイマー
struct AbortTimer {
    window: Window,
    handle: i32,
    // クロージャを保持してドロップされないようにする
    _on_timeout: Closure<dyn FnMut()>,
}

impl AbortTimer {
    fn start(window: &Window, controller: &AbortController, ms: u32) -> Result<Self> {
        let controller = controller.clone();
        let on_timeout = Closure::wrap(Box::new(move || {
            log::warn!("Request timed out after {}ms", ms);
            controller.abort();
        }) as Box<dyn FnMut()>);

        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            on_timeout.as_ref().unchecked_ref(),
            ms.min(i32::MAX as u32) as i32,
        )?;

        Ok(Self {
            window: window.clone(),
            handle,
            _on_timeout: on_timeout,
        })
    }
}

impl Drop for AbortTimer {
    fn drop(&mut self) {
        self.window.clear_timeout_with_handle(self.handle);
    }
}

/// JSのエラー値からメッセージを取り出す
fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
