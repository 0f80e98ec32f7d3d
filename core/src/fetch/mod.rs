pub mod web;
pub mod mock;

use async_trait::async_trait;
use crate::error::Result;

/// HTTP GETの抽象trait
///
/// ブラウザでは `fetch`、テストではモックを使う。
/// WASM環境ではシングルスレッドのため、Send + Sync要件なし
#[async_trait(?Send)]
pub trait Fetcher {
    /// URLを取得して本文を返す（非2xxはエラー）
    async fn get_text(&self, url: &str) -> Result<String>;
}
