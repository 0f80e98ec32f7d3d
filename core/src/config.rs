use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// 1ページあたりの件数（サーバー側の上限と一致させる）
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// ビルド時に `RESSEARCH_BASE_URL` が無ければこちら
const FALLBACK_BASE_URL: &str = "https://tk2-110-56213.vs.sakura.ne.jp";

const DEFAULT_BOARD_URL: &str = "https://dic.nicovideo.jp/b/c/ch2598430";

/// 検索クライアントの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// APIと画像のベースURL
    pub base_url: String,
    /// `None` なら無制限（空ページが返るまで続きを読む）
    pub page_limit: Option<usize>,
    /// お絵描きページ用の検索か
    pub oekaki: bool,
    /// 元掲示板のスレッドURL
    pub board_url: String,
    /// リクエストのタイムアウト（未指定なら無し）
    pub timeout_ms: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: option_env!("RESSEARCH_BASE_URL")
                .unwrap_or(FALLBACK_BASE_URL)
                .to_string(),
            page_limit: Some(DEFAULT_PAGE_LIMIT),
            oekaki: false,
            board_url: DEFAULT_BOARD_URL.to_string(),
            timeout_ms: None,
        }
    }
}

impl SearchConfig {
    /// お絵描きページ用の設定
    pub fn oekaki() -> Self {
        Self {
            oekaki: true,
            ..Self::default()
        }
    }

    /// JSONから読み込み（欠けている項目はデフォルト値）
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)?;
        Url::parse(&self.board_url)?;
        if self.page_limit == Some(0) {
            return Err(CoreError::InvalidConfig("page_limit must be positive".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(CoreError::InvalidConfig("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub(crate) fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
