use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("JavaScript error: {0}")]
    JsError(String),

    /// 通信失敗・非2xx・JSON不正をまとめたもの（同じ操作で再試行可能）
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// 任意のエラーをFetchFailedに寄せる
    pub fn into_fetch_failed(self) -> Self {
        match self {
            CoreError::FetchFailed(_) => self,
            other => CoreError::FetchFailed(other.to_string()),
        }
    }
}

impl From<JsValue> for CoreError {
    fn from(value: JsValue) -> Self {
        if let Some(s) = value.as_string() {
            CoreError::JsError(s)
        } else {
            CoreError::JsError(format!("{:?}", value))
        }
    }
}

impl From<CoreError> for JsValue {
    fn from(error: CoreError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::ParseError(error.to_string())
    }
}

impl From<url::ParseError> for CoreError {
    fn from(error: url::ParseError) -> Self {
        CoreError::InvalidConfig(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
