use url::form_urlencoded;

use crate::config::SearchConfig;
use crate::types::{Cursor, SearchQuery};

/// 検索APIのエンドポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Count,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Search => "search",
            Endpoint::Count => "search/count",
        }
    }
}

/// 検索条件とカーソルをクエリ文字列に変換
///
/// 空文字の項目も省略しない（サーバー側で無条件扱い）。
pub fn encode_params(query: &SearchQuery, cursor: Cursor, oekaki: bool) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("id", &query.id)
        .append_pair("main_text", &query.main_text)
        .append_pair("name_and_trip", &query.name_and_trip)
        .append_pair("cursor", &cursor.to_string())
        .append_pair("ascending", bool_token(query.ascending))
        .append_pair("since", &query.since)
        .append_pair("until", &query.until)
        .append_pair("oekaki", bool_token(oekaki))
        .finish()
}

/// リクエストURLを組み立てる
pub fn request_url(
    config: &SearchConfig,
    endpoint: Endpoint,
    query: &SearchQuery,
    cursor: Cursor,
) -> String {
    format!(
        "{}/api/v1/{}?{}",
        config.base(),
        endpoint.path(),
        encode_params(query, cursor, config.oekaki)
    )
}

/// アドレスバーに載せる検索条件（カーソルは含めない）
pub fn location_query(query: &SearchQuery) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("id", &query.id)
        .append_pair("main_text", &query.main_text)
        .append_pair("name_and_trip", &query.name_and_trip)
        .append_pair("ascending", bool_token(query.ascending))
        .append_pair("since", &query.since)
        .append_pair("until", &query.until)
        .finish()
}

/// アドレスバーのクエリ文字列から検索条件を復元
///
/// クエリ文字列が空なら `None`（自動検索しない）。
pub fn parse_location_query(search: &str) -> Option<SearchQuery> {
    let search = search.strip_prefix('?').unwrap_or(search);
    if search.is_empty() {
        return None;
    }

    let mut query = SearchQuery::default();
    for (key, value) in form_urlencoded::parse(search.as_bytes()) {
        match key.as_ref() {
            "id" => query.id = value.into_owned(),
            "main_text" => query.main_text = value.into_owned(),
            "name_and_trip" => query.name_and_trip = value.into_owned(),
            "since" => query.since = value.into_owned(),
            "until" => query.until = value.into_owned(),
            "ascending" => query.ascending = value == "true",
            _ => {}
        }
    }
    Some(query)
}

fn bool_token(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
