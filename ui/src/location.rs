use wasm_bindgen::JsValue;

use ressearch_core::query::{location_query, parse_location_query};
use ressearch_core::SearchQuery;

/// アドレスバーの検索条件を読む（無ければ `None`）
pub fn read_query() -> Option<SearchQuery> {
    let search = web_sys::window()?.location().search().ok()?;
    parse_location_query(&search)
}

/// 検索条件をアドレスバーに反映（履歴に積む）
pub fn write_query(query: &SearchQuery) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let path = window.location().pathname()?;
    let url = format!("{}?{}", path, location_query(query));
    window
        .history()?
        .push_state_with_url(&JsValue::NULL, "", Some(&url))?;
    Ok(())
}
