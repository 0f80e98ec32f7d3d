use crate::config::SearchConfig;

/// 元掲示板の1ページあたりのレス数
const THREAD_PAGE_SIZE: i32 = 30;

/// レス番号が載っているページの先頭番号
pub fn thread_page_start(no: i32) -> i32 {
    (no - 1).div_euclid(THREAD_PAGE_SIZE) * THREAD_PAGE_SIZE + 1
}

/// 元掲示板上のレスへのリンク
pub fn thread_url(config: &SearchConfig, no: i32) -> String {
    format!(
        "{}/{}-#{}",
        config.board_url.trim_end_matches('/'),
        thread_page_start(no),
        no
    )
}

/// お絵描き画像のURL
pub fn image_url(config: &SearchConfig, oekaki_id: i64) -> String {
    format!("{}/images/{}.png", config.base(), oekaki_id)
}
