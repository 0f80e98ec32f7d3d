use serde::Serialize;

use ressearch_core::links::{image_url, thread_url};
use ressearch_core::{CountStats, PaginationState, Post, SearchConfig, SearchHandle};

/// レスへのリンク
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResLink {
    pub no: i32,
    pub url: String,
}

impl ResLink {
    fn new(config: &SearchConfig, no: i32) -> Self {
        Self {
            no,
            url: thread_url(config, no),
        }
    }
}

/// お絵描き部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OekakiView {
    pub image_url: String,
    pub title: Option<String>,
}

/// 表示用のレス（リンクは計算済み）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub link: ResLink,
    pub name_and_trip: String,
    pub datetime_text: String,
    pub id: String,
    /// サーバー側でサニタイズ済み。そのまま埋め込む
    pub main_text_html: String,
    pub oekaki: Option<OekakiView>,
    /// 元絵のレス
    pub original: Option<ResLink>,
}

impl PostView {
    pub fn new(config: &SearchConfig, post: &Post) -> Self {
        Self {
            link: ResLink::new(config, post.no),
            name_and_trip: post.name_and_trip.clone(),
            datetime_text: post.datetime_text.clone(),
            id: post.id.clone(),
            main_text_html: post.main_text_html.clone(),
            oekaki: post.oekaki().map(|oekaki_id| OekakiView {
                image_url: image_url(config, oekaki_id),
                title: post.oekaki_title().map(str::to_string),
            }),
            original: post.original_oekaki_res_no().map(|no| ResLink::new(config, no)),
        }
    }
}

/// 検索状態のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: PaginationState,
    pub is_searching: bool,
    pub count: Option<CountStats>,
    pub total: usize,
}

impl Snapshot {
    pub fn of(handle: &SearchHandle) -> Self {
        Self {
            state: handle.state(),
            is_searching: handle.is_searching(),
            count: handle.count(),
            total: handle.results().len(),
        }
    }
}

/// `offset` 件目以降の結果を表示用に変換
pub fn posts_from(handle: &SearchHandle, offset: usize) -> Vec<PostView> {
    let config = handle.config();
    handle
        .results()
        .iter()
        .skip(offset)
        .map(|post| PostView::new(config, post))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig {
            base_url: "https://mirror.example".to_string(),
            board_url: "https://board.example/b/c/ch1".to_string(),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_plain_post_view() {
        let post = Post {
            no: 45,
            name_and_trip: "名無し".to_string(),
            datetime_text: "2024/05/01(水) 12:00".to_string(),
            id: "AbCd".to_string(),
            main_text_html: "<br>".to_string(),
            ..Post::default()
        };
        let view = PostView::new(&config(), &post);
        let link = ResLink {
            no: 45,
            url: "https://board.example/b/c/ch1/31-#45".to_string(),
        };
        assert_eq!(view.link, link);
        assert_eq!(view.main_text_html, "<br>");
        assert_eq!(view.oekaki, None);
        assert_eq!(view.original, None);
    }

    #[test]
    fn test_oekaki_post_view() {
        let post = Post {
            no: 100,
            oekaki_id: Some(777),
            oekaki_title: Some(String::new()),
            original_oekaki_res_no: Some(61),
            ..Post::default()
        };
        let view = PostView::new(&config(), &post);
        assert_eq!(
            view.oekaki,
            Some(OekakiView {
                image_url: "https://mirror.example/images/777.png".to_string(),
                title: None,
            })
        );
        assert_eq!(
            view.original.map(|l| l.url),
            Some("https://board.example/b/c/ch1/61-#61".to_string())
        );
    }
}
