use std::fmt;

use serde::{Deserialize, Serialize};

/// 検索条件（送信後は不変）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// 書き込みID（完全一致、空なら無条件）
    pub id: String,
    pub main_text: String,
    pub name_and_trip: String,
    /// YYYY-MM-DD、空なら無制限
    pub since: String,
    pub until: String,
    /// true: 古い順 / false: 新しい順
    pub ascending: bool,
}

impl SearchQuery {
    pub fn with_main_text(main_text: &str) -> Self {
        Self {
            main_text: main_text.to_string(),
            ..Self::default()
        }
    }

    /// この検索の初期カーソル
    pub fn initial_cursor(&self) -> Cursor {
        Cursor::initial(self.ascending)
    }
}

/// 次ページの境界となるレス番号
///
/// 昇順なら `no > cursor`、降順なら `no < cursor` のレスが次ページになる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor(i32);

impl Cursor {
    pub const ASCENDING_START: Cursor = Cursor(0);
    pub const DESCENDING_START: Cursor = Cursor(i32::MAX);

    pub fn initial(ascending: bool) -> Self {
        if ascending {
            Self::ASCENDING_START
        } else {
            Self::DESCENDING_START
        }
    }

    /// ページ末尾のレスから次のカーソルを作る
    pub fn after(post: &Post) -> Self {
        Cursor(post.no)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// レス（検索APIの1件）
///
/// `no` はカーソルになるので必須。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub no: i32,
    #[serde(default)]
    pub name_and_trip: String,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub datetime_text: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub main_text: String,
    /// サーバー側でサニタイズ済みのHTML
    #[serde(default)]
    pub main_text_html: String,
    #[serde(default)]
    pub oekaki_id: Option<i64>,
    #[serde(default)]
    pub oekaki_title: Option<String>,
    #[serde(default)]
    pub original_oekaki_res_no: Option<i32>,
}

impl Post {
    /// お絵描きレスならそのID
    pub fn oekaki(&self) -> Option<i64> {
        self.oekaki_id.filter(|id| *id != 0)
    }

    pub fn oekaki_title(&self) -> Option<&str> {
        self.oekaki_title.as_deref().filter(|t| !t.is_empty())
    }

    /// 元絵のレス番号
    pub fn original_oekaki_res_no(&self) -> Option<i32> {
        self.original_oekaki_res_no.filter(|no| *no != 0)
    }
}

/// 検索結果の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStats {
    pub total_res_count: u64,
    pub unique_id_count: u64,
}

/// ページ取得状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub has_more: bool,
    pub is_loading: bool,
}
