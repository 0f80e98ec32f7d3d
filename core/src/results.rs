use crate::types::Post;

/// 取得済みページを到着順に連結したもの
///
/// 追記のみ。並べ替えや重複除去はしない。
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    posts: Vec<Post>,
    pages: usize,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// ページを末尾に追加
    pub fn append(&mut self, page: Vec<Post>) {
        if page.is_empty() {
            return;
        }
        self.posts.extend(page);
        self.pages += 1;
    }

    /// 新しい検索のためにクリア
    pub fn clear(&mut self) {
        self.posts.clear();
        self.pages = 0;
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// 追加済みの（空でない）ページ数
    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn as_slice(&self) -> &[Post] {
        &self.posts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.posts.iter()
    }

    pub fn last(&self) -> Option<&Post> {
        self.posts.last()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Post;
    type IntoIter = std::slice::Iter<'a, Post>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
