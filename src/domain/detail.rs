use serde::{Deserialize, Serialize};

/// Everything read from one post's detail overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteDetail {
    pub title: String,
    pub description: String,
    pub publish_time: String,
    pub publish_location: Option<String>,
    pub comments: Vec<CommentNode>,
    pub images: Vec<String>,
    /// Downloaded copies of `images`, filled in at delivery time
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<LocalMedia>,
}

/// A remote image saved to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalMedia {
    pub url: String,
    pub path: String,
}

impl NoteDetail {
    /// Number of comments including replies
    pub fn comment_count(&self) -> usize {
        self.comments.iter().map(|c| 1 + c.replies.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentAuthor {
    pub user_id: String,
    pub nickname: String,
    pub profile_link: String,
}

/// A comment in a thread.
///
/// Only one level of nesting exists: a top-level comment may own replies,
/// replies never own replies of their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentNode {
    pub id: String,
    pub author: CommentAuthor,
    pub text: String,
    pub likes: String,
    pub time: String,
    pub location: Option<String>,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// A reply; it can't own replies of its own
    pub fn reply(id: impl Into<String>, author: CommentAuthor, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach replies to a top-level comment, flattening anything nested below them.
    pub fn with_replies(mut self, replies: Vec<CommentNode>) -> Self {
        self.replies = replies
            .into_iter()
            .flat_map(|mut reply| {
                let nested = std::mem::take(&mut reply.replies);
                std::iter::once(reply).chain(nested)
            })
            .collect();
        self
    }

    pub fn is_reply_free(&self) -> bool {
        self.replies.is_empty()
    }
}
