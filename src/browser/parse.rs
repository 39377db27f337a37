//! Conversion of raw page output into domain records.

use serde::Deserialize;

use crate::domain::{CommentAuthor, CommentNode, NoteDetail, ProfileStats, ProfileSummary};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNote {
    /// False when the container vanished before extraction
    pub found: bool,
    pub title: String,
    pub description: String,
    pub date_text: String,
    pub images: Vec<String>,
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawComment {
    pub id: String,
    pub nickname: String,
    pub user_id: String,
    pub user_link: String,
    pub avatar_user_id: String,
    pub content: String,
    pub likes: String,
    pub date_text: String,
    pub location_text: String,
    pub replies: Vec<RawComment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawProfile {
    pub path: String,
    pub nickname: String,
    pub site_id_text: String,
    pub ip_text: String,
    pub description: String,
    pub stats: Vec<String>,
}

impl RawNote {
    pub fn into_detail(self) -> NoteDetail {
        let (publish_time, publish_location) = split_publish_stamp(&self.date_text);
        NoteDetail {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            publish_time,
            publish_location,
            comments: self.comments.into_iter().map(RawComment::into_node).collect(),
            images: self.images.into_iter().filter(|src| !src.is_empty()).collect(),
            media: Vec::new(),
        }
    }
}

impl RawComment {
    pub fn into_node(self) -> CommentNode {
        let (time, location) = split_comment_stamp(&self.date_text, &self.location_text);
        let user_id = [
            non_empty(&self.user_id),
            user_id_from_link(&self.user_link),
            non_empty(&self.avatar_user_id),
        ]
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_default();

        let likes = match self.likes.trim() {
            "" => "0".to_string(),
            likes => likes.to_string(),
        };

        let replies = self.replies.into_iter().map(RawComment::into_node).collect();

        CommentNode {
            id: self.id,
            author: CommentAuthor {
                user_id,
                nickname: self.nickname.trim().to_string(),
                profile_link: self.user_link,
            },
            text: self.content.trim().to_string(),
            likes,
            time,
            location,
            replies: Vec::new(),
        }
        .with_replies(replies)
    }
}

impl RawProfile {
    pub fn into_summary(self, ip_prefixes: &[String], site_id_prefixes: &[String]) -> ProfileSummary {
        let unique_id = self
            .path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        let ip = strip_label_prefixes(&self.ip_text, ip_prefixes);
        let mut stats = self.stats.into_iter().map(|s| non_empty(&s));

        ProfileSummary {
            unique_id,
            nickname: self.nickname.trim().to_string(),
            site_id: strip_label_prefixes(&self.site_id_text, site_id_prefixes),
            ip_location: (!ip.is_empty()).then_some(ip),
            description: self.description.trim().to_string(),
            stats: ProfileStats {
                follows: stats.next().flatten(),
                fans: stats.next().flatten(),
                likes_and_collects: stats.next().flatten(),
            },
        }
    }
}

/// Split a note's "time location" stamp.
///
/// The last space-separated part is a location only when it looks like
/// neither a clock time nor a date.
pub fn split_publish_stamp(text: &str) -> (String, Option<String>) {
    let text = text.trim();
    match text.rsplit_once(' ') {
        Some((time, last)) if !last.contains(':') && !last.contains('-') && !last.is_empty() => {
            (time.trim().to_string(), Some(last.to_string()))
        }
        _ => (text.to_string(), None),
    }
}

/// Split a comment's stamp, preferring an explicit location span.
pub fn split_comment_stamp(text: &str, location: &str) -> (String, Option<String>) {
    let text = text.trim();
    let location = location.trim();

    if !location.is_empty() {
        let time = text.replacen(location, "", 1).trim().to_string();
        return (time, Some(location.to_string()));
    }

    match text.rsplit_once(' ') {
        Some((time, last)) if !last.is_empty() && !last.chars().any(|c| c.is_ascii_digit()) => {
            (time.trim().to_string(), Some(last.to_string()))
        }
        _ => (text.to_string(), None),
    }
}

/// User id from a `/user/profile/<id>` link
pub fn user_id_from_link(link: &str) -> Option<String> {
    let (_, rest) = link.split_once("/user/profile/")?;
    let id: String = rest.chars().take_while(char::is_ascii_alphanumeric).collect();
    (!id.is_empty()).then_some(id)
}

pub fn strip_label_prefixes(text: &str, prefixes: &[String]) -> String {
    let mut text = text.trim();
    for prefix in prefixes {
        if let Some(rest) = text.strip_prefix(prefix.as_str()) {
            text = rest.trim_start();
        }
    }
    text.trim().to_string()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_stamp_with_location() {
        assert_eq!(
            split_publish_stamp("2024-05-01 上海"),
            ("2024-05-01".to_string(), Some("上海".to_string()))
        );
    }

    #[test]
    fn test_publish_stamp_without_location() {
        assert_eq!(split_publish_stamp("05-01 12:30"), ("05-01 12:30".to_string(), None));
        assert_eq!(split_publish_stamp("3天前"), ("3天前".to_string(), None));
        assert_eq!(split_publish_stamp(""), (String::new(), None));
    }

    #[test]
    fn test_comment_stamp_prefers_location_span() {
        assert_eq!(
            split_comment_stamp("昨天 14:02 广东", "广东"),
            ("昨天 14:02".to_string(), Some("广东".to_string()))
        );
    }

    #[test]
    fn test_comment_stamp_fallback_rejects_digits() {
        assert_eq!(
            split_comment_stamp("05-01 北京", ""),
            ("05-01".to_string(), Some("北京".to_string()))
        );
        assert_eq!(split_comment_stamp("05-01 12:00", ""), ("05-01 12:00".to_string(), None));
    }

    #[test]
    fn test_user_id_from_link() {
        assert_eq!(
            user_id_from_link("https://www.xiaohongshu.com/user/profile/5f1a2b?xsec=1"),
            Some("5f1a2b".to_string())
        );
        assert_eq!(user_id_from_link("https://example.com/other"), None);
    }

    #[test]
    fn test_comment_author_id_fallbacks() {
        let raw = RawComment {
            user_link: "/user/profile/abc123".to_string(),
            avatar_user_id: "avatar".to_string(),
            ..Default::default()
        };
        let node = raw.into_node();
        assert_eq!(node.author.user_id, "abc123");
        assert_eq!(node.likes, "0");

        let raw = RawComment {
            avatar_user_id: "avatar".to_string(),
            ..Default::default()
        };
        assert_eq!(raw.into_node().author.user_id, "avatar");
    }

    #[test]
    fn test_nested_replies_are_flattened() {
        let raw: RawNote = serde_json::from_value(serde_json::json!({
            "title": " Title ",
            "date_text": "2024-05-01 上海",
            "comments": [{
                "id": "p",
                "replies": [{"id": "r1", "replies": [{"id": "r1a"}]}]
            }]
        }))
        .unwrap();

        let detail = raw.into_detail();
        assert_eq!(detail.title, "Title");
        assert_eq!(detail.publish_location.as_deref(), Some("上海"));
        let ids: Vec<_> = detail.comments[0].replies.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r1a"]);
    }

    #[test]
    fn test_profile_summary() {
        let raw = RawProfile {
            path: "/user/profile/60ab12".to_string(),
            nickname: " Alice ".to_string(),
            site_id_text: "小红书号：12345".to_string(),
            ip_text: "IP属地：浙江".to_string(),
            description: "hi".to_string(),
            stats: vec!["10 关注".to_string(), "20 粉丝".to_string()],
        };
        let summary = raw.into_summary(
            &["IP属地：".to_string(), "IP属地:".to_string()],
            &["小红书号：".to_string()],
        );

        assert_eq!(summary.unique_id, "60ab12");
        assert_eq!(summary.nickname, "Alice");
        assert_eq!(summary.site_id, "12345");
        assert_eq!(summary.ip_location.as_deref(), Some("浙江"));
        assert_eq!(summary.stats.fans.as_deref(), Some("20 粉丝"));
        assert_eq!(summary.stats.likes_and_collects, None);
    }
}
