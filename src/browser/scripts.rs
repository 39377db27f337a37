use serde::Serialize;

use crate::browser::config::PageSelectors;
use crate::engine::{CloseAction, ScrollStep};

/// Attribute used to tag listed candidates so later calls can find them again
pub const HANDLE_ATTR: &str = "data-notecrawl-handle";

/// Builds the JavaScript snippets evaluated in the page.
///
/// Every snippet is a self-contained expression returning JSON-compatible
/// data. Selectors are embedded as JSON literals so quoting can't break out.
pub struct PageScripts {
    selectors: PageSelectors,
}

impl PageScripts {
    pub fn new(selectors: PageSelectors) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &PageSelectors {
        &self.selectors
    }

    /// List candidate cards, tagging each with a stable handle
    pub fn list_candidates(&self) -> String {
        let selectors = js(&self.selectors.candidates);
        let attr = js(&HANDLE_ATTR);

        format!(
            r#"
            (() => {{
                const selectors = {selectors};
                const attr = {attr};
                let elements = [];
                for (const selector of selectors) {{
                    const found = document.querySelectorAll(selector);
                    if (found.length > 0) {{
                        elements = Array.from(found);
                        break;
                    }}
                }}
                return elements.map((el) => {{
                    let handle = el.getAttribute(attr);
                    if (!handle) {{
                        window.__notecrawlSeq = (window.__notecrawlSeq || 0) + 1;
                        handle = String(window.__notecrawlSeq);
                        el.setAttribute(attr, handle);
                    }}
                    const link = el.querySelector('a');
                    const image = el.querySelector('img');
                    return {{
                        handle: handle,
                        link: link ? link.href : null,
                        image: image ? image.src : null,
                        markup: el.innerHTML
                    }};
                }});
            }})()
            "#
        )
    }

    /// Scroll a candidate to the viewport center; evaluates to false if it's gone
    pub fn reveal(&self, handle: &str) -> String {
        let query = handle_query(handle);
        format!(
            r#"
            (() => {{
                const el = document.querySelector({query});
                if (!el) return false;
                el.scrollIntoView({{ behavior: 'smooth', block: 'center' }});
                return true;
            }})()
            "#
        )
    }

    /// Click a candidate's open target, falling back to the card itself
    pub fn open(&self, handle: &str) -> String {
        let query = handle_query(handle);
        let targets = js(&self.selectors.open_targets);
        format!(
            r#"
            (() => {{
                const el = document.querySelector({query});
                if (!el) return false;
                let target = null;
                for (const selector of {targets}) {{
                    target = el.querySelector(selector);
                    if (target) break;
                }}
                (target || el).click();
                return true;
            }})()
            "#
        )
    }

    /// First selector of `selectors` present in the document, or an empty string
    pub fn probe_container(&self, selectors: &[String]) -> String {
        let selectors = js(&selectors);
        format!(
            r#"
            (() => {{
                for (const selector of {selectors}) {{
                    if (document.querySelector(selector)) return selector;
                }}
                return '';
            }})()
            "#
        )
    }

    /// Scroll the comment list inside the container to its end; false if there is none
    pub fn scroll_comments(&self, container: &str) -> String {
        let container = js(&container);
        let lists = js(&self.selectors.comment_containers);
        format!(
            r#"
            (() => {{
                const root = document.querySelector({container});
                if (!root) return false;
                for (const selector of {lists}) {{
                    const list = root.querySelector(selector);
                    if (list) {{
                        list.scrollTop = list.scrollHeight;
                        return true;
                    }}
                }}
                return false;
            }})()
            "#
        )
    }

    /// Click every "show more replies" control, returning how many were clicked
    pub fn expand_replies(&self, container: &str) -> String {
        let container = js(&container);
        let button = js(&self.selectors.show_more_replies);
        format!(
            r#"
            (() => {{
                const root = document.querySelector({container});
                if (!root) return 0;
                let clicked = 0;
                root.querySelectorAll({button}).forEach((btn) => {{
                    try {{
                        btn.click();
                        clicked += 1;
                    }} catch (e) {{}}
                }});
                return clicked;
            }})()
            "#
        )
    }

    /// Read the raw note fields and comment thread out of the container
    pub fn extract_note(&self, container: &str) -> String {
        let s = &self.selectors;
        let container = js(&container);
        let title = js(&s.title);
        let description = js(&s.description);
        let date = js(&s.publish_date);
        let images = js(&s.images);
        let lists = js(&s.comment_containers);
        let parent = js(&s.parent_comment);
        let item = js(&s.comment_item);
        let replies = js(&s.reply_container);

        format!(
            r#"
            (() => {{
                const root = document.querySelector({container});
                if (!root) return {{ found: false }};
                const text = (el) => (el ? el.innerText.trim() : '');

                const readComment = (node) => {{
                    const user = node.querySelector('.name');
                    const content = node.querySelector('.note-text') || node.querySelector('.content');
                    const like = node.querySelector('.like .count');
                    const avatar = node.querySelector('.avatar-item') || node.querySelector('a.avatar');
                    const date = node.querySelector('.info .date');
                    const location = date ? date.querySelector('.location') : null;
                    return {{
                        id: node.getAttribute('id') || '',
                        nickname: text(user),
                        user_id: user ? (user.getAttribute('data-user-id') || '') : '',
                        user_link: user && user.href ? user.href : '',
                        avatar_user_id: avatar ? (avatar.getAttribute('data-user-id') || '') : '',
                        content: text(content),
                        likes: text(like),
                        date_text: text(date),
                        location_text: text(location),
                        replies: []
                    }};
                }};

                let list = null;
                for (const selector of {lists}) {{
                    list = root.querySelector(selector);
                    if (list) break;
                }}

                const comments = [];
                if (list) {{
                    const blocks = list.querySelectorAll({parent});
                    if (blocks.length === 0) {{
                        list.querySelectorAll({item}).forEach((node) => comments.push(readComment(node)));
                    }} else {{
                        blocks.forEach((block) => {{
                            const main = block.querySelector({item});
                            if (!main) return;
                            const parsed = readComment(main);
                            const replyBox = block.querySelector({replies});
                            if (replyBox) {{
                                replyBox.querySelectorAll({item}).forEach((node) => parsed.replies.push(readComment(node)));
                            }}
                            comments.push(parsed);
                        }});
                    }}
                }}

                return {{
                    found: true,
                    title: text(root.querySelector({title})),
                    description: text(root.querySelector({description})),
                    date_text: text(root.querySelector({date})),
                    images: Array.from(root.querySelectorAll({images})).map((img) => img.src).filter((src) => !!src),
                    comments: comments
                }};
            }})()
            "#
        )
    }

    /// Attempt one close action; evaluates to whether it found something to act on
    pub fn close(&self, action: CloseAction) -> String {
        let controls = match action {
            CloseAction::CloseButton => &self.selectors.close_controls,
            CloseAction::Dismiss => &self.selectors.dismiss_controls,
            CloseAction::Escape => {
                return r#"
                (() => {
                    document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
                    return true;
                })()
                "#
                .to_string();
            }
        };
        let controls = js(controls);
        format!(
            r#"
            (() => {{
                for (const selector of {controls}) {{
                    const el = document.querySelector(selector);
                    if (el) {{
                        el.click();
                        return true;
                    }}
                }}
                return false;
            }})()
            "#
        )
    }

    pub fn advance(&self, step: ScrollStep) -> String {
        match step {
            ScrollStep::ViewportFraction(fraction) => {
                format!("(() => {{ window.scrollBy(0, window.innerHeight * {fraction}); return true; }})()")
            }
            ScrollStep::Pixels(px) => {
                format!("(() => {{ window.scrollBy(0, {px}); return true; }})()")
            }
        }
    }

    /// Read the profile header fields
    pub fn profile_summary(&self) -> String {
        let s = &self.selectors;
        let names = js(&s.profile_name);
        let description = js(&s.profile_description);
        let ip = js(&s.profile_ip);
        let site_id = js(&s.profile_site_id);
        let stats = js(&s.profile_stats);

        format!(
            r#"
            (() => {{
                const text = (el) => (el ? el.innerText.trim() : '');
                let nickname = '';
                for (const selector of {names}) {{
                    nickname = text(document.querySelector(selector));
                    if (nickname) break;
                }}
                let ipText = text(document.querySelector({ip}));
                if (!ipText) {{
                    const fallback = Array.from(
                        document.querySelectorAll('.user-content span, .user-desc, .user-tags span')
                    ).find((el) => el.innerText.includes('IP'));
                    ipText = text(fallback);
                }}
                return {{
                    path: window.location.pathname,
                    nickname: nickname,
                    site_id_text: text(document.querySelector({site_id})),
                    ip_text: ipText,
                    description: text(document.querySelector({description})),
                    stats: Array.from(document.querySelectorAll({stats})).map((el) => el.innerText.trim())
                }};
            }})()
            "#
        )
    }
}

fn js<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn handle_query(handle: &str) -> String {
    js(&format!("[{}=\"{}\"]", HANDLE_ATTR, handle.replace('"', "")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts() -> PageScripts {
        PageScripts::new(PageSelectors::default())
    }

    #[test]
    fn test_list_script_embeds_selectors() {
        let script = scripts().list_candidates();
        assert!(script.contains(r#"".note-item""#));
        assert!(script.contains(HANDLE_ATTR));
    }

    #[test]
    fn test_handle_query_is_quoted() {
        let script = scripts().reveal("12");
        assert!(script.contains(r#""[data-notecrawl-handle=\"12\"]""#));
    }

    #[test]
    fn test_selector_quotes_are_escaped() {
        let selectors = PageSelectors {
            title: r#"[data-x="it's"]"#.to_string(),
            ..Default::default()
        };
        let script = PageScripts::new(selectors).extract_note(".note-container");
        assert!(script.contains(r#""[data-x=\"it's\"]""#));
    }

    #[test]
    fn test_close_scripts_per_action() {
        let s = scripts();
        assert!(s.close(CloseAction::CloseButton).contains(".close-circle"));
        assert!(s.close(CloseAction::Dismiss).contains(".mask"));
        assert!(s.close(CloseAction::Escape).contains("Escape"));
    }

    #[test]
    fn test_advance_scripts() {
        let s = scripts();
        assert!(s
            .advance(ScrollStep::ViewportFraction(0.8))
            .contains("window.innerHeight * 0.8"));
        assert!(s.advance(ScrollStep::Pixels(500)).contains("scrollBy(0, 500)"));
    }
}
