//! CommonMark to HTML conversion with the site's event rewrites.
//!
//! Both flavors enable the GitHub extensions (tables, strikethrough, task
//! lists, footnotes, `> [!NOTE]` alerts), turn soft line breaks into `<br>`,
//! and link bare URLs. Post content additionally gets smart punctuation and
//! YouTube embeds for paragraphs that are nothing but a video link. Comment
//! content treats raw HTML as text and drops script-capable link and image
//! destinations, so user input can never inject markup.

use super::slug::Outline;
use maud::html;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html::push_html};
use regex::Regex;
use std::sync::LazyLock;

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"']*[^\s<>"'.,:;!?)\]]"#).expect("url pattern compiles")
});

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{11})")
        .expect("youtube pattern compiles")
});

const UNSAFE_SCHEMES: [&str; 4] = ["javascript:", "vbscript:", "file:", "data:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    Content,
    Comment,
}

impl Flavor {
    fn options(self) -> Options {
        let gfm = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_GFM;
        match self {
            Flavor::Content => gfm | Options::ENABLE_SMART_PUNCTUATION,
            Flavor::Comment => gfm,
        }
    }
}

struct PendingHeading<'a> {
    level: HeadingLevel,
    text: String,
    events: Vec<Event<'a>>,
}

/// Convert a Markdown fragment to HTML.
///
/// Heading ids come from `outline`, which is shared across every fragment of
/// one document so ids stay unique and the TOC matches.
pub(crate) fn convert(source: &str, flavor: Flavor, outline: &mut Outline) -> String {
    let mut parsed = coalesce_text(Parser::new_ext(source, flavor.options()).collect());
    if flavor == Flavor::Content {
        parsed = embed_videos(parsed);
    }

    let mut events: Vec<Event<'_>> = Vec::with_capacity(parsed.len());
    let mut heading: Option<PendingHeading<'_>> = None;
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in parsed {
        let event = match event {
            Event::SoftBreak => Event::HardBreak,
            Event::Html(raw) | Event::InlineHtml(raw) if flavor == Flavor::Comment => Event::Text(raw),
            other => other,
        };
        let event = match flavor {
            Flavor::Comment => defuse_destination(event),
            Flavor::Content => event,
        };

        match &event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(PendingHeading {
                    level: *level,
                    text: String::new(),
                    events: Vec::new(),
                });
                continue;
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(pending) = heading.take() {
                    emit_heading(pending, outline, &mut events);
                }
                continue;
            }
            Event::Start(Tag::Link { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) => link_depth = link_depth.saturating_sub(1),
            Event::InlineHtml(raw) if opens_anchor(raw) => link_depth += 1,
            Event::InlineHtml(raw) if closes_anchor(raw) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            _ => {}
        }

        let sink = match heading.as_mut() {
            Some(pending) => {
                if let Event::Text(t) | Event::Code(t) = &event {
                    pending.text.push_str(t);
                }
                &mut pending.events
            }
            None => &mut events,
        };

        match event {
            Event::Text(text) if link_depth == 0 && !in_code_block => push_autolinked(text, sink),
            other => sink.push(other),
        }
    }

    let mut out = String::with_capacity(source.len() * 3 / 2);
    push_html(&mut out, events.into_iter());
    out
}

/// Browsers ignore whitespace and control characters inside a scheme, so
/// `java\tscript:` counts too.
fn is_unsafe_url(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme))
}

fn defuse_destination(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if is_unsafe_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    }
}

/// Raw `<a ...>` in post content; its text must not be linked again.
fn opens_anchor(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower
        .strip_prefix("<a")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '>' || c.is_ascii_whitespace())
}

fn closes_anchor(raw: &str) -> bool {
    let lower = raw.trim_start().to_ascii_lowercase();
    lower
        .strip_prefix("</a")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '>' || c.is_ascii_whitespace())
}

fn emit_heading<'a>(pending: PendingHeading<'a>, outline: &mut Outline, events: &mut Vec<Event<'a>>) {
    let level = pending.level as u8;
    let id = outline.record(level, &pending.text);
    events.push(Event::Html(format!("<h{level} id=\"{id}\">").into()));
    events.extend(pending.events);
    events.push(Event::Html(format!("</h{level}>\n").into()));
}

/// The parser may split one run of text into several events; join them so a
/// URL is always seen whole.
fn coalesce_text(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out: Vec<Event<'_>> = Vec::with_capacity(events.len());
    for event in events {
        if let (Event::Text(next), Some(Event::Text(prev))) = (&event, out.last_mut()) {
            let joined = format!("{prev}{next}");
            *prev = CowStr::from(joined);
            continue;
        }
        out.push(event);
    }
    out
}

fn push_autolinked<'a>(text: CowStr<'a>, sink: &mut Vec<Event<'a>>) {
    if !BARE_URL.is_match(&text) {
        sink.push(Event::Text(text));
        return;
    }
    let mut last = 0;
    for m in BARE_URL.find_iter(&text) {
        if m.start() > last {
            sink.push(Event::Text(text[last..m.start()].to_string().into()));
        }
        let url = m.as_str();
        let anchor = html! { a href=(url) { (url) } };
        sink.push(Event::InlineHtml(anchor.into_string().into()));
        last = m.end();
    }
    if last < text.len() {
        sink.push(Event::Text(text[last..].to_string().into()));
    }
}

fn youtube_id(url: &str) -> Option<String> {
    YOUTUBE_URL.captures(url.trim()).map(|caps| caps[1].to_string())
}

/// A paragraph holding only a YouTube link, and how many events it spans.
fn video_paragraph(events: &[Event<'_>]) -> Option<(String, usize)> {
    match events {
        [
            Event::Start(Tag::Paragraph),
            Event::Text(url),
            Event::End(TagEnd::Paragraph),
            ..,
        ] => youtube_id(url).map(|id| (id, 3)),
        [
            Event::Start(Tag::Paragraph),
            Event::Start(Tag::Link { dest_url, .. }),
            Event::Text(_),
            Event::End(TagEnd::Link),
            Event::End(TagEnd::Paragraph),
            ..,
        ] => youtube_id(dest_url).map(|id| (id, 5)),
        _ => None,
    }
}

fn video_embed(id: &str) -> String {
    let src = format!("https://www.youtube.com/embed/{id}");
    let markup = html! {
        div.video-embed {
            iframe src=(src) width="560" height="315" title="YouTube video player"
                frameborder="0"
                allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture"
                allowfullscreen {}
        }
    };
    format!("{}\n", markup.into_string())
}

fn embed_videos(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if let Some((id, span)) = video_paragraph(&events[i..]) {
            out.push(Event::Html(video_embed(&id).into()));
            i += span;
        } else {
            out.push(events[i].clone());
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(src: &str) -> String {
        convert(src, Flavor::Content, &mut Outline::default())
    }

    fn comment(src: &str) -> String {
        convert(src, Flavor::Comment, &mut Outline::default())
    }

    #[test]
    fn headings_get_ids_and_toc_entries() {
        let mut outline = Outline::default();
        let html = convert("## Getting `cargo` started\n\n## Getting cargo started\n", Flavor::Content, &mut outline);
        assert!(html.contains(r#"<h2 id="getting-cargo-started">Getting <code>cargo</code> started</h2>"#));
        assert!(html.contains(r#"<h2 id="getting-cargo-started-1">"#));
        let toc = outline.into_entries();
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].text, "Getting cargo started");
        assert_eq!(toc[1].id, "getting-cargo-started-1");
    }

    #[test]
    fn soft_breaks_become_hard() {
        let html = content("line one\nline two\n");
        assert!(html.contains("line one<br />"));
    }

    #[test]
    fn gfm_extensions_render() {
        let html = content("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn alerts_render_as_classed_blockquotes() {
        let html = content("> [!NOTE]\n> Heads up.\n");
        assert!(html.contains("markdown-alert-note"), "{html}");
    }

    #[test]
    fn smart_punctuation_in_content_only() {
        assert!(content("\"quoted\"\n").contains('\u{201c}'));
        assert!(!comment("\"quoted\"\n").contains('\u{201c}'));
    }

    #[test]
    fn bare_urls_are_linked() {
        let html = content("See https://example.com/docs_page, then continue.\n");
        assert!(html.contains(r#"<a href="https://example.com/docs_page">https://example.com/docs_page</a>,"#));
    }

    #[test]
    fn urls_in_code_are_not_linked() {
        let html = content("    https://example.com\n");
        assert!(!html.contains("<a href"));
        let html = content("`https://example.com`\n");
        assert!(!html.contains("<a href"));
    }

    #[test]
    fn youtube_paragraph_becomes_embed() {
        let html = content("Watch:\n\nhttps://www.youtube.com/watch?v=dQw4w9WgXcQ\n\nDone.\n");
        assert!(html.contains(r#"src="https://www.youtube.com/embed/dQw4w9WgXcQ""#));
        assert!(html.contains("allowfullscreen"));
        assert!(!html.contains("<p>https://www.youtube.com"));
    }

    #[test]
    fn inline_youtube_link_stays_a_link() {
        let html = content("Watch https://youtu.be/dQw4w9WgXcQ today\n");
        assert!(!html.contains("youtube.com/embed"));
        assert!(html.contains(r#"<a href="https://youtu.be/dQw4w9WgXcQ">"#));
    }

    #[test]
    fn comment_html_is_escaped() {
        let html = comment("<script>alert(1)</script>\n\nhi <b>there</b>\n");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn comment_links_drop_script_urls() {
        let html = comment("[click me](javascript:alert(document.cookie))\n\n![x](javascript:alert(1))\n");
        assert!(!html.contains("href=\"javascript:"), "{html}");
        assert!(!html.contains("src=\"javascript:"), "{html}");
        assert!(html.contains(r##"<a href="#">click me</a>"##), "{html}");

        let html = comment("[a](  VBScript:msgbox(1)) [b](data:text/html,hi) <javascript:alert(1)>\n");
        assert!(!html.to_ascii_lowercase().contains("vbscript:"), "{html}");
        assert!(!html.contains("href=\"data:"), "{html}");
        assert!(!html.contains("href=\"javascript:"), "{html}");
    }

    #[test]
    fn comment_keeps_ordinary_links() {
        let html = comment("[docs](https://example.com/docs) and ![pic](/img/a.png)\n");
        assert!(html.contains(r#"<a href="https://example.com/docs">docs</a>"#));
        assert!(html.contains(r#"src="/img/a.png""#));
    }

    #[test]
    fn content_keeps_script_urls_authored_by_the_site() {
        let html = content("[run](javascript:void(0))\n");
        assert!(html.contains("href=\"javascript:void(0)\""), "{html}");
    }

    #[test]
    fn raw_anchor_text_is_not_linked_twice() {
        let html = content("See <a href=\"https://x.test\">https://x.test</a> here, then https://y.test\n");
        assert_eq!(html.matches("<a href").count(), 2, "{html}");
        assert!(html.contains(r#"<a href="https://x.test">https://x.test</a> here"#), "{html}");
        assert!(html.contains(r#"<a href="https://y.test">https://y.test</a>"#), "{html}");
    }

    #[test]
    fn content_html_passes_through() {
        let html = content("<div class=\"x\">raw</div>\n");
        assert!(html.contains("<div class=\"x\">raw</div>"));
    }
}
