//! Fenced-code highlighting.
//!
//! Fences are found with a line-anchored pattern before any Markdown parsing,
//! highlighted with syntect's class-based HTML generator, and swapped out for
//! HTML-comment placeholders. The converter passes comments through untouched
//! (CommonMark HTML block type 2), so the highlighted markup is never parsed
//! as Markdown and a `:::` inside a code sample can never close an aside.
//! [`restore_code_blocks`] puts the fragments back after conversion.

use log::warn;
use maud::{PreEscaped, html};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^```([a-zA-Z0-9_+-]*)\n(.*?)\n```$").expect("code fence pattern compiles")
});

pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Highlight `code` as `language`, returning `<pre>` markup with
    /// class-annotated spans. Unknown languages render as plain text.
    pub fn highlight(&self, code: &str, language: &str) -> Result<String, syntect::Error> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(language)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        let code = format!("{code}\n");
        for line in LinesWithEndings::from(&code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(format!(
            "<pre class=\"highlight\"><code>{}</code></pre>",
            generator.finalize()
        ))
    }

    /// The HTML fragment that replaces one fenced block.
    pub fn fragment(&self, code: &str, language: &str) -> String {
        match self.highlight(code, language) {
            Ok(highlighted) => html! {
                div.code-block data-language=(language) { (PreEscaped(highlighted)) }
            }
            .into_string(),
            Err(e) => {
                warn!("highlighting a {language} block failed, using plain text: {e}");
                html! { pre { code { (code) } } }.into_string()
            }
        }
    }
}

fn placeholder(index: usize) -> String {
    format!("<!-- code-block:{index} -->")
}

/// Replace every fenced block with a placeholder, returning the rewritten
/// source and the highlighted fragments in placeholder order.
pub(crate) fn extract_code_blocks(source: &str, highlighter: &Highlighter) -> (String, Vec<String>) {
    let mut fragments = Vec::new();
    let rewritten = CODE_FENCE.replace_all(source, |caps: &Captures<'_>| {
        let language = match &caps[1] {
            "" => "text",
            lang => lang,
        };
        let marker = placeholder(fragments.len());
        fragments.push(highlighter.fragment(&caps[2], language));
        marker
    });
    (rewritten.into_owned(), fragments)
}

pub(crate) fn restore_code_blocks(html: &mut String, fragments: &[String]) {
    for (index, fragment) in fragments.iter().enumerate() {
        let marker = placeholder(index);
        if let Some(pos) = html.find(&marker) {
            html.replace_range(pos..pos + marker.len(), fragment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_tagged_with_language() {
        let hl = Highlighter::new();
        let out = hl.fragment("fn main() {}", "rust");
        assert!(out.starts_with(r#"<div class="code-block" data-language="rust">"#));
        assert!(out.contains("<pre class=\"highlight\">"));
        assert!(out.contains("main"));
    }

    #[test]
    fn unknown_language_renders_plain() {
        let hl = Highlighter::new();
        let out = hl.fragment("<b>x</b>", "no-such-lang");
        assert!(out.contains("data-language=\"no-such-lang\""));
        assert!(out.contains("&lt;b&gt;"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn extract_replaces_fences_with_placeholders() {
        let hl = Highlighter::new();
        let src = "Intro\n```\nplain\n```\nmiddle\n```python\nprint(1)\n```\n";
        let (rewritten, fragments) = extract_code_blocks(src, &hl);
        assert_eq!(fragments.len(), 2);
        assert!(rewritten.contains("<!-- code-block:0 -->"));
        assert!(rewritten.contains("<!-- code-block:1 -->"));
        assert!(!rewritten.contains("```"));
        assert!(fragments[0].contains("data-language=\"text\""));
        assert!(fragments[1].contains("data-language=\"python\""));
    }

    #[test]
    fn restore_puts_fragments_back() {
        let mut html = "<p>a</p>\n<!-- code-block:0 -->\n<p>b</p>".to_string();
        restore_code_blocks(&mut html, &["<div>code</div>".to_string()]);
        assert_eq!(html, "<p>a</p>\n<div>code</div>\n<p>b</p>");
    }
}
