//! HTML to plain-text conversion for vacancy descriptions

use std::sync::OnceLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node};

/// Tags that emit a newline both when opened and when closed.
const BREAK_TAGS: &[&str] = &["br", "p", "li"];

/// Block-level tags that emit a newline when closed.
const BLOCK_TAGS: &[&str] = &["div", "ul", "ol", "tr", "table", "section", "article"];

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0c\x0b\u{00a0}]+").unwrap())
}

fn extra_newlines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if BREAK_TAGS.contains(&name) {
                    out.push('\n');
                }
                collect_text(child, out);
                if BREAK_TAGS.contains(&name) || BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Convert HTML to plain text with normalized spacing and newlines.
///
/// `<br>`, `<p>` and `<li>` boundaries become newlines, block-level tags emit
/// a newline on close, runs of horizontal whitespace collapse to one space,
/// every line is trimmed, and three or more consecutive newlines collapse to
/// exactly two. HTML entities are decoded by the parser.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut raw = String::with_capacity(html.len());
    collect_text(fragment.tree.root(), &mut raw);

    let raw = raw.replace("\r\n", "\n").replace('\r', "\n");

    let normalized: Vec<String> = raw
        .split('\n')
        .map(|line| horizontal_ws_re().replace_all(line, " ").trim().to_string())
        .collect();

    let joined = normalized.join("\n");
    extra_newlines_re()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_plain_text_passthrough() {
        assert_eq!(strip_html("просто текст"), "просто текст");
    }

    #[test]
    fn test_paragraphs_and_list_items_become_lines() {
        let html = "<p>Первый</p><ul><li>один</li><li>два</li></ul>";
        let text = strip_html(html);
        let lines: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Первый", "один", "два"]);
    }

    #[test]
    fn test_br_breaks_line() {
        let text = strip_html("строка один<br>строка два");
        assert_eq!(text, "строка один\nстрока два");
    }

    #[test]
    fn test_horizontal_whitespace_collapsed() {
        let text = strip_html("<p>a\u{00a0}\u{00a0}b\t\tc</p>");
        assert_eq!(text, "a b c");
    }

    #[test]
    fn test_excess_newlines_collapsed() {
        let html = "<div>a</div><br><br><br><div>b</div>";
        let text = strip_html(html);
        assert!(!text.contains("\n\n\n"));
        assert!(text.starts_with('a'));
        assert!(text.ends_with('b'));
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(strip_html("<p>C&#43;&#43; &amp; Rust</p>"), "C++ & Rust");
    }

    #[test]
    fn test_deterministic() {
        let html = "<p><strong>Требования</strong></p><ul><li>Python 3</li><li>SQL</li></ul>";
        assert_eq!(strip_html(html), strip_html(html));
    }

    #[test]
    fn test_nested_blocks() {
        let html = "<section><div>Обязанности:</div><table><tr><td>писать код</td></tr></table></section>";
        let text = strip_html(html);
        assert!(text.contains("Обязанности:"));
        assert!(text.contains("писать код"));
    }
}
