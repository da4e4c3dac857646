//! Lightweight markdown to HTML conversion for assistant replies.
//!
//! Rules run line by line in a fixed order: headings, bold, italic, list
//! items, list wrapping, line breaks. Anything that does not match a rule
//! passes through as literal text, so rendering never fails.
//!
//! Input is NOT HTML-escaped. Angle brackets and ampersands in model output
//! reach the page as markup. Only collaborator text should be rendered here;
//! user text goes through [`escape_html`] instead.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.*?)_").unwrap());
static UNORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.+)$").unwrap());
static BULLET_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*•\s+(.+)$").unwrap());
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[0-9]+\.\s+(.+)$").unwrap());
static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+\.").unwrap());

const LINE_BREAK: &str = "<br>";

struct ListItem {
    ordered: bool,
    content: String,
}

enum Block {
    Line(String),
    List(Vec<ListItem>),
}

impl Block {
    fn to_html(&self) -> String {
        match self {
            Block::Line(line) => line.clone(),
            Block::List(items) => {
                // Approximate list type: numbered markers, or any ordinal-looking
                // text inside the run, make the whole run ordered.
                let ordered = items
                    .iter()
                    .any(|item| item.ordered || ORDINAL.is_match(&item.content));
                let tag = if ordered { "ol" } else { "ul" };
                let body: String = items
                    .iter()
                    .map(|item| format!("<li>{}</li>", item.content))
                    .collect();
                format!("<{tag}>{body}</{tag}>")
            }
        }
    }
}

pub fn render(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut blocks: Vec<Block> = Vec::new();
    for raw in text.split('\n') {
        let line = heading(raw).unwrap_or_else(|| raw.to_string());
        let line = emphasis(&line);
        match list_item(&line) {
            Some(item) => match blocks.last_mut() {
                Some(Block::List(items)) => items.push(item),
                _ => blocks.push(Block::List(vec![item])),
            },
            None => blocks.push(Block::Line(line)),
        }
    }

    let html = blocks
        .iter()
        .map(Block::to_html)
        .collect::<Vec<_>>()
        .join(LINE_BREAK);
    html.replace("<li></li>", "")
}

/// `# Title` through `###### Title`. Seven or more marks are left alone.
fn heading(line: &str) -> Option<String> {
    let caps = HEADING.captures(line)?;
    let level = caps[1].len();
    Some(format!("<h{level}>{}</h{level}>", &caps[2]))
}

/// Bold first so a `**` pair is not eaten by the single-marker rules.
fn emphasis(line: &str) -> String {
    let line = BOLD.replace_all(line, "<strong>${1}</strong>");
    let line = ITALIC_STAR.replace_all(&line, "<em>${1}</em>");
    ITALIC_UNDERSCORE.replace_all(&line, "<em>${1}</em>").into_owned()
}

fn list_item(line: &str) -> Option<ListItem> {
    let rules: [(&Regex, bool); 3] = [
        (&*UNORDERED_ITEM, false),
        (&*BULLET_ITEM, false),
        (&*ORDERED_ITEM, true),
    ];
    rules.iter().find_map(|(pattern, ordered)| {
        pattern.captures(line).map(|caps| ListItem {
            ordered: *ordered,
            content: caps[1].to_string(),
        })
    })
}

/// Plain-text path for user-originated content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_label() {
        assert_eq!(render("**Skills:** Python"), "<strong>Skills:</strong> Python");
    }

    #[test]
    fn dashed_items_make_one_unordered_list() {
        assert_eq!(
            render("- item one\n- item two"),
            "<ul><li>item one</li><li>item two</li></ul>"
        );
    }

    #[test]
    fn numbered_items_make_one_ordered_list() {
        assert_eq!(render("1. first\n2. second"), "<ol><li>first</li><li>second</li></ol>");
    }

    #[test]
    fn plain_text_only_gains_breaks() {
        let text = "Plan ahead\nand keep learning\n\nevery day";
        assert_eq!(render(text), text.replace('\n', "<br>"));
        assert_eq!(render("no markup here"), "no markup here");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn heading_levels_and_trailing_space() {
        assert_eq!(render("# One"), "<h1>One</h1>");
        assert_eq!(render("### Three   "), "<h3>Three</h3>");
        assert_eq!(render("###### Six"), "<h6>Six</h6>");
        assert_eq!(render("####### Seven"), "####### Seven");
        assert_eq!(render("#NoSpace"), "#NoSpace");
        assert_eq!(render("# A\n## B"), "<h1>A</h1><br><h2>B</h2>");
    }

    #[test]
    fn emphasis_inside_heading() {
        assert_eq!(render("## **Next** steps"), "<h2><strong>Next</strong> steps</h2>");
    }

    #[test]
    fn both_italic_markers() {
        assert_eq!(render("*fast* and _steady_"), "<em>fast</em> and <em>steady</em>");
        assert_eq!(render("**a** *b*"), "<strong>a</strong> <em>b</em>");
    }

    #[test]
    fn underscores_in_identifiers_become_emphasis() {
        assert_eq!(render("snake_case_name"), "snake<em>case</em>name");
    }

    #[test]
    fn bullet_glyph_with_bold_label() {
        assert_eq!(
            render("• **Skills:** Python\n• **Salary:** varies"),
            "<ul><li><strong>Skills:</strong> Python</li><li><strong>Salary:</strong> varies</li></ul>"
        );
    }

    #[test]
    fn indented_and_plus_items() {
        assert_eq!(render("  * one\n+ two"), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn list_between_paragraphs() {
        assert_eq!(
            render("Options:\n- Data science\n- Design\nPick one."),
            "Options:<br><ul><li>Data science</li><li>Design</li></ul><br>Pick one."
        );
    }

    #[test]
    fn separated_runs_get_separate_containers() {
        assert_eq!(
            render("- a\n\n1. b"),
            "<ul><li>a</li></ul><br><br><ol><li>b</li></ol>"
        );
    }

    #[test]
    fn ordinal_text_marks_run_ordered() {
        assert_eq!(render("- version 2. shipped"), "<ol><li>version 2. shipped</li></ol>");
    }

    #[test]
    fn only_ascii_digits_count_as_ordinals() {
        assert_eq!(render("١. item"), "١. item");
        assert_eq!(render("- phase ٢. next"), "<ul><li>phase ٢. next</li></ul>");
    }

    #[test]
    fn literal_empty_items_are_dropped() {
        assert_eq!(render("before<li></li>after"), "beforeafter");
    }

    #[test]
    fn markup_is_not_escaped() {
        assert_eq!(render("<b>x</b> & y"), "<b>x</b> & y");
    }

    #[test]
    fn escape_html_neutralises_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }
}
