//! Terminal rendering of markdown replies.

use std::sync::OnceLock;

use markdown::{mdast, to_mdast, ParseOptions};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

pub type MarkdownStyleFn = Box<dyn Fn(&str) -> String>;

pub type CodeHighlighterFn = Box<dyn Fn(&str, Option<&str>) -> Vec<String>>;

/// syntect theme used for fenced code blocks.
pub const CODE_THEME: &str = "base16-ocean.dark";

/// Longest horizontal rule.
const MAX_RULE_WIDTH: usize = 80;

const RESET: &str = "\x1b[0m";

pub struct MarkdownTheme {
    pub heading: MarkdownStyleFn,
    pub link: MarkdownStyleFn,
    pub link_url: MarkdownStyleFn,
    pub code: MarkdownStyleFn,
    pub code_block: MarkdownStyleFn,
    pub code_block_border: MarkdownStyleFn,
    pub quote: MarkdownStyleFn,
    pub quote_border: MarkdownStyleFn,
    pub hr: MarkdownStyleFn,
    pub list_bullet: MarkdownStyleFn,
    pub bold: MarkdownStyleFn,
    pub italic: MarkdownStyleFn,
    pub strikethrough: MarkdownStyleFn,
    pub underline: MarkdownStyleFn,
    pub highlight_code: Option<CodeHighlighterFn>,
}

impl MarkdownTheme {
    /// ANSI colors with syntax-highlighted code blocks.
    #[must_use]
    pub fn ansi() -> Self {
        Self {
            heading: Box::new(cyan),
            link: Box::new(blue),
            link_url: Box::new(dim),
            code: Box::new(yellow),
            code_block: Box::new(green),
            code_block_border: Box::new(dim),
            quote: Box::new(italic),
            quote_border: Box::new(dim),
            hr: Box::new(dim),
            list_bullet: Box::new(cyan),
            bold: Box::new(bold),
            italic: Box::new(italic),
            strikethrough: Box::new(strikethrough),
            underline: Box::new(underline),
            highlight_code: Some(Box::new(highlight_code)),
        }
    }
}

pub struct MarkdownRenderer {
    theme: MarkdownTheme,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(MarkdownTheme::ansi())
    }
}

impl MarkdownRenderer {
    #[must_use]
    pub fn new(theme: MarkdownTheme) -> Self {
        Self { theme }
    }

    /// Renders `text` for the terminal. Blocks are separated by one blank line.
    pub fn render(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let normalized = text.replace('\t', "   ");
        let root = match to_mdast(&normalized, &ParseOptions::gfm()) {
            Ok(node) => node,
            Err(error) => {
                tracing::debug!(%error, "reply is not parseable markdown");
                return normalized;
            }
        };
        let nodes = match root {
            mdast::Node::Root(root) => root.children,
            other => vec![other],
        };

        let blocks = nodes
            .iter()
            .map(|node| self.render_block(node))
            .filter(|lines| !lines.is_empty())
            .map(|lines| lines.join("\n"))
            .collect::<Vec<_>>();
        let mut rendered = blocks.join("\n\n");
        rendered.push('\n');
        rendered
    }

    fn render_block(&self, node: &mdast::Node) -> Vec<String> {
        match node {
            mdast::Node::Heading(heading) => {
                let text = self.render_inline(&heading.children);
                let styled = match heading.depth {
                    1 => (self.theme.heading)(&(self.theme.bold)(&(self.theme.underline)(
                        &text,
                    ))),
                    2 => (self.theme.heading)(&(self.theme.bold)(&text)),
                    depth => {
                        let prefix = "#".repeat(usize::from(depth));
                        (self.theme.heading)(&(self.theme.bold)(&format!("{prefix} {text}")))
                    }
                };
                vec![styled]
            }
            mdast::Node::Paragraph(paragraph) => {
                split_lines(&self.render_inline(&paragraph.children))
            }
            mdast::Node::Code(code) => self.render_code(code),
            mdast::Node::List(list) => self.render_list(list, 0),
            mdast::Node::Blockquote(blockquote) => self.render_blockquote(blockquote),
            mdast::Node::ThematicBreak(_) => vec![(self.theme.hr)(&"─".repeat(MAX_RULE_WIDTH))],
            mdast::Node::Table(table) => self.render_table(table),
            mdast::Node::Html(html) => split_lines(html.value.trim()),
            mdast::Node::Math(math) => split_lines(&math.value),
            mdast::Node::Text(text) => split_lines(&text.value),
            _ => Vec::new(),
        }
    }

    fn render_inline(&self, nodes: &[mdast::Node]) -> String {
        let mut result = String::new();
        for node in nodes {
            match node {
                mdast::Node::Text(text) => result.push_str(&text.value),
                mdast::Node::Paragraph(paragraph) => {
                    result.push_str(&self.render_inline(&paragraph.children));
                }
                mdast::Node::Strong(strong) => {
                    result.push_str(&(self.theme.bold)(&self.render_inline(&strong.children)));
                }
                mdast::Node::Emphasis(emphasis) => {
                    result.push_str(&(self.theme.italic)(&self.render_inline(&emphasis.children)));
                }
                mdast::Node::Delete(delete) => {
                    result.push_str(
                        &(self.theme.strikethrough)(&self.render_inline(&delete.children)),
                    );
                }
                mdast::Node::InlineCode(code) => result.push_str(&(self.theme.code)(&code.value)),
                mdast::Node::Link(link) => {
                    let text = self.render_inline(&link.children);
                    result.push_str(&(self.theme.link)(&(self.theme.underline)(&text)));
                    let plain = plain_text(&link.children);
                    let href = link.url.as_str();
                    let bare = href.strip_prefix("mailto:").unwrap_or(href);
                    if plain != href && plain != bare {
                        result.push_str(&(self.theme.link_url)(&format!(" ({href})")));
                    }
                }
                mdast::Node::Break(_) => result.push('\n'),
                mdast::Node::Html(html) => result.push_str(&html.value),
                mdast::Node::Image(image) => {
                    let alt = if image.alt.is_empty() {
                        image.url.as_str()
                    } else {
                        image.alt.as_str()
                    };
                    result.push_str(alt);
                }
                mdast::Node::InlineMath(math) => result.push_str(&math.value),
                _ => {}
            }
        }
        result
    }

    fn render_code(&self, code: &mdast::Code) -> Vec<String> {
        let lang = code.lang.as_deref().filter(|lang| !lang.is_empty());
        let mut lines = vec![(self.theme.code_block_border)(&format!(
            "```{}",
            lang.unwrap_or_default()
        ))];
        match self.theme.highlight_code.as_ref() {
            Some(highlighter) => {
                lines.extend(
                    highlighter(&code.value, lang)
                        .into_iter()
                        .map(|line| format!("  {line}")),
                );
            }
            None => {
                lines.extend(
                    code.value
                        .split('\n')
                        .map(|line| format!("  {}", (self.theme.code_block)(line))),
                );
            }
        }
        lines.push((self.theme.code_block_border)("```"));
        lines
    }

    fn render_list(&self, list: &mdast::List, depth: usize) -> Vec<String> {
        let indent = "  ".repeat(depth);
        let start = list.start.unwrap_or(1);
        let mut lines = Vec::new();

        for (index, node) in list.children.iter().enumerate() {
            let mdast::Node::ListItem(item) = node else {
                continue;
            };
            let bullet = if list.ordered {
                format!("{}. ", u64::from(start) + index as u64)
            } else {
                "- ".to_string()
            };
            let bullet = (self.theme.list_bullet)(&bullet);

            let mut first = true;
            for child in &item.children {
                if let mdast::Node::List(nested) = child {
                    lines.extend(self.render_list(nested, depth + 1));
                    continue;
                }
                for line in self.render_block(child) {
                    if first {
                        lines.push(format!("{indent}{bullet}{line}"));
                        first = false;
                    } else {
                        lines.push(format!("{indent}  {line}"));
                    }
                }
            }
            if first {
                lines.push(format!("{indent}{bullet}"));
            }
        }

        lines
    }

    fn render_blockquote(&self, blockquote: &mdast::Blockquote) -> Vec<String> {
        let border = (self.theme.quote_border)("│ ");
        blockquote
            .children
            .iter()
            .flat_map(|child| match child {
                mdast::Node::Paragraph(paragraph) => {
                    split_lines(&self.render_inline(&paragraph.children))
                        .into_iter()
                        .map(|line| (self.theme.quote)(&line))
                        .collect()
                }
                other => self.render_block(other),
            })
            .map(|line| format!("{border}{line}"))
            .collect()
    }

    /// Box-drawn table sized to the widest plain cell of each column.
    fn render_table(&self, table: &mdast::Table) -> Vec<String> {
        let rows = table
            .children
            .iter()
            .filter_map(|node| match node {
                mdast::Node::TableRow(row) => Some(
                    row.children
                        .iter()
                        .map(|cell| match cell {
                            mdast::Node::TableCell(cell) => plain_text(&cell.children),
                            other => plain_text(std::slice::from_ref(other)),
                        })
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .collect::<Vec<_>>();
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Vec::new();
        }

        let mut widths = vec![0usize; columns];
        for row in &rows {
            for (column, cell) in row.iter().enumerate() {
                widths[column] = widths[column].max(cell.chars().count());
            }
        }
        let rule = |left: &str, join: &str, right: &str| {
            let cells = widths.iter().map(|width| "─".repeat(*width)).collect::<Vec<_>>();
            format!("{left}─{}─{right}", cells.join(format!("─{join}─").as_str()))
        };

        let mut lines = vec![rule("┌", "┬", "┐")];
        for (index, row) in rows.iter().enumerate() {
            let cells = widths
                .iter()
                .enumerate()
                .map(|(column, width)| {
                    let text = row.get(column).map(String::as_str).unwrap_or_default();
                    let padded = format!("{text:<width$}");
                    if index == 0 {
                        (self.theme.bold)(&padded)
                    } else {
                        padded
                    }
                })
                .collect::<Vec<_>>();
            lines.push(format!("│ {} │", cells.join(" │ ")));
            if index == 0 && rows.len() > 1 {
                lines.push(rule("├", "┼", "┤"));
            }
        }
        lines.push(rule("└", "┴", "┘"));
        lines
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn plain_text(nodes: &[mdast::Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            mdast::Node::Text(text) => out.push_str(&text.value),
            mdast::Node::InlineCode(code) => out.push_str(&code.value),
            mdast::Node::Strong(strong) => out.push_str(&plain_text(&strong.children)),
            mdast::Node::Emphasis(emphasis) => out.push_str(&plain_text(&emphasis.children)),
            mdast::Node::Delete(delete) => out.push_str(&plain_text(&delete.children)),
            mdast::Node::Link(link) => out.push_str(&plain_text(&link.children)),
            mdast::Node::Html(html) => out.push_str(&html.value),
            mdast::Node::Image(image) => out.push_str(&image.alt),
            mdast::Node::Paragraph(paragraph) => out.push_str(&plain_text(&paragraph.children)),
            _ => {}
        }
    }
    out
}

struct HighlightAssets {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
}

fn highlight_assets() -> &'static HighlightAssets {
    static ASSETS: OnceLock<HighlightAssets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes
            .remove(CODE_THEME)
            .or_else(|| themes.into_values().next());
        HighlightAssets {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    })
}

/// Highlights `code` by its fence language; unknown languages stay plain green.
pub fn highlight_code(code: &str, lang: Option<&str>) -> Vec<String> {
    let assets = highlight_assets();
    let syntax = lang.and_then(|lang| {
        assets
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| assets.syntax_set.find_syntax_by_extension(lang))
    });
    let (Some(syntax), Some(theme)) = (syntax, assets.theme.as_ref()) else {
        return code.split('\n').map(green).collect();
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        let escaped = match highlighter.highlight_line(line, &assets.syntax_set) {
            Ok(ranges) => as_24_bit_terminal_escaped(&ranges, false),
            Err(error) => {
                tracing::debug!(%error, "code highlighting failed");
                return code.split('\n').map(green).collect();
            }
        };
        let escaped = escaped.trim_end_matches(['\n', '\r']).replace(['\n', '\r'], "");
        lines.push(format!("{escaped}{RESET}"));
    }
    lines
}

fn ansi_wrap(text: &str, prefix: &str, suffix: &str) -> String {
    format!("{prefix}{text}{suffix}")
}

fn dim(text: &str) -> String {
    ansi_wrap(text, "\x1b[2m", "\x1b[22m")
}

fn bold(text: &str) -> String {
    ansi_wrap(text, "\x1b[1m", "\x1b[22m")
}

fn blue(text: &str) -> String {
    ansi_wrap(text, "\x1b[34m", "\x1b[39m")
}

fn cyan(text: &str) -> String {
    ansi_wrap(text, "\x1b[36m", "\x1b[39m")
}

fn yellow(text: &str) -> String {
    ansi_wrap(text, "\x1b[33m", "\x1b[39m")
}

fn green(text: &str) -> String {
    ansi_wrap(text, "\x1b[32m", "\x1b[39m")
}

fn underline(text: &str) -> String {
    ansi_wrap(text, "\x1b[4m", "\x1b[24m")
}

fn italic(text: &str) -> String {
    ansi_wrap(text, "\x1b[3m", "\x1b[23m")
}

fn strikethrough(text: &str) -> String {
    ansi_wrap(text, "\x1b[9m", "\x1b[29m")
}

#[cfg(test)]
mod tests {
    use super::{highlight_code, MarkdownRenderer, MarkdownTheme};
    use pretty_assertions::assert_eq;

    fn theme() -> MarkdownTheme {
        MarkdownTheme {
            heading: Box::new(|text| format!("<h>{text}</h>")),
            link: Box::new(|text| format!("<l>{text}</l>")),
            link_url: Box::new(|text| format!("<u>{text}</u>")),
            code: Box::new(|text| format!("`{text}`")),
            code_block: Box::new(|text| format!("<code>{text}</code>")),
            code_block_border: Box::new(|text| format!("<cb>{text}</cb>")),
            quote: Box::new(|text| format!("<q>{text}</q>")),
            quote_border: Box::new(|text| text.to_string()),
            hr: Box::new(|text| format!("<hr>{text}</hr>")),
            list_bullet: Box::new(|text| format!("<b>{text}</b>")),
            bold: Box::new(|text| format!("<b>{text}</b>")),
            italic: Box::new(|text| format!("<i>{text}</i>")),
            strikethrough: Box::new(|text| format!("<s>{text}</s>")),
            underline: Box::new(|text| format!("<u>{text}</u>")),
            highlight_code: None,
        }
    }

    fn render(text: &str) -> String {
        MarkdownRenderer::new(theme()).render(text)
    }

    #[test]
    fn headings_and_paragraphs_are_separated_by_blank_lines() {
        assert_eq!(
            render("# Title\nSome **bold** and *soft* text.\n\n### Deep"),
            "<h><b><u>Title</u></b></h>\n\nSome <b>bold</b> and <i>soft</i> text.\n\n<h><b>### Deep</b></h>\n"
        );
    }

    #[test]
    fn link_renders_url_only_when_it_differs_from_text() {
        assert_eq!(
            render("[x](x) and [docs](https://example.com)"),
            "<l><u>x</u></l> and <l><u>docs</u></l><u> (https://example.com)</u>\n"
        );
    }

    #[test]
    fn lists_number_from_their_start() {
        assert_eq!(
            render("3. three\n4. four\n\n- a\n  - nested"),
            "<b>3. </b>three\n<b>4. </b>four\n\n<b>- </b>a\n  <b>- </b>nested\n"
        );
    }

    #[test]
    fn code_block_is_fenced_and_indented() {
        assert_eq!(
            render("```rust\nfn main() {}\n```"),
            "<cb>```rust</cb>\n  <code>fn main() {}</code>\n<cb>```</cb>\n"
        );
    }

    #[test]
    fn blockquote_and_rule_are_prefixed() {
        let rendered = render("> quoted\n\n---");
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "│ <q>quoted</q>");
        assert!(lines[2].starts_with("<hr>──"), "{rendered}");
    }

    #[test]
    fn table_columns_fit_the_widest_cell() {
        let rendered = render("| a | bb |\n| - | - |\n| ccc | d |");
        assert_eq!(
            rendered.lines().collect::<Vec<_>>(),
            vec![
                "┌─────┬────┐",
                "│ <b>a  </b> │ <b>bb</b> │",
                "├─────┼────┤",
                "│ ccc │ d  │",
                "└─────┴────┘",
            ]
        );
    }

    #[test]
    fn blank_text_renders_empty() {
        assert_eq!(render("  \n"), "");
    }

    #[test]
    fn ansi_theme_styles_inline_code() {
        let rendered = MarkdownRenderer::default().render("run `cargo`");
        assert_eq!(rendered, "run \x1b[33mcargo\x1b[39m\n");
    }

    #[test]
    fn known_language_is_highlighted_per_line() {
        let lines = highlight_code("let x = 1;\nlet y = 2;", Some("rs"));
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.contains("\x1b[38;2;")), "{lines:?}");
        assert!(lines.iter().all(|line| !line.contains('\n')));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_color() {
        assert_eq!(
            highlight_code("a\nb", Some("no-such-language")),
            vec!["\x1b[32ma\x1b[39m".to_string(), "\x1b[32mb\x1b[39m".to_string()]
        );
    }
}
