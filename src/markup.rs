//! Answer rendering: semi-structured answer text to a typed markup fragment.
//!
//! The fragment tree is the single source of truth for a message body; it is
//! serialized to HTML for transcripts and walked directly by the TUI renderer.
//! Escaping is a property of the node kind: `Inline::Text` escapes when
//! serialized, `Inline::Raw` passes through verbatim. Assistant answer text
//! outside code regions is kept as `Raw` to match the upstream service's
//! formatting contract; user-authored text is always `Text`.

/// Escape `&`, `<` and `>` for safe embedding in markup. `&` first so
/// entities produced by the other two are not double-escaped.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain text, escaped on serialization.
    Text(String),
    /// Plain text emitted verbatim (assistant answer policy).
    Raw(String),
    /// Inline code span; content escaped on serialization.
    Code(String),
    Strong(Vec<Inline>),
    Em(Vec<Inline>),
    /// Single newline inside a paragraph.
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    /// Fenced code block, language tag already stripped.
    Code(String),
    /// List of source files cited by an answer.
    SourceFiles(Vec<String>),
}

/// A rendered message body: an ordered sequence of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub blocks: Vec<Block>,
}

impl Fragment {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(inlines) => {
                    out.push_str("<p>");
                    for inline in inlines {
                        serialize_inline(inline, &mut out);
                    }
                    out.push_str("</p>");
                }
                Block::Code(code) => {
                    out.push_str("<pre><code>");
                    out.push_str(&escape_html(code));
                    out.push_str("</code></pre>");
                }
                Block::SourceFiles(files) => {
                    out.push_str("<p class=\"sources\"><strong>Source Files:</strong>");
                    for file in files {
                        out.push_str(" <code>");
                        out.push_str(&escape_html(file));
                        out.push_str("</code>");
                    }
                    out.push_str("</p>");
                }
            }
        }
        out
    }
}

fn serialize_inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_html(text)),
        Inline::Raw(text) => out.push_str(text),
        Inline::Code(code) => {
            out.push_str("<code>");
            out.push_str(&escape_html(code));
            out.push_str("</code>");
        }
        Inline::Strong(children) => {
            out.push_str("<strong>");
            for child in children {
                serialize_inline(child, out);
            }
            out.push_str("</strong>");
        }
        Inline::Em(children) => {
            out.push_str("<em>");
            for child in children {
                serialize_inline(child, out);
            }
            out.push_str("</em>");
        }
        Inline::Break => out.push_str("<br>"),
    }
}

/// Render an assistant answer. Rules apply in order: fenced code blocks,
/// inline code spans, bold, italic, then paragraph/line breaks. Code content
/// is preserved verbatim; everything else follows the `Raw` answer policy.
pub fn format_answer(text: &str) -> Fragment {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let before = &rest[..open];
        push_paragraphs(before, &mut blocks);

        let after_open = &rest[open + 3..];
        // Optional language tag: everything up to the first newline is dropped.
        let content_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
        let content = &after_open[content_start..];
        match content.find("```") {
            Some(close) => {
                blocks.push(Block::Code(content[..close].trim_end_matches('\n').to_string()));
                rest = &content[close + 3..];
            }
            None => {
                // Unterminated fence: take the remainder as code.
                blocks.push(Block::Code(content.trim_end_matches('\n').to_string()));
                rest = "";
            }
        }
    }
    push_paragraphs(rest, &mut blocks);

    Fragment { blocks }
}

/// Render user-authored text: escaped paragraphs, no markup interpretation.
pub fn format_user_text(text: &str) -> Fragment {
    let mut blocks = Vec::new();
    for paragraph in split_paragraphs(text) {
        let mut inlines = Vec::new();
        for (i, line) in paragraph.lines().enumerate() {
            if i > 0 {
                inlines.push(Inline::Break);
            }
            inlines.push(Inline::Text(line.to_string()));
        }
        if !inlines.is_empty() {
            blocks.push(Block::Paragraph(inlines));
        }
    }
    Fragment { blocks }
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .collect()
}

fn push_paragraphs(text: &str, blocks: &mut Vec<Block>) {
    for paragraph in split_paragraphs(text) {
        let mut inlines = Vec::new();
        for (i, line) in paragraph.lines().enumerate() {
            if i > 0 {
                inlines.push(Inline::Break);
            }
            inlines.extend(parse_inline(line));
        }
        if !inlines.is_empty() {
            blocks.push(Block::Paragraph(inlines));
        }
    }
}

/// Parse one line of answer text into inline nodes. Code spans bind tightest,
/// then bold, then italic; an unclosed marker is kept as literal text.
fn parse_inline(line: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut plain = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    let flush = |plain: &mut String, nodes: &mut Vec<Inline>| {
        if !plain.is_empty() {
            let text = std::mem::take(plain);
            nodes.push(Inline::Raw(text));
        }
    };

    while i < chars.len() {
        match chars[i] {
            '`' => {
                if let Some(close) = find_char(&chars, i + 1, '`') {
                    flush(&mut plain, &mut nodes);
                    nodes.push(Inline::Code(chars[i + 1..close].iter().collect()));
                    i = close + 1;
                } else {
                    plain.push('`');
                    i += 1;
                }
            }
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if let Some(close) = find_double_star(&chars, i + 2) {
                    flush(&mut plain, &mut nodes);
                    let inner: String = chars[i + 2..close].iter().collect();
                    nodes.push(Inline::Strong(parse_inline(&inner)));
                    i = close + 2;
                } else {
                    plain.push_str("**");
                    i += 2;
                }
            }
            '*' => {
                if let Some(close) = find_char(&chars, i + 1, '*') {
                    flush(&mut plain, &mut nodes);
                    let inner: String = chars[i + 1..close].iter().collect();
                    nodes.push(Inline::Em(parse_inline(&inner)));
                    i = close + 1;
                } else {
                    plain.push('*');
                    i += 1;
                }
            }
            c => {
                plain.push(c);
                i += 1;
            }
        }
    }
    flush(&mut plain, &mut nodes);
    nodes
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == needle)
}

fn find_double_star(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&i| chars[i] == '*' && chars[i + 1] == '*')
}
