//! Inline Markdown in quote contents
//!
//! Captured text is page text plus three inline constructs: links, images
//! and code spans. Page characters that could open one of them are
//! backslash-escaped at capture time, so [`page_text`] can undo both steps
//! and recover exactly what the page renders.

/// Whether a page character is escaped in captured text
pub fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | '[' | ']' | '`')
}

/// Backslash-escape page text
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if needs_escape(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Link or image destination
///
/// Written bare when it parses back unchanged, otherwise in angle brackets.
pub fn destination(url: &str) -> String {
    let mut depth = 0i32;
    let mut bare = true;
    for c in url.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                bare &= depth >= 0;
            }
            '<' | '>' | '\\' => bare = false,
            c if c.is_whitespace() => bare = false,
            _ => {}
        }
    }
    if bare && depth == 0 {
        return url.to_string();
    }

    let mut out = String::from("<");
    for c in url.chars() {
        if matches!(c, '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('>');
    out
}

/// Quoted link or image title
pub fn title(text: &str) -> String {
    let mut out = String::from("\"");
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Text the page renders for captured Markdown
///
/// Links keep their text, images reduce to `![alt]`, code spans are kept
/// verbatim and escapes are resolved. Brackets that do not form a complete
/// link or image stay literal.
pub fn page_text(markdown: &str) -> String {
    let chars: Vec<char> = markdown.chars().collect();
    let mut out = String::with_capacity(markdown.len());
    render(&chars, &mut out);
    out
}

fn render(chars: &[char], out: &mut String) {
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1).is_some_and(|c| c.is_ascii_punctuation()) => {
                out.push(chars[i + 1]);
                i += 2;
            }
            '`' => {
                let end = code_span_end(chars, i).unwrap_or(i + run_length(chars, i));
                out.extend(&chars[i..end]);
                i = end;
            }
            '!' if chars.get(i + 1) == Some(&'[') => match inline(chars, i + 1) {
                Some((label, next)) => {
                    out.push_str("![");
                    render(label, out);
                    out.push(']');
                    i = next;
                }
                None => {
                    out.push('!');
                    i += 1;
                }
            },
            '[' => match inline(chars, i) {
                Some((label, next)) => {
                    render(label, out);
                    i = next;
                }
                None => {
                    out.push('[');
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn run_length(chars: &[char], from: usize) -> usize {
    chars[from..].iter().take_while(|&&c| c == '`').count()
}

/// End (exclusive) of the code span opened by the backtick run at `open`
fn code_span_end(chars: &[char], open: usize) -> Option<usize> {
    let run = run_length(chars, open);
    let mut i = open + run;
    while i < chars.len() {
        if chars[i] == '`' {
            let len = run_length(chars, i);
            if len == run {
                return Some(i + len);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

/// Label and end of a `[label](destination "title")` construct at `open`
fn inline(chars: &[char], open: usize) -> Option<(&[char], usize)> {
    let close = label_end(chars, open)?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }

    let mut i = skip_spaces(chars, close + 2);
    i = if chars.get(i) == Some(&'<') {
        angle_destination_end(chars, i)?
    } else {
        bare_destination_end(chars, i)
    };

    let after = skip_spaces(chars, i);
    i = match chars.get(after) {
        Some(&'"') if after > i => skip_spaces(chars, title_end(chars, after)?),
        _ => after,
    };
    if chars.get(i) != Some(&')') {
        return None;
    }
    Some((&chars[open + 1..close], i + 1))
}

/// Index of the `]` balancing the `[` at `open`
fn label_end(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '`' => {
                if let Some(end) = code_span_end(chars, i) {
                    i = end;
                    continue;
                }
            }
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_spaces(chars: &[char], from: usize) -> usize {
    from + chars[from.min(chars.len())..]
        .iter()
        .take_while(|c| c.is_whitespace())
        .count()
}

fn angle_destination_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '>' => return Some(i + 1),
            '<' | '\n' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn bare_destination_end(chars: &[char], from: usize) -> usize {
    let mut depth = 0usize;
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1).is_some_and(|c| c.is_ascii_punctuation()) => i += 1,
            '(' => depth += 1,
            ')' if depth == 0 => break,
            ')' => depth -= 1,
            c if c.is_whitespace() => break,
            _ => {}
        }
        i += 1;
    }
    i
}

fn title_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '"' => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a [b] `c` \\d"), "a \\[b\\] \\`c\\` \\\\d");
        assert_eq!(escape_text("plain text."), "plain text.");
    }

    #[test]
    fn test_destination() {
        assert_eq!(destination("https://x.com/a"), "https://x.com/a");
        assert_eq!(
            destination("https://en.wikipedia.org/wiki/Rust_(programming_language)"),
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
        assert_eq!(destination("https://x.com/a)b"), "<https://x.com/a)b>");
        assert_eq!(destination("https://x.com/a b"), "<https://x.com/a b>");
        assert_eq!(destination(""), "");
    }

    #[test]
    fn test_title() {
        assert_eq!(title("Sales (2024)"), "\"Sales (2024)\"");
        assert_eq!(title("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_links_keep_text() {
        assert_eq!(page_text("see [the docs](https://x.com/d) now"), "see the docs now");
        assert_eq!(
            page_text("Read [Rust](https://en.wikipedia.org/wiki/Rust_(programming_language)) now"),
            "Read Rust now"
        );
        assert_eq!(page_text("[odd](<https://x.com/a)b>)"), "odd");
    }

    #[test]
    fn test_images_reduce_to_alt() {
        assert_eq!(
            page_text("Fig ![chart](data:image/png;base64,AA== \"Sales (2024)\") end"),
            "Fig ![chart] end"
        );
        assert_eq!(page_text("![a]()"), "![a]");
        assert_eq!(page_text("[![logo](data:x)](https://x.com)"), "![logo]");
    }

    #[test]
    fn test_escapes_resolve_to_page_characters() {
        assert_eq!(page_text("Wow\\![link](https://x.com/l) ok"), "Wow!link ok");
        assert_eq!(
            page_text("Write \\[docs\\](https://x.com/d) like this"),
            "Write [docs](https://x.com/d) like this"
        );
        assert_eq!(page_text(&escape_text("a \\ b [c]")), "a \\ b [c]");
    }

    #[test]
    fn test_code_spans_are_verbatim() {
        assert_eq!(page_text("run `[x](https://y.z)` now"), "run `[x](https://y.z)` now");
        assert_eq!(page_text("```\nfn main() {}\n```"), "```\nfn main() {}\n```");
        assert_eq!(page_text("lone ` tick"), "lone ` tick");
    }

    #[test]
    fn test_incomplete_syntax_stays_literal() {
        assert_eq!(page_text("[a](b"), "[a](b");
        assert_eq!(page_text("[a] b"), "[a] b");
        assert_eq!(page_text("! [a]"), "! [a]");
    }
}
