//! Line and delimiter helpers shared by the analyzers.
//!
//! Nothing here parses a language. Delimiter counting skips string literals
//! and `//` line comments, which is enough to keep brace depth honest on
//! ordinary source.

/// Cut `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// First non-empty line that is not a comment, cut to 80 characters.
pub fn first_content_line(content: &str, comment_prefixes: &[&str]) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !comment_prefixes.iter().any(|p| line.starts_with(p)))
        .map(|line| truncate_chars(line, 80))
}

/// `"1 route"`, `"3 routes"`, `"2 classes"`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else if noun.ends_with('s') || noun.ends_with('x') || noun.ends_with("ch") {
        format!("{} {}es", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Number of leading whitespace characters (tabs count as one).
pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Scans characters while tracking string literals and line comments.
struct CodeChars<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    quote: Option<char>,
}

impl<'a> CodeChars<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            quote: None,
        }
    }
}

impl Iterator for CodeChars<'_> {
    /// (char, is_code) where `is_code` is false inside string literals.
    type Item = (char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        if let Some(q) = self.quote {
            if c == '\\' {
                self.chars.next();
            } else if c == q {
                self.quote = None;
            } else if c == '\n' && q != '`' {
                self.quote = None;
            }
            return Some((c, false));
        }
        match c {
            '"' | '\'' | '`' => {
                self.quote = Some(c);
                Some((c, false))
            }
            '/' if self.chars.peek() == Some(&'/') => {
                // skip to end of line
                for next in self.chars.by_ref() {
                    if next == '\n' {
                        return Some(('\n', true));
                    }
                }
                None
            }
            _ => Some((c, true)),
        }
    }
}

/// Net change in `open`/`close` depth across one line of code.
pub fn delimiter_delta(line: &str, open: char, close: char) -> i32 {
    CodeChars::new(line).fold(0, |depth, (c, code)| match (c, code) {
        (c, true) if c == open => depth + 1,
        (c, true) if c == close => depth - 1,
        _ => depth,
    })
}

pub fn brace_delta(line: &str) -> i32 {
    delimiter_delta(line, '{', '}')
}

/// Index of the line where the brace block opened at or after `start` closes.
///
/// Gives up after `max_lines` lines. Returns `start` when no brace opens
/// within the window.
pub fn block_end(lines: &[&str], start: usize, max_lines: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    let end = lines.len().min(start.saturating_add(max_lines));
    for (idx, line) in lines.iter().enumerate().take(end).skip(start) {
        for (c, code) in CodeChars::new(line) {
            if !code {
                continue;
            }
            if c == '{' {
                depth += 1;
                opened = true;
            } else if c == '}' {
                depth -= 1;
            }
        }
        if opened && depth <= 0 {
            return idx;
        }
    }
    if opened {
        end.saturating_sub(1).max(start)
    } else {
        start
    }
}

/// Text between the first `open` at or after line `start` and its matching
/// `close`, which may be on the same line.
///
/// # Returns
/// `(inner_text, closing_line_index)`, or `None` when no block opens. An
/// unclosed block yields everything up to the end of input.
pub fn find_block(lines: &[&str], start: usize, open: char, close: char) -> Option<(String, usize)> {
    let mut depth = 0i32;
    let mut inner = String::new();

    for (idx, line) in lines.iter().enumerate().skip(start) {
        for (c, code) in CodeChars::new(line) {
            if code && c == open {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            } else if code && c == close && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    return Some((inner, idx));
                }
            }
            if depth > 0 {
                inner.push(c);
            }
        }
        if depth > 0 {
            inner.push('\n');
        } else if idx > start + 2 {
            // no block within the first few lines
            return None;
        }
    }

    if depth > 0 {
        Some((inner, lines.len().saturating_sub(1)))
    } else {
        None
    }
}

/// Split `text` on any of `separators` that sit at nesting depth zero.
///
/// Parentheses, brackets, braces and angle brackets nest; `=>` is not treated
/// as a closing angle. Empty pieces are dropped.
pub fn split_top_level(text: &str, separators: &[char]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut prev = '\0';

    for (c, code) in CodeChars::new(text) {
        if code {
            match c {
                '(' | '[' | '{' | '<' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                '>' if prev != '=' => depth -= 1,
                _ => {}
            }
            if depth <= 0 && separators.contains(&c) {
                depth = 0;
                push_piece(&mut parts, &current);
                current.clear();
                prev = c;
                continue;
            }
        }
        current.push(c);
        prev = c;
    }
    push_piece(&mut parts, &current);
    parts
}

fn push_piece(parts: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        parts.push(piece.to_string());
    }
}

/// Arguments of a call whose opening parenthesis has already been consumed.
///
/// Stops at the parenthesis that closes the call. The second value is false
/// when the call does not close on this text.
pub fn call_arguments(text: &str) -> (Vec<String>, bool) {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for (c, code) in CodeChars::new(text) {
        if code {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' if depth > 0 => depth -= 1,
                ')' => {
                    push_piece(&mut args, &current);
                    return (args, true);
                }
                ',' if depth == 0 => {
                    push_piece(&mut args, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            }
        }
        current.push(c);
    }
    push_piece(&mut args, &current);
    (args, false)
}

/// Parameter names from a raw parameter list.
///
/// Drops type annotations and default values; keeps destructuring patterns
/// and rest markers as written.
pub fn parse_params(raw: &str) -> Vec<String> {
    split_top_level(raw, &[','])
        .into_iter()
        .filter_map(|param| {
            let param = param.trim();
            if param.starts_with('{') || param.starts_with('[') {
                let end = param.rfind(['}', ']']).map(|i| i + 1).unwrap_or(param.len());
                return Some(param[..end].to_string());
            }
            let name = param
                .split(|c| c == ':' || c == '=')
                .next()
                .unwrap_or("")
                .trim()
                .trim_end_matches('?');
            // Java/C# style "Type name"
            let name = name.rsplit(char::is_whitespace).next().unwrap_or(name);
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Split an identifier into lowercase words.
///
/// `getUserByID` → `["get", "user", "by", "id"]`, `load_config` →
/// `["load", "config"]`.
pub fn split_identifier(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '$' || c == '#' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev_lower || next_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `getUserData` → `Get user data`.
pub fn format_identifier(name: &str) -> String {
    let joined = split_identifier(name).join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name.to_string(),
    }
}
