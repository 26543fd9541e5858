//! Glob Pattern Helpers
//!
//! Translates store-style glob patterns (`*`, `?`, `[...]`, `\x`) so the
//! in-process backend answers `keys` the same way a networked
//! store answers `SCAN MATCH`.

use regex::Regex;

use crate::error::Result;

/// Characters with a special meaning in glob patterns.
const GLOB_META: [char; 5] = ['*', '?', '[', ']', '\\'];

// == Glob To Regex ==
/// Compiles a glob pattern into an anchored regular expression.
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut re = String::with_capacity(glob.len() * 2 + 8);
    re.push_str("(?s)^");

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => re.push_str(r"\\"),
            },
            '[' => {
                let negated = matches!(chars.peek(), Some('^') | Some('!'));
                if negated {
                    chars.next();
                }
                let mut items: Vec<(char, bool)> = Vec::new();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                items.push((escaped, true));
                            }
                        }
                        other => items.push((other, false)),
                    }
                }
                if closed && !items.is_empty() {
                    re.push('[');
                    if negated {
                        re.push('^');
                    }
                    re.push_str(&class_body(&items));
                    re.push(']');
                } else {
                    // unterminated or empty class: literal bracket text
                    re.push_str(r"\[");
                    let text: String = items.iter().map(|(c, _)| *c).collect();
                    re.push_str(&regex::escape(&text));
                    if closed {
                        re.push_str(r"\]");
                    }
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }

    re.push('$');
    Ok(Regex::new(&re)?)
}

/// Builds a regex class body. Reversed ranges such as `z-a` are swapped, as
/// the store's own matcher does.
fn class_body(items: &[(char, bool)]) -> String {
    let mut body = String::new();
    let mut i = 0;
    while i < items.len() {
        let (start, _) = items[i];
        match (items.get(i + 1), items.get(i + 2)) {
            (Some(('-', false)), Some(&(end, _))) => {
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                body.push_str(&regex::escape(&lo.to_string()));
                body.push('-');
                body.push_str(&regex::escape(&hi.to_string()));
                i += 3;
            }
            _ => {
                body.push_str(&regex::escape(&start.to_string()));
                i += 1;
            }
        }
    }
    body
}

// == Escape Glob ==
/// Escapes glob metacharacters so `text` matches only itself.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if GLOB_META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Glob matching every key that starts with `prefix`.
pub fn prefix_glob(prefix: &str) -> String {
    format!("{}*", escape_glob(prefix))
}
