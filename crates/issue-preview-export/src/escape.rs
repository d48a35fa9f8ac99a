//! Markdown escaping shared by the converter and the formatter.

/// Escape characters that would otherwise start inline Markdown syntax.
pub(crate) fn escape_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let escape = match c {
            '\\' | '`' | '*' | '[' | ']' | '<' | '~' => true,
            '&' => starts_entity(&chars[i + 1..]),
            // Intraword underscores never open emphasis.
            '_' => {
                let before = i.checked_sub(1).map(|j| chars[j]);
                let after = chars.get(i + 1).copied();
                !(before.is_some_and(char::is_alphanumeric)
                    && after.is_some_and(char::is_alphanumeric))
            }
            _ => false,
        };

        if escape {
            out.push('\\');
        }
        out.push(c);
    }

    out
}

/// Whether the text after an `&` reads as a character reference
/// (`copy;`, `#169;`, `#xA9;`).
fn starts_entity(rest: &[char]) -> bool {
    let Some(end) = rest.iter().position(|&c| c == ';') else {
        return false;
    };
    let name = &rest[..end];

    match name {
        ['#', 'x' | 'X', hex @ ..] => !hex.is_empty() && hex.iter().all(char::is_ascii_hexdigit),
        ['#', digits @ ..] => !digits.is_empty() && digits.iter().all(char::is_ascii_digit),
        [first, tail @ ..] => {
            first.is_ascii_alphabetic() && tail.iter().all(char::is_ascii_alphanumeric)
        }
        [] => false,
    }
}

/// Escape block syntax at the start of every line of a paragraph.
pub(crate) fn escape_line_starts(text: &str) -> String {
    text.split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    let bytes = line.as_bytes();
    let followed_by_space = |i: usize| bytes.get(i).map_or(true, |b| b.is_ascii_whitespace());

    // `1. ` / `1) ` would start an ordered list.
    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if (1..=9).contains(&digits)
        && matches!(bytes.get(digits), Some(b'.') | Some(b')'))
        && followed_by_space(digits + 1)
    {
        return format!("{}\\{}", &line[..digits], &line[digits..]);
    }

    // ATX heading.
    let hashes = bytes.iter().take_while(|&&b| b == b'#').count();
    if (1..=6).contains(&hashes) && followed_by_space(hashes) {
        return format!("\\{}", line);
    }

    match bytes.first() {
        Some(b'-') | Some(b'+') if followed_by_space(1) => format!("\\{}", line),
        Some(b'>') => format!("\\{}", line),
        // Setext underline.
        Some(b'=') | Some(b'-') if line.trim_end().bytes().all(|b| b == bytes[0]) => {
            format!("\\{}", line)
        }
        _ => line.to_string(),
    }
}
