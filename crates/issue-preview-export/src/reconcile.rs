//! Ordered-list numbering reconciliation.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

static GENERIC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)1\.(\s)").expect("valid marker regex"));

/// Restore explicit list numbers in pretty-printed Markdown.
///
/// Every line starting with the generic `1.` marker takes the next number
/// from `original`, keeping its indentation. The match is positional: once
/// the numbers run out the remaining markers stay `1.`.
pub fn reconcile_numbering(formatted: &str, original: &[u64]) -> String {
    let mut queue: VecDeque<u64> = original.iter().copied().collect();
    let mut out = String::with_capacity(formatted.len());

    for line in formatted.split_inclusive('\n') {
        let Some(caps) = GENERIC_MARKER.captures(line) else {
            out.push_str(line);
            continue;
        };
        let Some(number) = queue.pop_front() else {
            out.push_str(line);
            continue;
        };

        let marker = &caps[0];
        out.push_str(&caps[1]);
        out.push_str(&number.to_string());
        out.push('.');
        out.push_str(&caps[2]);
        out.push_str(&line[marker.len()..]);
    }

    out
}
