// src/tasks/minify.rs

/// Elements whose contents are copied untouched.
const RAW_TEXT_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Collapse insignificant whitespace in HTML.
///
/// Runs of whitespace become a single space; runs that sit between two tags
/// or at either end of the document are dropped. The contents of `<pre>`,
/// `<textarea>`, `<script>` and `<style>` are left alone.
pub fn collapse_whitespace(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < html.len() {
        if let Some(tag) = raw_element_at(&lower, i) {
            let end = raw_element_end(&lower, i, tag);
            out.push_str(&html[i..end]);
            i = end;
            continue;
        }

        let Some(ch) = html[i..].chars().next() else {
            break;
        };

        if ch.is_whitespace() {
            while let Some(c) = html[i..].chars().next() {
                if !c.is_whitespace() {
                    break;
                }
                i += c.len_utf8();
            }
            let prev = out.chars().last();
            let next = html[i..].chars().next();
            let between_tags = prev == Some('>') && next == Some('<');
            if !between_tags && prev.is_some() && next.is_some() {
                out.push(' ');
            }
            continue;
        }

        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn raw_element_at(lower: &str, i: usize) -> Option<&'static str> {
    let rest = lower.get(i..)?.strip_prefix('<')?;
    RAW_TEXT_ELEMENTS.iter().copied().find(|tag| {
        rest.strip_prefix(tag)
            .and_then(|after| after.chars().next())
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
    })
}

/// Byte offset just past the closing tag of the raw element starting at `i`,
/// or the end of input when it is never closed.
fn raw_element_end(lower: &str, i: usize, tag: &str) -> usize {
    let close = format!("</{tag}");
    let Some(offset) = lower[i + 1..].find(&close) else {
        return lower.len();
    };
    let close_start = i + 1 + offset;
    match lower[close_start..].find('>') {
        Some(gt) => close_start + gt + 1,
        None => lower.len(),
    }
}
