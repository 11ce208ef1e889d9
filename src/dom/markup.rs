// Markup scanner
//
// Tolerant reader for the HTML/SVG fragments the backend renders. It does
// not build a full tree: the controller only needs the elements (for hover
// markers, tooltips and navigation targets) and the visible text items.

use super::{Element, Subtree};

/// Elements that never have a closing tag
const VOID_TAGS: [&str; 8] = ["br", "hr", "img", "input", "meta", "link", "area", "wbr"];

/// Parse fragment markup into a detached subtree
pub fn parse_markup(markup: &str) -> Subtree {
    let mut subtree = Subtree::default();
    // Indices into subtree.elements of currently open elements
    let mut open: Vec<usize> = Vec::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&mut subtree, &open, rest);
            break;
        };
        if lt > 0 {
            push_text(&mut subtree, &open, &rest[..lt]);
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }

        if rest.starts_with("</") {
            let Some(end) = rest.find('>') else { break };
            let name = rest[2..end].trim().to_ascii_lowercase();
            close_element(&mut open, &subtree, &name);
            rest = &rest[end + 1..];
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let Some(end) = rest.find('>') else { break };
            rest = &rest[end + 1..];
            continue;
        }

        match scan_tag(&rest[1..]) {
            Some((tag, consumed)) => {
                rest = &rest[1 + consumed..];
                let name = tag.element.tag.clone();
                subtree.elements.push(tag.element);
                let idx = subtree.elements.len() - 1;
                if !tag.self_closing && !VOID_TAGS.contains(&name.as_str()) {
                    open.push(idx);
                }
            }
            None => {
                // A '<' that does not start a tag is text up to the next '<'
                let next = rest[1..].find('<').map_or(rest.len(), |i| i + 1);
                push_text(&mut subtree, &open, &rest[..next]);
                rest = &rest[next..];
            }
        }
    }

    subtree
}

struct ScannedTag {
    element: Element,
    self_closing: bool,
}

/// Scan `name attr='v' ...>` (the text after '<'); returns the element and
/// the number of bytes consumed including the closing '>'
fn scan_tag(input: &str) -> Option<(ScannedTag, usize)> {
    let bytes = input.as_bytes();
    let name_len = input
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(input.len());
    if name_len == 0 || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let mut element = Element::new(&input[..name_len].to_ascii_lowercase());
    let mut pos = name_len;
    let mut self_closing = false;

    loop {
        pos += count_whitespace(&input[pos..]);
        match bytes.get(pos) {
            None => return None,
            Some(b'>') => return Some((ScannedTag { element, self_closing }, pos + 1)),
            Some(b'/') => {
                self_closing = true;
                pos += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let key_len = input[pos..]
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(input.len() - pos);
        if key_len == 0 {
            // Garbage such as a lone quote; skip it
            pos += 1;
            continue;
        }
        let key = input[pos..pos + key_len].to_ascii_lowercase();
        pos += key_len;
        pos += count_whitespace(&input[pos..]);

        if bytes.get(pos) != Some(&b'=') {
            element.attrs.push((key, String::new()));
            continue;
        }
        pos += 1;
        pos += count_whitespace(&input[pos..]);

        let value = match bytes.get(pos) {
            Some(&quote) if quote == b'\'' || quote == b'"' => {
                let body = &input[pos + 1..];
                let close = body.find(quote as char)?;
                pos += close + 2;
                &body[..close]
            }
            Some(_) => {
                let len = input[pos..]
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(input.len() - pos);
                let value = &input[pos..pos + len];
                pos += len;
                value
            }
            None => return None,
        };
        element.attrs.push((key, decode_entities(value)));
    }
}

fn count_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn close_element(open: &mut Vec<usize>, subtree: &Subtree, name: &str) {
    // Pop up to and including the nearest matching element; ignore
    // closing tags with no open counterpart
    if let Some(depth) = open
        .iter()
        .rposition(|&idx| subtree.elements[idx].tag == name)
    {
        open.truncate(depth);
    }
}

fn push_text(subtree: &mut Subtree, open: &[usize], raw: &str) {
    let text = decode_entities(raw);
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if let Some(&idx) = open.last() {
        let element = &mut subtree.elements[idx];
        if !element.text.is_empty() {
            element.text.push(' ');
        }
        element.text.push_str(text);
    }
    subtree.text_items.push(text.to_string());
}

/// Decode the handful of entities the backend emits
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
