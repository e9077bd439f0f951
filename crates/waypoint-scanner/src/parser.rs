//! Text and attribute parsing for scraped fragments.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use waypoint_core::Month;

static BUBBLE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bubble_(\d+)").expect("valid bubble class regex"));

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("valid leading number regex"));

// a whole single or double quoted JS string literal
static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")$"#)
        .expect("valid string literal regex")
});

const EXPERIENCE_PREFIX: &str = "Date of experience:";
const WRITTEN_PREFIX: &str = "Written";

/// Position of the detail URL among the click handler's call arguments.
const ONCLICK_URL_ARG: usize = 3;

/// Rating from a `bubble_NN` CSS class list, already scaled by ten.
pub fn rating_from_bubble_class(class_list: &str) -> Option<u32> {
    BUBBLE_CLASS
        .captures(class_list)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Rating from an accessibility label such as `"4.5 of 5 bubbles"`, scaled by ten.
pub fn rating_from_label(label: &str) -> Option<u32> {
    let value: f64 = LEADING_NUMBER
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())?;
    if !(0.0..=10.0).contains(&value) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((value * 10.0).round() as u32)
}

/// `"Date of experience: March 2023"` into month and year.
pub fn experience_date(text: &str) -> Option<(Month, i32)> {
    let rest = text.trim().strip_prefix(EXPERIENCE_PREFIX)?;
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let [month, year] = tokens.as_slice() else {
        return None;
    };
    Some((Month::parse(month)?, year.parse().ok()?))
}

/// `"Written 12 3 2023"` (or `"Written 12 March 2023"`) into day, month and year.
pub fn written_date(text: &str) -> Option<(u32, Month, i32)> {
    let rest = text.trim().strip_prefix(WRITTEN_PREFIX)?;
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let [day, month, year] = tokens.as_slice() else {
        return None;
    };
    let day: u32 = day.parse().ok().filter(|d| (1..=31).contains(d))?;
    Some((day, Month::parse(month)?, year.parse().ok()?))
}

/// Review body with line breaks flattened to spaces.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}

/// Top-level arguments of the first call in an inline script, as source text.
///
/// Commas inside strings, brackets and object literals do not split.
pub fn call_arguments(script: &str) -> Vec<String> {
    let Some(open) = script.find('(') else {
        return Vec::new();
    };

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in script[open + 1..].chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' if depth == 0 => break,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }
    args
}

/// Value of a quoted string literal, `None` for any other expression.
pub fn string_literal(expr: &str) -> Option<String> {
    let caps = STRING_LITERAL.captures(expr.trim())?;
    let body = caps.get(1).or_else(|| caps.get(2))?;
    Some(body.as_str().replace("\\/", "/"))
}

/// Resolve `path` against the site root.
pub fn absolute_url(base: &str, path: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(path.trim()).ok().map(String::from)
}

/// Detail URL carried by a listing card's inline click handler.
pub fn listing_url_from_onclick(onclick: &str, base: &str) -> Option<String> {
    let args = call_arguments(onclick);
    let path = string_literal(args.get(ONCLICK_URL_ARG)?)?;
    if path.is_empty() {
        return None;
    }
    absolute_url(base, &path)
}

/// Ask for a wider rendition of a review photo.
///
/// Only URLs that already carry a `w` query parameter are rewritten; anything
/// else, including unparseable input, comes back unchanged.
pub fn upgrade_image_url(raw: &str, width: u32) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if !url.query_pairs().any(|(k, _)| k == "w") {
        return raw.to_string();
    }

    let width = width.to_string();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "w" { width.clone() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.into()
}
