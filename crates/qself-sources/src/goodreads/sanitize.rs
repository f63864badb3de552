use regex_lite::Regex;
use std::sync::OnceLock;

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<br ?/?>").expect("line break pattern is valid"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<a .*?href="(.*?)".*?>.*?</a>"#).expect("link pattern is valid"))
}

/// Goodreads adds HTML line breaks where the user typed newlines and wraps
/// links in anchors. Strip both and leave the review roughly Markdown-esque.
pub fn sanitize_review(review: &str) -> String {
    let review = line_break_re().replace_all(review, "\n");
    let review = link_re().replace_all(&review, "$1");
    let review = html_escape::decode_html_entities(&review);

    review.trim().to_string()
}
