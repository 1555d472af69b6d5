//! HTML shell around mirrored pages.

use std::fmt::Write as _;

use wpmirror_site::PageView;

/// Wrap a rendered page in a document, re-inserting its scripts.
pub(crate) fn page_shell(page: &PageView, stylesheet: &str) -> String {
    let mut html = String::with_capacity(page.html.len() + 512);
    html.push_str("<!DOCTYPE html>\n");
    let _ = write!(html, "<html lang=\"{}\">\n<head>\n", escape_attr(&page.lang));
    html.push_str("<meta charset=\"utf-8\">\n");
    if let Some(title) = &page.title {
        let _ = writeln!(html, "<title>{title}</title>");
    }
    let _ = writeln!(
        html,
        "<link rel=\"stylesheet\" href=\"{}\">",
        escape_attr(stylesheet)
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&page.html);
    html.push('\n');
    for src in &page.scripts {
        let _ = writeln!(html, "<script src=\"{}\"></script>", escape_attr(src));
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
