//! HTML pages.

use crate::history::{HistoryFilter, HistoryPage};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt::Write;

const STYLE: &str = r#"
    body { font-family: sans-serif; background: #111; color: #eee; margin: 2rem; }
    a { color: #7cf; }
    img.live { max-width: 100%; border: 1px solid #333; }
    .day { margin-top: 2rem; }
    .grid { display: flex; flex-wrap: wrap; gap: 0.75rem; }
    figure { margin: 0; }
    figure img { width: 240px; border: 1px solid #333; }
    figcaption { font-size: 0.8rem; color: #aaa; }
    nav { margin-top: 2rem; display: flex; gap: 1rem; align-items: center; }
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

/// Landing page with the live stream.
pub fn index_page() -> String {
    layout(
        "Live Camera",
        r#"<h1>Live Camera</h1>
<img class="live" src="/video_feed" alt="Live feed">
<p><a href="/pre_recordings">Browse recordings</a></p>"#,
    )
}

/// Query string for `page` under `filter`.
fn page_query(page: u64, filter: &HistoryFilter) -> String {
    let mut query = format!("page={page}");
    if let Some(date) = filter.date {
        let _ = write!(query, "&date={}", date.format("%Y-%m-%d"));
        if let Some(hour) = filter.hour {
            let _ = write!(query, "&hour={hour}");
        }
    }
    query
}

fn filter_form(filter: &HistoryFilter) -> String {
    let date = filter
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let mut hours = String::from(r#"<option value="">Any hour</option>"#);
    for hour in 0..24 {
        let selected = if filter.hour == Some(hour) { " selected" } else { "" };
        let _ = write!(hours, r#"<option value="{hour}"{selected}>{hour:02}:00</option>"#);
    }

    format!(
        r#"<form method="get" action="/pre_recordings">
<label>Date <input type="date" name="date" value="{date}"></label>
<label>Hour <select name="hour">{hours}</select></label>
<button type="submit">Filter</button>
<a href="/pre_recordings">Clear</a>
</form>"#
    )
}

/// Paginated history grouped by date.
pub fn history_page(page: &HistoryPage) -> String {
    let mut body = String::from("<h1>Recordings</h1>\n<p><a href=\"/\">Live view</a></p>\n");
    body.push_str(&filter_form(&page.filter));

    if page.is_empty() {
        body.push_str("\n<p>No frames recorded for this selection.</p>");
    }

    for (date, entries) in &page.groups {
        let _ = write!(
            body,
            "\n<section class=\"day\"><h2>{}</h2><div class=\"grid\">",
            date.format("%Y-%m-%d")
        );
        for entry in entries {
            let _ = write!(
                body,
                r#"<figure><img src="data:image/jpeg;base64,{}" alt="Frame"><figcaption>{}</figcaption></figure>"#,
                STANDARD.encode(&entry.image),
                entry.timestamp.format("%H:%M:%S"),
            );
        }
        body.push_str("</div></section>");
    }

    body.push_str("\n<nav>");
    if page.page > 1 {
        let _ = write!(
            body,
            r#"<a href="/pre_recordings?{}">&laquo; Previous</a>"#,
            page_query(page.page - 1, &page.filter)
        );
    }
    let _ = write!(
        body,
        "<span>Page {} of {} ({} frames)</span>",
        page.page, page.total_pages, page.total_frames
    );
    if page.page < page.total_pages {
        let _ = write!(
            body,
            r#"<a href="/pre_recordings?{}">Next &raquo;</a>"#,
            page_query(page.page + 1, &page.filter)
        );
    }
    body.push_str("</nav>");

    layout("Recordings", &body)
}
