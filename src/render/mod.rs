//! HTML rendering of the router table.
//!
//! The page is self-contained (inline CSS, no scripts) so the dashboard has
//! no static assets besides cached icons.

use std::fmt::Write;
use std::time::Duration;

use crate::{
    core::{DashboardError, DashboardResult},
    traefik::DisplayRouter,
};

/// Everything the page needs.
#[derive(Debug)]
pub struct Page<'a> {
    pub routers: &'a [DisplayRouter],
    /// Time since the last successful poll, if there was one
    pub refreshed_ago: Option<Duration>,
}

pub trait Renderer: Send + Sync {
    fn render(&self, page: &Page<'_>) -> DashboardResult<String>;
}

#[derive(Clone, Debug)]
pub struct HtmlRenderer {
    title: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new("Traefik Dashboard")
    }
}

impl HtmlRenderer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }

    fn write_page(&self, out: &mut String, page: &Page<'_>) -> std::fmt::Result {
        let title = escape(&self.title);
        write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <meta http-equiv=\"refresh\" content=\"30\">\n<title>{title}</title>\n\
             <style>{STYLE}</style>\n</head>\n<body>\n<header><h1>{title}</h1>"
        )?;

        match page.refreshed_ago {
            Some(ago) => write!(
                out,
                "<p class=\"meta\">{} routers &middot; refreshed {}s ago</p>",
                page.routers.len(),
                ago.as_secs()
            )?,
            None => write!(out, "<p class=\"meta\">Waiting for the first refresh</p>")?,
        }
        out.push_str("</header>\n<main>\n");

        if page.routers.is_empty() {
            out.push_str("<p class=\"empty\">No routers discovered.</p>\n");
        } else {
            out.push_str("<div class=\"grid\">\n");
            for router in page.routers {
                write_card(out, router)?;
            }
            out.push_str("</div>\n");
        }

        out.push_str("</main>\n</body>\n</html>\n");
        Ok(())
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, page: &Page<'_>) -> DashboardResult<String> {
        let mut out = String::with_capacity(2048 + page.routers.len() * 512);
        self.write_page(&mut out, page)
            .map_err(|e| DashboardError::Render(e.to_string()))?;
        Ok(out)
    }
}

fn write_card(out: &mut String, router: &DisplayRouter) -> std::fmt::Result {
    let name = escape(&router.name);
    write!(out, "<article class=\"card {}\">", escape(&router.status))?;

    if let Some(icon) = &router.icon {
        write!(out, "<img src=\"{}\" alt=\"\" width=\"48\" height=\"48\">", escape(icon))?;
    }

    if router.has_url() {
        write!(
            out,
            "<h2><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{name}</a></h2>",
            escape(&router.url)
        )?;
    } else {
        write!(out, "<h2>{name}</h2>")?;
    }

    write!(
        out,
        "<dl><dt>Rule</dt><dd><code>{}</code></dd>\
         <dt>Service</dt><dd>{}</dd>\
         <dt>Entry points</dt><dd>{}</dd>\
         <dt>TLS</dt><dd>{}</dd></dl>\
         <span class=\"badge\">{}</span></article>\n",
        escape(&router.rule),
        escape(&router.service),
        escape(&router.entry_points.join(", ")),
        if router.tls { "Yes" } else { "No" },
        escape(&router.status),
    )
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;background:#f3f4f6;color:#111827}\
header{padding:1.5rem 2rem;background:#1f2937;color:#f9fafb}\
header h1{margin:0;font-size:1.5rem}\
.meta{margin:.25rem 0 0;color:#9ca3af;font-size:.875rem}\
main{padding:2rem}\
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(280px,1fr));gap:1rem}\
.card{background:#fff;border-radius:.75rem;padding:1rem;box-shadow:0 1px 3px rgba(0,0,0,.1);position:relative}\
.card img{float:right}\
.card h2{margin:0 0 .5rem;font-size:1.1rem;word-break:break-all}\
.card a{color:#2563eb;text-decoration:none}\
dl{margin:0;font-size:.85rem}dt{font-weight:600;color:#6b7280}dd{margin:0 0 .4rem;word-break:break-all}\
.badge{display:inline-block;padding:.1rem .5rem;border-radius:999px;font-size:.75rem;background:#d1fae5;color:#065f46}\
.disabled{opacity:.6}.disabled .badge{background:#fee2e2;color:#991b1b}\
.empty{color:#6b7280}";
