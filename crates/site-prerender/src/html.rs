//! Head-tag generation and template patching.

use crate::site::{PageMeta, SiteConfig};
use crate::PrerenderError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::fmt::Write as _;

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>.*?</title>").unwrap());
static RE_HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").unwrap());
static RE_HTML_LANG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)<html\s+lang="[^"]*""#).unwrap());
static RE_HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html\b").unwrap());

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Full SEO head block for one route in one language.
pub fn route_tags(site: &SiteConfig, lang: &str, route: &str) -> Result<String, PrerenderError> {
    let locale = site.locale(lang)?;
    let meta = site.page(lang, route)?;
    let canonical = site.localized_url(lang, route);

    let mut tags = String::new();
    push_basic(&mut tags, meta);
    push_link(&mut tags, "canonical", None, &canonical);
    for other in &site.languages {
        push_link(
            &mut tags,
            "alternate",
            Some(other.as_str()),
            &site.localized_url(other, route),
        );
    }
    push_link(&mut tags, "alternate", Some("x-default"), &site.default_url(route));

    push_meta(&mut tags, "property", "og:title", &meta.title);
    push_meta(&mut tags, "property", "og:description", &meta.description);
    push_meta(&mut tags, "property", "og:url", &canonical);
    if let Some(image) = &meta.og_image {
        push_meta(&mut tags, "property", "og:image", image);
    }
    push_meta(&mut tags, "property", "og:locale", &locale.og_locale);
    push_meta(&mut tags, "property", "og:type", "website");
    push_meta(&mut tags, "property", "og:site_name", &site.site_name);
    push_meta(&mut tags, "name", "twitter:card", "summary_large_image");
    push_meta(&mut tags, "name", "twitter:title", &meta.title);
    push_meta(&mut tags, "name", "twitter:description", &meta.description);
    if let Some(image) = &meta.og_image {
        push_meta(&mut tags, "name", "twitter:image", image);
    }

    let website = json!({
        "@context": "https://schema.org",
        "@type": "WebSite",
        "url": canonical,
        "name": meta.title,
        "description": meta.description,
        "potentialAction": {
            "@type": "SearchAction",
            "target": format!("{canonical}#search-{{search_term_string}}"),
            "query-input": "required name=search_term_string",
        },
    });
    let web_app = json!({
        "@context": "https://schema.org",
        "@type": "WebApplication",
        "name": site.site_name,
        "url": canonical,
        "applicationCategory": "ProductivityApplication",
        "operatingSystem": "All",
        "offers": {
            "@type": "Offer",
            "price": "0",
            "priceCurrency": "USD",
        },
    });
    push_json_ld(&mut tags, &website);
    push_json_ld(&mut tags, &web_app);

    Ok(tags)
}

/// Title and description only, for the 404 page.
pub fn not_found_tags(site: &SiteConfig, lang: &str) -> Result<String, PrerenderError> {
    let mut tags = String::new();
    push_basic(&mut tags, &site.locale(lang)?.not_found);
    Ok(tags)
}

/// Insert `tags` into `template` and set the document language.
///
/// An existing `<title>` is replaced by the block; otherwise the block goes
/// right after the opening `<head>`, or at the very top if there is none.
pub fn inject(template: &str, tags: &str, lang: &str) -> String {
    let html = if let Some(m) = RE_TITLE.find(template) {
        format!("{}{}{}", &template[..m.start()], tags, &template[m.end()..])
    } else if let Some(m) = RE_HEAD_OPEN.find(template) {
        format!("{}\n{}{}", &template[..m.end()], tags, &template[m.end()..])
    } else {
        format!("{tags}{template}")
    };

    let lang_attr = format!(r#"<html lang="{}""#, escape(lang));
    if RE_HTML_LANG.is_match(&html) {
        RE_HTML_LANG
            .replace(&html, regex::NoExpand(&lang_attr))
            .into_owned()
    } else {
        RE_HTML_OPEN
            .replace(&html, regex::NoExpand(&lang_attr))
            .into_owned()
    }
}

// ── Tag builders ─────────────────────────────────────────────────────────

fn push_basic(out: &mut String, meta: &PageMeta) {
    let _ = writeln!(out, "<title>{}</title>", escape(&meta.title));
    push_meta(out, "name", "description", &meta.description);
}

fn push_meta(out: &mut String, attr: &str, key: &str, content: &str) {
    let _ = writeln!(
        out,
        r#"<meta {attr}="{key}" content="{}" />"#,
        escape(content)
    );
}

fn push_link(out: &mut String, rel: &str, hreflang: Option<&str>, href: &str) {
    match hreflang {
        Some(lang) => {
            let _ = writeln!(
                out,
                r#"<link rel="{rel}" hreflang="{}" href="{}" />"#,
                escape(lang),
                escape(href)
            );
        }
        None => {
            let _ = writeln!(out, r#"<link rel="{rel}" href="{}" />"#, escape(href));
        }
    }
}

fn push_json_ld(out: &mut String, value: &serde_json::Value) {
    // `</` inside a string would close the script element early.
    let body = value.to_string().replace("</", "<\\/");
    let _ = writeln!(out, r#"<script type="application/ld+json">{body}</script>"#);
}
