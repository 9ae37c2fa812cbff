//! `sitemap.xml` with hreflang alternates.

use crate::html::escape;
use crate::site::SiteConfig;
use std::fmt::Write as _;

/// Render the sitemap: one `<url>` per route, located at the sitemap
/// language's URL, with one alternate per language plus `x-default`.
pub fn sitemap(site: &SiteConfig) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n",
    );
    for route in &site.routes {
        out.push_str("<url>\n");
        let _ = writeln!(
            out,
            "  <loc>{}</loc>",
            escape(&site.localized_url(&site.sitemap_language, route))
        );
        for lang in &site.languages {
            alternate(&mut out, lang, &site.localized_url(lang, route));
        }
        alternate(&mut out, "x-default", &site.default_url(route));
        out.push_str("</url>\n");
    }
    out.push_str("</urlset>");
    out
}

fn alternate(out: &mut String, hreflang: &str, href: &str) {
    let _ = writeln!(
        out,
        "  <xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>",
        escape(hreflang),
        escape(href)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_route_once() {
        let xml = sitemap(&SiteConfig::nolimitpdf());
        assert_eq!(xml.matches("<url>").count(), 3);
        assert!(xml.contains("<loc>https://www.nolimitpdf.com/en</loc>"));
        assert!(xml.contains("<loc>https://www.nolimitpdf.com/en/image-to-pdf</loc>"));
        assert!(xml.contains(
            r#"<xhtml:link rel="alternate" hreflang="ko" href="https://www.nolimitpdf.com/ko/merge-pdf"/>"#
        ));
        assert!(xml.contains(
            r#"<xhtml:link rel="alternate" hreflang="x-default" href="https://www.nolimitpdf.com"/>"#
        ));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.ends_with("</urlset>"));
    }

    #[test]
    fn is_deterministic() {
        let site = SiteConfig::nolimitpdf();
        assert_eq!(sitemap(&site), sitemap(&site));
    }
}
