//! # site-prerender
//!
//! Build-time SEO prerendering for the nolimitpdf web front end.
//!
//! Takes the bundler's `dist/index.html` and writes one copy per language
//! and route with the right `<title>`, description, canonical URL, hreflang
//! alternates, Open Graph / Twitter card tags and two JSON-LD blocks
//! (`WebSite`, `WebApplication`). Also writes a localised `404.html` per
//! language and a `sitemap.xml`.
//!
//! Everything here is a pure function of the template and the
//! [`SiteConfig`]: the same inputs always produce byte-identical output.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use site_prerender::{prerender, SiteConfig};
//!
//! let report = prerender(&SiteConfig::nolimitpdf(), "dist").expect("prerender failed");
//! eprintln!("wrote {} files", report.written.len());
//! ```
//!
//! ## Output layout
//!
//! ```text
//! dist/
//!  ├─ ko/index.html  ko/image-to-pdf.html  ko/merge-pdf.html  ko/404.html
//!  ├─ en/index.html  en/image-to-pdf.html  en/merge-pdf.html  en/404.html
//!  └─ sitemap.xml
//! ```

pub mod html;
pub mod site;
pub mod sitemap;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use html::{escape, inject};
pub use site::{output_file, LocaleMeta, PageMeta, SiteConfig, SITE_NAME, SITE_URL};
pub use sitemap::sitemap;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by prerendering.
#[derive(Error, Debug)]
pub enum PrerenderError {
    /// The bundled `index.html` is missing or unreadable.
    #[error("Cannot read template '{path}': {source}\nRun the web build first so that index.html exists.")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output file or directory could not be written.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No metadata for a language.
    #[error("No metadata for language '{lang}'")]
    UnknownLanguage { lang: String },

    /// No metadata for a route in a language.
    #[error("No metadata for route '{route}' in language '{lang}'")]
    UnknownRoute { lang: String, route: String },

    /// The site description is inconsistent.
    #[error("Invalid site configuration: {0}")]
    InvalidConfig(String),
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// The template with one route's head block injected.
pub fn render_route(
    site: &SiteConfig,
    template: &str,
    lang: &str,
    route: &str,
) -> Result<String, PrerenderError> {
    let tags = html::route_tags(site, lang, route)?;
    Ok(inject(template, &tags, lang))
}

/// The template with a language's 404 title and description injected.
pub fn render_not_found(
    site: &SiteConfig,
    template: &str,
    lang: &str,
) -> Result<String, PrerenderError> {
    let tags = html::not_found_tags(site, lang)?;
    Ok(inject(template, &tags, lang))
}

// ── Writing ──────────────────────────────────────────────────────────────────

/// Files produced by [`prerender`], in write order.
#[derive(Debug, Clone, Default)]
pub struct PrerenderReport {
    pub written: Vec<PathBuf>,
}

/// Read `<dist>/index.html` and write every localised page plus the sitemap.
pub fn prerender(
    site: &SiteConfig,
    dist: impl AsRef<Path>,
) -> Result<PrerenderReport, PrerenderError> {
    let dist = dist.as_ref();
    site.validate()?;

    let template_path = dist.join("index.html");
    let template =
        std::fs::read_to_string(&template_path).map_err(|source| PrerenderError::Template {
            path: template_path.clone(),
            source,
        })?;
    info!(
        "Prerendering {} route(s) × {} language(s) into {}",
        site.routes.len(),
        site.languages.len(),
        dist.display()
    );

    let mut report = PrerenderReport::default();
    for lang in &site.languages {
        let lang_dir = dist.join(lang);
        std::fs::create_dir_all(&lang_dir).map_err(|source| PrerenderError::Write {
            path: lang_dir.clone(),
            source,
        })?;

        for route in &site.routes {
            let html = render_route(site, &template, lang, route)?;
            let path = lang_dir.join(output_file(route));
            write(&path, &html)?;
            report.written.push(path);
        }

        let path = lang_dir.join("404.html");
        write(&path, &render_not_found(site, &template, lang)?)?;
        report.written.push(path);
    }

    let path = dist.join("sitemap.xml");
    write(&path, &sitemap(site))?;
    report.written.push(path);

    info!("Prerendered {} file(s)", report.written.len());
    Ok(report)
}

fn write(path: &Path, contents: &str) -> Result<(), PrerenderError> {
    std::fs::write(path, contents).map_err(|source| PrerenderError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Prerendered: {}", path.display());
    Ok(())
}
