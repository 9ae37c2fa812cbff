//! Site description: base URL, languages, routes and per-locale metadata.

use crate::PrerenderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Production origin.
pub const SITE_URL: &str = "https://www.nolimitpdf.com";

/// Brand name used in `og:site_name` and the `WebApplication` schema.
pub const SITE_NAME: &str = "NoLimitPDF";

/// Title, description and share image of one page in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
}

impl PageMeta {
    fn new(title: &str, description: &str, og_image: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            og_image: og_image.map(str::to_string),
        }
    }
}

/// Everything one language needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleMeta {
    /// Open Graph locale, e.g. `ko_KR`.
    pub og_locale: String,
    /// Metadata keyed by route (`/`, `/merge-pdf`, …).
    pub routes: BTreeMap<String, PageMeta>,
    /// Metadata for the language's 404 page.
    pub not_found: PageMeta,
}

/// The full site description that drives prerendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site_url: String,
    pub site_name: String,
    /// Routes in output order. `/` is the landing page.
    pub routes: Vec<String>,
    /// Language codes in output order.
    pub languages: Vec<String>,
    /// Per-language metadata.
    pub locales: BTreeMap<String, LocaleMeta>,
    /// Language whose URLs are listed as `<loc>` in the sitemap.
    pub sitemap_language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::nolimitpdf()
    }
}

impl SiteConfig {
    /// The production site: two languages, three routes.
    pub fn nolimitpdf() -> Self {
        let og_image = format!("{SITE_URL}/og-main.png");
        let img = Some(og_image.as_str());

        let ko = LocaleMeta {
            og_locale: "ko_KR".into(),
            routes: BTreeMap::from([
                (
                    "/".to_string(),
                    PageMeta::new(
                        "NoLimitPDF - 무제한 무료 PDF 변환 및 병합",
                        "회원가입 없이 무료로 이미지를 PDF로 변환하고 여러 PDF 파일을 하나로 병합하세요.",
                        img,
                    ),
                ),
                (
                    "/image-to-pdf".to_string(),
                    PageMeta::new(
                        "이미지 PDF 변환 | NoLimitPDF",
                        "JPG, PNG 등 다양한 이미지를 PDF 파일로 쉽고 빠르게 변환하세요.",
                        img,
                    ),
                ),
                (
                    "/merge-pdf".to_string(),
                    PageMeta::new(
                        "PDF 병합 | NoLimitPDF",
                        "여러 개의 PDF 파일을 하나로 합칩니다. 순서 변경도 자유롭게 가능하며, 모든 작업은 브라우저에서 안전하게 처리됩니다.",
                        img,
                    ),
                ),
            ]),
            not_found: PageMeta::new(
                "404: 페이지를 찾을 수 없습니다 | NoLimitPDF",
                "요청하신 페이지를 찾을 수 없습니다. URL을 확인하거나 홈페이지로 이동해주세요.",
                None,
            ),
        };

        let en = LocaleMeta {
            og_locale: "en_US".into(),
            routes: BTreeMap::from([
                (
                    "/".to_string(),
                    PageMeta::new(
                        "NoLimitPDF - Unlimited Free PDF Converter & Merger",
                        "Convert images to PDF and merge multiple PDF files for free without signing up. All operations are securely processed in your browser.",
                        img,
                    ),
                ),
                (
                    "/image-to-pdf".to_string(),
                    PageMeta::new(
                        "Image to PDF Converter | NoLimitPDF",
                        "Quickly and easily convert various images like JPG, PNG into PDF files. Free, unlimited, and no registration required.",
                        img,
                    ),
                ),
                (
                    "/merge-pdf".to_string(),
                    PageMeta::new(
                        "Merge PDF | NoLimitPDF",
                        "Combine multiple PDF files into one. You can freely change the order, and all tasks are processed securely in your browser.",
                        img,
                    ),
                ),
            ]),
            not_found: PageMeta::new(
                "404: Page Not Found | NoLimitPDF",
                "The page you requested could not be found. Please check the URL or return to the homepage.",
                None,
            ),
        };

        Self {
            site_url: SITE_URL.into(),
            site_name: SITE_NAME.into(),
            routes: vec!["/".into(), "/image-to-pdf".into(), "/merge-pdf".into()],
            languages: vec!["ko".into(), "en".into()],
            locales: BTreeMap::from([("ko".to_string(), ko), ("en".to_string(), en)]),
            sitemap_language: "en".into(),
        }
    }

    /// Check that every (language, route) pair has metadata.
    pub fn validate(&self) -> Result<(), PrerenderError> {
        if self.site_url.is_empty() || self.site_url.ends_with('/') {
            return Err(PrerenderError::InvalidConfig(format!(
                "site_url must be non-empty and have no trailing slash, got '{}'",
                self.site_url
            )));
        }
        for route in &self.routes {
            if !route.starts_with('/') {
                return Err(PrerenderError::InvalidConfig(format!(
                    "route '{route}' must start with '/'"
                )));
            }
        }
        if !self.languages.contains(&self.sitemap_language) {
            return Err(PrerenderError::InvalidConfig(format!(
                "sitemap language '{}' is not one of {:?}",
                self.sitemap_language, self.languages
            )));
        }
        for lang in &self.languages {
            for route in &self.routes {
                self.page(lang, route)?;
            }
        }
        Ok(())
    }

    pub fn locale(&self, lang: &str) -> Result<&LocaleMeta, PrerenderError> {
        self.locales
            .get(lang)
            .ok_or_else(|| PrerenderError::UnknownLanguage {
                lang: lang.to_string(),
            })
    }

    pub fn page(&self, lang: &str, route: &str) -> Result<&PageMeta, PrerenderError> {
        self.locale(lang)?
            .routes
            .get(route)
            .ok_or_else(|| PrerenderError::UnknownRoute {
                lang: lang.to_string(),
                route: route.to_string(),
            })
    }

    /// `https://site/<lang>` for `/`, `https://site/<lang>/<route>` otherwise.
    pub fn localized_url(&self, lang: &str, route: &str) -> String {
        format!("{}/{}{}", self.site_url, lang, route_suffix(route))
    }

    /// Language-neutral URL used for `x-default`.
    pub fn default_url(&self, route: &str) -> String {
        format!("{}{}", self.site_url, route_suffix(route))
    }
}

/// File name a route is written to inside its language directory.
pub fn output_file(route: &str) -> String {
    match route_suffix(route) {
        "" => "index.html".to_string(),
        suffix => format!("{}.html", suffix.trim_start_matches('/')),
    }
}

fn route_suffix(route: &str) -> &str {
    if route == "/" {
        ""
    } else {
        route
    }
}
