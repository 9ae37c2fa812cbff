//! User-facing strings in Korean and English.
//!
//! Lookups never fail: a key missing from the table renders as the key
//! itself, so a typo shows up on screen rather than as an error.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Ko, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
        }
    }

    /// Pick a language from a POSIX locale string such as `en_US.UTF-8`.
    /// Anything that is not English falls back to Korean.
    pub fn from_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().starts_with("en") {
            Language::En
        } else {
            Language::Ko
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ko" => Ok(Language::Ko),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language '{other}' (expected ko or en)")),
        }
    }
}

static KO: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("appTitle", "PDF 유틸리티"),
        ("tabImageToPdf", "Image → PDF"),
        ("tabPdfMerge", "PDF 병합"),
        ("themeLight", "Light"),
        ("themeDark", "Dark"),
        ("language", "언어"),
        ("fileUploadImageTitle", "이미지 파일 업로드"),
        ("fileUploadPdfTitle", "PDF 파일 업로드"),
        ("imageListTitle", "변환할 이미지 목록"),
        ("pdfListTitle", "병합할 PDF 목록"),
        ("convertToPdf", "{count}개 이미지 PDF로 변환"),
        ("mergePdfs", "{count}개 PDF 병합하기"),
        ("converting", "변환 중..."),
        ("merging", "병합 중..."),
        ("toastWarnAddImages", "PDF로 변환할 이미지를 추가해주세요."),
        ("toastWarnTypeImage", "이미지 파일만 업로드할 수 있습니다."),
        ("toastWarnTypePdf", "PDF 파일만 업로드할 수 있습니다."),
        ("toastWarnAddPdfs", "병합할 PDF 파일을 추가해주세요."),
        ("toastSuccessPdfConversion", "PDF 변환이 완료되었습니다!"),
        ("toastErrorPdfConversion", "PDF 변환 중 오류가 발생했습니다."),
        ("toastErrorMergeMinFiles", "병합하려면 최소 2개 이상의 PDF 파일이 필요합니다."),
        ("toastSuccessPdfMerge", "PDF 병합이 완료되었습니다!"),
        ("toastErrorMerge", "PDF 병합 중 오류가 발생했습니다."),
        ("benefit.title", "제한 없는 PDF 변환과 병합"),
        ("benefit.subtitle", "빠르고 간단하게, 가입 없이 사용하세요."),
    ])
});

static EN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("appTitle", "PDF Utility"),
        ("tabImageToPdf", "Image → PDF"),
        ("tabPdfMerge", "Merge PDF"),
        ("themeLight", "Light"),
        ("themeDark", "Dark"),
        ("language", "Language"),
        ("fileUploadImageTitle", "Upload Image File"),
        ("fileUploadPdfTitle", "Upload PDF File"),
        ("imageListTitle", "List of images to convert"),
        ("pdfListTitle", "List of PDFs to merge"),
        ("convertToPdf", "Convert {count} images to PDF"),
        ("mergePdfs", "Merge {count} PDFs"),
        ("converting", "Converting..."),
        ("merging", "Merging..."),
        ("toastWarnAddImages", "Please add images to convert to PDF."),
        ("toastWarnTypeImage", "Only image files can be uploaded."),
        ("toastWarnTypePdf", "Only PDF files can be uploaded."),
        ("toastWarnAddPdfs", "Add PDFs first."),
        ("toastSuccessPdfConversion", "PDF conversion complete!"),
        ("toastErrorPdfConversion", "An error occurred during PDF conversion."),
        ("toastErrorMergeMinFiles", "You need at least 2 PDF files to merge."),
        ("toastSuccessPdfMerge", "PDF merge complete!"),
        ("toastErrorMerge", "An error occurred during PDF merge."),
        ("benefit.title", "Unlimited PDF Conversion & Merge"),
        ("benefit.subtitle", "Fast and simple. No sign-up required."),
    ])
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap());

fn table(lang: Language) -> &'static HashMap<&'static str, &'static str> {
    match lang {
        Language::Ko => &KO,
        Language::En => &EN,
    }
}

/// Look up `key` in `lang`, substituting `{name}` placeholders from `params`.
/// Placeholders with no matching parameter are left as written.
pub fn translate(lang: Language, key: &str, params: &[(&str, &str)]) -> String {
    let template = table(lang).get(key).copied().unwrap_or(key);
    if params.is_empty() {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Shorthand for a key without parameters.
pub fn t(lang: Language, key: &str) -> String {
    translate(lang, key, &[])
}
