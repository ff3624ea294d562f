use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A `kind[_subkind]` tag describing what a stored object contains.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentType {
    kind: String,
    sub_kind: Option<String>,
}

impl ContentType {
    pub const ANY: &'static str = "any";
    pub const IMAGE: &'static str = "img";
    pub const VIDEO: &'static str = "video";
    pub const XML: &'static str = "xml";
    pub const PDF: &'static str = "pdf";
    pub const CSV: &'static str = "csv";
    pub const TEXT: &'static str = "txt";

    /// All known top-level kinds.
    pub const KINDS: &'static [&'static str] = &[
        Self::ANY,
        Self::IMAGE,
        Self::VIDEO,
        Self::XML,
        Self::PDF,
        Self::CSV,
        Self::TEXT,
    ];

    pub const IMAGE_JPEG: &'static str = "jpg";
    pub const IMAGE_GIF: &'static str = "gif";
    pub const IMAGE_PNG: &'static str = "png";
    pub const IMAGE_TIFF: &'static str = "tif";
    pub const IMAGE_BMP: &'static str = "bmp";

    /// Known image subkinds.
    pub const IMAGE_SUBKINDS: &'static [&'static str] = &[
        Self::IMAGE_JPEG,
        Self::IMAGE_GIF,
        Self::IMAGE_PNG,
        Self::IMAGE_TIFF,
        Self::IMAGE_BMP,
    ];

    /// Create a content type. An empty `sub_kind` is treated as absent.
    pub fn new(kind: impl Into<String>, sub_kind: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            sub_kind: sub_kind.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// An image content type, e.g. `ContentType::image(Some("png"))`.
    pub fn image(sub_kind: Option<&str>) -> Self {
        Self::new(Self::IMAGE, sub_kind)
    }

    /// Build from a `[kind, sub_kind]` pair; an empty kind becomes `any`.
    pub fn from_pair(kind: &str, sub_kind: Option<&str>) -> Self {
        let kind = if kind.is_empty() { Self::ANY } else { kind };
        Self::new(kind, sub_kind)
    }

    /// Replace the sub kind.
    pub fn with_sub_kind(mut self, sub_kind: impl Into<String>) -> Self {
        let sub = sub_kind.into();
        self.sub_kind = (!sub.is_empty()).then_some(sub);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn sub_kind(&self) -> Option<&str> {
        self.sub_kind.as_deref()
    }

    /// Whether the top-level kind is one of [`ContentType::KINDS`].
    pub fn is_known_kind(&self) -> bool {
        Self::KINDS.contains(&self.kind.as_str())
    }

    /// `[kind, sub_kind]` pair form.
    pub fn to_pair(&self) -> (&str, Option<&str>) {
        (&self.kind, self.sub_kind.as_deref())
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new(Self::ANY, None)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_kind {
            Some(sub) => write!(f, "{}_{sub}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Parses `kind` or `kind_subkind`. Only a string with more than one `_`
/// separator is rejected.
impl FromStr for ContentType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let kind = parts.next().unwrap_or_default();
        let sub = parts.next();
        if parts.next().is_some() {
            return Err(TypeError::InvalidContentType(s.to_string()));
        }
        Ok(Self::from_pair(kind, sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_any() {
        let t = ContentType::default();
        assert_eq!(t.kind(), "any");
        assert_eq!(t.sub_kind(), None);
        assert_eq!(t.to_string(), "any");
    }

    #[test]
    fn image_png_display() {
        let t = ContentType::image(Some(ContentType::IMAGE_PNG));
        assert_eq!(t.to_string(), "img_png");
        assert_eq!(t.to_pair(), ("img", Some("png")));
    }

    #[test]
    fn parse_with_and_without_subkind() {
        let t: ContentType = "img_jpg".parse().unwrap();
        assert_eq!(t, ContentType::image(Some("jpg")));
        let t: ContentType = "pdf".parse().unwrap();
        assert_eq!(t.kind(), "pdf");
        assert_eq!(t.sub_kind(), None);
    }

    #[test]
    fn empty_kind_becomes_any() {
        let t: ContentType = "".parse().unwrap();
        assert_eq!(t, ContentType::default());
        let t: ContentType = "_png".parse().unwrap();
        assert_eq!(t.to_string(), "any_png");
    }

    #[test]
    fn too_many_separators_rejected() {
        assert!("img_png_x".parse::<ContentType>().is_err());
    }

    #[test]
    fn with_sub_kind_empty_clears() {
        let t = ContentType::image(Some("gif")).with_sub_kind("");
        assert_eq!(t.sub_kind(), None);
    }

    #[test]
    fn known_kinds() {
        assert!(ContentType::new("video", None).is_known_kind());
        assert!(!ContentType::new("exe", None).is_known_kind());
    }
}
