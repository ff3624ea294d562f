use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length in hex characters of a stored hash segment (MD5, 128 bits).
pub const DIGEST_HEX_LEN: usize = 32;

/// Compute the stored form of a hash segment: the lowercase hex MD5 of
/// `input`. Part of the on-disk layout; changing it orphans stored content.
pub fn digest(input: &[u8]) -> String {
    hex::encode(Md5::digest(input))
}

/// The kind tag of an identifier segment.
///
/// Serialized with the single-letter tags used in canonical strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Opaque string used as one path component.
    #[serde(rename = "d")]
    Directory,
    /// Arbitrary text, fanned out byte by byte.
    #[serde(rename = "s")]
    String,
    /// Integer, grouped two decimal digits at a time.
    #[serde(rename = "n")]
    Numeric,
    /// Pre-hashed hex digest, grouped four characters at a time.
    #[serde(rename = "h")]
    Hash,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "d"),
            Self::String => write!(f, "s"),
            Self::Numeric => write!(f, "n"),
            Self::Hash => write!(f, "h"),
        }
    }
}

/// One `(kind, value)` element of an [`Identifier`].
///
/// Canonical JSON form is `{"t": <kind>, "i": <value>}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "i")]
pub enum Segment {
    #[serde(rename = "d")]
    Directory(String),
    #[serde(rename = "s")]
    String(String),
    #[serde(rename = "n")]
    Numeric(i64),
    /// Holds the digest, never the caller's original input.
    #[serde(rename = "h")]
    Hash(String),
}

impl Segment {
    /// The kind tag of this segment.
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Directory(_) => SegmentKind::Directory,
            Self::String(_) => SegmentKind::String,
            Self::Numeric(_) => SegmentKind::Numeric,
            Self::Hash(_) => SegmentKind::Hash,
        }
    }

    /// The value rendered as text (decimal for numeric segments).
    pub fn value_string(&self) -> String {
        match self {
            Self::Directory(v) | Self::String(v) | Self::Hash(v) => v.clone(),
            Self::Numeric(n) => n.to_string(),
        }
    }

    /// Build a segment from a kind and raw text, applying the kind's coercion.
    pub fn coerce(kind: SegmentKind, value: &str) -> Self {
        match kind {
            SegmentKind::Directory => Self::Directory(value.to_string()),
            SegmentKind::String => Self::String(value.to_string()),
            SegmentKind::Numeric => Self::Numeric(coerce_integer(value)),
            SegmentKind::Hash => Self::Hash(digest(value.as_bytes())),
        }
    }
}

/// Parse the leading integer of `value`: optional whitespace, optional sign,
/// then digits. Anything unparsable yields 0; overflow saturates.
fn coerce_integer(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = rest
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return 0;
    }
    let mut acc: i64 = 0;
    for b in digits.bytes() {
        let d = i64::from(b - b'0');
        acc = match acc.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(d)
            } else {
                v.checked_add(d)
            }
        }) {
            Some(v) => v,
            None => return if negative { i64::MIN } else { i64::MAX },
        };
    }
    acc
}

/// Validation bounds and error policy for an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentConfig {
    /// Minimum number of segments (default: 1).
    pub min_segments: usize,
    /// Maximum number of segments (default: 100).
    pub max_segments: usize,
    /// When `true`, failed validation is an error; otherwise `Ok(false)`.
    pub strict: bool,
}

impl Default for IdentConfig {
    fn default() -> Self {
        Self {
            min_segments: 1,
            max_segments: 100,
            strict: true,
        }
    }
}

impl IdentConfig {
    /// Default bounds with validation failures reported as `Ok(false)`.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Default::default()
        }
    }
}

/// Ordered, typed description of where a piece of content conceptually lives.
///
/// Segments are appended with builder-style calls and are never removed.
/// Appending always succeeds; the segment count is only checked by
/// [`Identifier::validate`].
///
/// ```
/// use csm_types::Identifier;
///
/// let ident = Identifier::default()
///     .directory("users")
///     .directory("profile")
///     .numeric(180532);
/// assert_eq!(ident.segment_count(), 3);
/// assert_eq!(ident.validate(), Ok(true));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Identifier {
    config: IdentConfig,
    segments: Vec<Segment>,
}

impl Identifier {
    /// Create an empty identifier with the given validation config.
    pub fn new(config: IdentConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
        }
    }

    /// Rebuild an identifier from an ordered segment list.
    pub fn from_segments(config: IdentConfig, segments: Vec<Segment>) -> Self {
        Self { config, segments }
    }

    /// Parse a string produced by [`Identifier::to_canonical_string`].
    pub fn from_canonical_str(config: IdentConfig, s: &str) -> Result<Self, TypeError> {
        let segments: Vec<Segment> =
            serde_json::from_str(s).map_err(|e| TypeError::Canonical(e.to_string()))?;
        Ok(Self { config, segments })
    }

    /// Append a segment of `kind`, coercing `value` as the kind requires.
    pub fn append(mut self, kind: SegmentKind, value: impl AsRef<str>) -> Self {
        self.segments.push(Segment::coerce(kind, value.as_ref()));
        self
    }

    /// Append an already-built segment in place.
    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Append a directory segment (one path component).
    pub fn directory(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Directory(name.into()));
        self
    }

    /// Append a string segment.
    pub fn string(mut self, value: impl Into<String>) -> Self {
        self.segments.push(Segment::String(value.into()));
        self
    }

    /// Append a numeric segment.
    pub fn numeric(mut self, value: i64) -> Self {
        self.segments.push(Segment::Numeric(value));
        self
    }

    /// Append a hash segment. The digest of `input` is stored, not `input`.
    pub fn hash(mut self, input: impl AsRef<[u8]>) -> Self {
        self.segments.push(Segment::Hash(digest(input.as_ref())));
        self
    }

    /// Check the segment count against the configured bounds.
    ///
    /// Returns `Ok(true)` when within bounds. Out of bounds yields
    /// [`TypeError::Validation`] in strict mode and `Ok(false)` otherwise.
    pub fn validate(&self) -> Result<bool, TypeError> {
        let count = self.segment_count();
        let message = if count < self.config.min_segments {
            format!(
                "identifier must have >= {} segments, got {count}",
                self.config.min_segments
            )
        } else if count > self.config.max_segments {
            format!(
                "identifier must have <= {} segments, got {count}",
                self.config.max_segments
            )
        } else {
            return Ok(true);
        };

        if self.config.strict {
            Err(TypeError::Validation { message })
        } else {
            Ok(false)
        }
    }

    /// The segments in insertion order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Owned copy of the segments in insertion order.
    pub fn to_ordered_list(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    /// Deterministic JSON encoding of the segment list, e.g.
    /// `[{"t":"d","i":"users"},{"t":"n","i":180532}]`.
    ///
    /// Stable across runs; suitable as a cache key and for logging.
    pub fn to_canonical_string(&self) -> Result<String, TypeError> {
        serde_json::to_string(&self.segments).map_err(|e| TypeError::Canonical(e.to_string()))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn config(&self) -> &IdentConfig {
        &self.config
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_canonical_string().map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident_with(count: usize) -> Identifier {
        (0..count).fold(Identifier::default(), |id, i| id.numeric(i as i64))
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    #[test]
    fn builder_preserves_order() {
        let ident = Identifier::default()
            .directory("users")
            .string("ab")
            .numeric(42)
            .hash("payload");
        let kinds: Vec<SegmentKind> = ident.segments().iter().map(Segment::kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Directory,
                SegmentKind::String,
                SegmentKind::Numeric,
                SegmentKind::Hash
            ]
        );
    }

    #[test]
    fn hash_segment_stores_digest_not_input() {
        let ident = Identifier::default().hash("secret input");
        match &ident.segments()[0] {
            Segment::Hash(d) => {
                assert_eq!(d.len(), DIGEST_HEX_LEN);
                assert_ne!(d, "secret input");
                assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
                assert_eq!(*d, digest(b"secret input"));
            }
            other => panic!("expected hash segment, got {other:?}"),
        }
    }

    #[test]
    fn digest_is_md5_hex() {
        assert_eq!(digest(b"avatar"), "aaca0f5eb4d2d98a6ce6dffa99f8254b");
        assert_eq!(digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            Identifier::default().hash("avatar").segments()[0],
            Segment::Hash("aaca0f5eb4d2d98a6ce6dffa99f8254b".into())
        );
    }

    #[test]
    fn append_coerces_numeric() {
        let ident = Identifier::default()
            .append(SegmentKind::Numeric, "180532")
            .append(SegmentKind::Numeric, "  -7abc")
            .append(SegmentKind::Numeric, "not a number");
        assert_eq!(
            ident.segments(),
            &[
                Segment::Numeric(180532),
                Segment::Numeric(-7),
                Segment::Numeric(0)
            ]
        );
    }

    #[test]
    fn append_numeric_saturates_on_overflow() {
        let ident = Identifier::default()
            .append(SegmentKind::Numeric, "99999999999999999999999")
            .append(SegmentKind::Numeric, "-99999999999999999999999");
        assert_eq!(
            ident.segments(),
            &[Segment::Numeric(i64::MAX), Segment::Numeric(i64::MIN)]
        );
    }

    #[test]
    fn append_hash_matches_typed_builder() {
        let a = Identifier::default().append(SegmentKind::Hash, "x");
        let b = Identifier::default().hash("x");
        assert_eq!(a, b);
    }

    #[test]
    fn push_appends_in_place() {
        let mut ident = Identifier::default();
        ident.push(Segment::Directory("a".into())).push(Segment::Numeric(1));
        assert_eq!(ident.segment_count(), 2);
    }

    // -----------------------------------------------------------------------
    // Validation bounds
    // -----------------------------------------------------------------------

    #[test]
    fn empty_identifier_fails_strict() {
        let err = Identifier::default().validate().unwrap_err();
        match err {
            TypeError::Validation { message } => assert!(message.contains(">= 1"), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_identifier_returns_false_lenient() {
        let ident = Identifier::new(IdentConfig::lenient());
        assert_eq!(ident.validate(), Ok(false));
    }

    #[test]
    fn exactly_max_segments_passes() {
        assert_eq!(ident_with(100).validate(), Ok(true));
    }

    #[test]
    fn over_max_segments_fails() {
        let err = ident_with(101).validate().unwrap_err();
        assert!(err.to_string().contains("<= 100"), "{err}");
    }

    #[test]
    fn over_max_lenient_returns_false() {
        let config = IdentConfig {
            max_segments: 2,
            strict: false,
            ..Default::default()
        };
        let ident = Identifier::new(config).numeric(1).numeric(2).numeric(3);
        assert_eq!(ident.validate(), Ok(false));
    }

    #[test]
    fn appends_never_validate() {
        // Building far past the bound is allowed; only validate() complains.
        let ident = ident_with(150);
        assert_eq!(ident.segment_count(), 150);
        assert!(ident.validate().is_err());
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    #[test]
    fn canonical_string_format() {
        let ident = Identifier::default()
            .directory("users")
            .string("ab")
            .numeric(180532);
        assert_eq!(
            ident.to_canonical_string().unwrap(),
            r#"[{"t":"d","i":"users"},{"t":"s","i":"ab"},{"t":"n","i":180532}]"#
        );
    }

    #[test]
    fn canonical_string_roundtrips_structurally() {
        let ident = Identifier::default()
            .directory("users")
            .numeric(7)
            .hash("avatar");
        let s = ident.to_canonical_string().unwrap();
        let parsed = Identifier::from_canonical_str(IdentConfig::default(), &s).unwrap();
        assert_eq!(parsed.to_ordered_list(), ident.to_ordered_list());
        assert_eq!(parsed, ident);
    }

    #[test]
    fn canonical_string_rejects_garbage() {
        let err = Identifier::from_canonical_str(IdentConfig::default(), "{nope").unwrap_err();
        assert!(matches!(err, TypeError::Canonical(_)));
    }

    #[test]
    fn display_is_canonical_string() {
        let ident = Identifier::default().directory("x");
        assert_eq!(format!("{ident}"), ident.to_canonical_string().unwrap());
    }

    #[test]
    fn value_string_renders_numeric_as_decimal() {
        assert_eq!(Segment::Numeric(-15).value_string(), "-15");
        assert_eq!(Segment::Directory("d".into()).value_string(), "d");
    }

    proptest::proptest! {
        #[test]
        fn canonical_roundtrip_any_directory_names(names in proptest::collection::vec(".*", 0..8)) {
            let ident = names
                .iter()
                .fold(Identifier::default(), |id, n| id.directory(n.clone()));
            let s = ident.to_canonical_string().unwrap();
            let parsed = Identifier::from_canonical_str(IdentConfig::default(), &s).unwrap();
            proptest::prop_assert_eq!(parsed, ident);
        }
    }
}
