//! Deterministic expansion of an identifier into nested directory names.
//!
//! Each segment kind fans out differently:
//!
//! | kind        | components                                   |
//! |-------------|----------------------------------------------|
//! | `directory` | the value, sanitized                         |
//! | `string`    | one per byte, named by the byte's decimal    |
//! | `numeric`   | decimal digits in groups of 2, from the left |
//! | `hash`      | digest characters in groups of 4             |
//!
//! Grouping bounds every directory level to at most 100 children for numeric
//! segments and 65536 for hash segments. The layout is a storage format:
//! changing a grouping rule makes previously stored content unreachable.

use csm_types::{Identifier, Segment};

/// Width of one numeric group.
pub const NUMERIC_GROUP: usize = 2;
/// Width of one hash group.
pub const HASH_GROUP: usize = 4;

/// Shard `ident` into directory components, in segment order.
pub fn shard(ident: &Identifier) -> Vec<String> {
    ident.segments().iter().flat_map(shard_segment).collect()
}

/// Components contributed by a single segment.
pub fn shard_segment(segment: &Segment) -> Vec<String> {
    match segment {
        Segment::Directory(name) => vec![sanitize(name)],
        Segment::String(value) => value.bytes().map(|b| sanitize(&b.to_string())).collect(),
        Segment::Numeric(n) => group(&n.to_string(), NUMERIC_GROUP),
        Segment::Hash(digest) => group(digest, HASH_GROUP),
    }
}

/// Split `s` into `width`-character groups from the left; the last group may
/// be shorter.
fn group(s: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| sanitize(&chunk.iter().collect::<String>()))
        .collect()
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Relative `/`-joined form of the sharded path, e.g. `users/profile/18/05/32`.
pub fn relative_path(ident: &Identifier) -> String {
    shard(ident).join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_types::IdentConfig;
    use proptest::prelude::*;

    // -----------------------------------------------------------------------
    // Per-kind rules
    // -----------------------------------------------------------------------

    #[test]
    fn numeric_groups_of_two() {
        let ident = Identifier::default().numeric(180532);
        assert_eq!(shard(&ident), vec!["18", "05", "32"]);
    }

    #[test]
    fn numeric_odd_length_keeps_short_tail() {
        assert_eq!(shard(&Identifier::default().numeric(5)), vec!["5"]);
        assert_eq!(shard(&Identifier::default().numeric(12345)), vec!["12", "34", "5"]);
    }

    #[test]
    fn negative_numeric_sign_is_sanitized() {
        assert_eq!(shard(&Identifier::default().numeric(-42)), vec!["_4", "2"]);
    }

    #[test]
    fn hash_yields_eight_groups_of_four() {
        let ident = Identifier::default().hash("avatar");
        let dirs = shard(&ident);
        assert_eq!(dirs.len(), 8);
        assert!(dirs.iter().all(|d| d.len() == 4));
        let Segment::Hash(digest) = &ident.segments()[0] else {
            panic!("expected hash segment");
        };
        assert_eq!(dirs.concat(), *digest);
    }

    #[test]
    fn string_fans_out_per_byte() {
        let ident = Identifier::default().string("AB");
        assert_eq!(shard(&ident), vec!["65", "66"]);
    }

    #[test]
    fn string_multibyte_uses_each_byte() {
        // "é" is 0xC3 0xA9 in UTF-8.
        let ident = Identifier::default().string("é");
        assert_eq!(shard(&ident), vec!["195", "169"]);
    }

    #[test]
    fn directory_is_sanitized() {
        assert_eq!(shard(&Identifier::default().directory("a b")), vec!["a_b"]);
        assert_eq!(
            shard(&Identifier::default().directory("../etc")),
            vec!["___etc"]
        );
    }

    #[test]
    fn sanitize_keeps_word_chars() {
        assert_eq!(sanitize("Az09_"), "Az09_");
        assert_eq!(sanitize("a-b.c/d"), "a_b_c_d");
        assert_eq!(sanitize("ü"), "_");
    }

    #[test]
    fn segments_concatenate_in_order() {
        let ident = Identifier::default()
            .directory("users")
            .directory("profile")
            .numeric(180532);
        assert_eq!(relative_path(&ident), "users/profile/18/05/32");
    }

    #[test]
    fn empty_identifier_has_no_components() {
        assert!(shard(&Identifier::new(IdentConfig::lenient())).is_empty());
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn segment_strategy() -> impl Strategy<Value = Segment> {
        prop_oneof![
            ".*".prop_map(Segment::Directory),
            ".{0,6}".prop_map(Segment::String),
            any::<i64>().prop_map(Segment::Numeric),
            any::<Vec<u8>>().prop_map(|b| Segment::Hash(csm_types::ident::digest(&b))),
        ]
    }

    proptest! {
        #[test]
        fn shard_is_deterministic(segments in proptest::collection::vec(segment_strategy(), 0..6)) {
            let a = Identifier::from_segments(IdentConfig::default(), segments.clone());
            let b = Identifier::from_segments(IdentConfig::default(), segments);
            prop_assert_eq!(shard(&a), shard(&b));
        }

        #[test]
        fn components_are_path_safe(segments in proptest::collection::vec(segment_strategy(), 0..6)) {
            let ident = Identifier::from_segments(IdentConfig::default(), segments);
            for component in shard(&ident) {
                prop_assert!(component.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            }
        }

        #[test]
        fn numeric_groups_rejoin_to_decimal(n in 0i64..i64::MAX) {
            let dirs = shard(&Identifier::default().numeric(n));
            prop_assert!(dirs.iter().all(|d| !d.is_empty() && d.len() <= NUMERIC_GROUP));
            prop_assert_eq!(dirs.concat(), n.to_string());
        }
    }
}
