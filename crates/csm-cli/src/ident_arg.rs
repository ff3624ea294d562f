use csm_types::{Identifier, Segment, SegmentKind};

/// Parse `kind:value[,kind:value…]` into an identifier.
///
/// Kinds: `dir`/`d`, `str`/`s`, `num`/`n`, `hash`/`h`. Only the first `:` of
/// each part separates kind from value.
pub fn parse_ident(s: &str) -> Result<Identifier, String> {
    let mut ident = Identifier::default();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (kind, value) = part
            .split_once(':')
            .ok_or_else(|| format!("segment {part:?} is not kind:value"))?;
        let segment = match parse_kind(kind.trim())? {
            SegmentKind::Numeric => {
                let n = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| format!("numeric segment {value:?}: {e}"))?;
                Segment::Numeric(n)
            }
            kind => Segment::coerce(kind, value),
        };
        ident.push(segment);
    }
    if ident.is_empty() {
        return Err("identifier needs at least one segment".into());
    }
    Ok(ident)
}

fn parse_kind(kind: &str) -> Result<SegmentKind, String> {
    match kind {
        "dir" | "d" => Ok(SegmentKind::Directory),
        "str" | "s" => Ok(SegmentKind::String),
        "num" | "n" => Ok(SegmentKind::Numeric),
        "hash" | "h" => Ok(SegmentKind::Hash),
        other => Err(format!(
            "unknown segment kind {other:?} (expected dir, str, num or hash)"
        )),
    }
}
