use std::borrow::Cow;

/// Write `values` with `f`, separated by `separator`.
///
/// Values for which `f` writes nothing are skipped, separator included.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut first = true;
    for v in values {
        let mark = out.len();
        if !first {
            out.push_str(separator);
        }
        let start = out.len();
        f(out, v);
        if out.len() == start {
            out.truncate(mark);
        } else {
            first = false;
        }
    }
}

/// Like [`separated_by`] but for writers that can fail.
pub fn try_separated_by<T, F, E>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) -> Result<(), E>
where
    F: FnMut(&mut String, T) -> Result<(), E>,
{
    let mut first = true;
    for v in values {
        let mark = out.len();
        if !first {
            out.push_str(separator);
        }
        let start = out.len();
        f(out, v)?;
        if out.len() == start {
            out.truncate(mark);
        } else {
            first = false;
        }
    }
    Ok(())
}

/// Shorten long SQL for log messages.
pub fn truncate_long(query: &str) -> Cow<'_, str> {
    const LIMIT: usize = 497;
    if query.len() <= LIMIT {
        return Cow::Borrowed(query);
    }
    let mut end = LIMIT;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", query[..end].trim_end()))
}
