use std::fmt::Debug;

/// Longest rendering produced by [`stringify`], before the ellipsis.
pub const MAX_RENDERED_LEN: usize = 256;

/// Renders a value with its `Debug` output, truncated to [`MAX_RENDERED_LEN`] bytes.
///
/// ```rust
/// use callvisor::stringify;
///
/// assert_eq!(stringify(&(1, "a")), r#"(1, "a")"#);
/// assert!(stringify(&vec![0u8; 1000]).ends_with("..."));
/// ```
pub fn stringify(value: &dyn Debug) -> String {
    let mut out = format!("{value:?}");
    if out.len() > MAX_RENDERED_LEN {
        let cut = (0..=MAX_RENDERED_LEN)
            .rev()
            .find(|&i| out.is_char_boundary(i))
            .unwrap_or(0);
        out.truncate(cut);
        out.push_str("...");
    }
    out
}
