//! Pure `/`-segment URL path joining.
//!
//! Component modules are addressed relative to a host base URL, e.g.
//! `resolve("http://host/nb/", "sdui_web_modules")` followed by
//! `resolve(that, "charting/plot.js")`.  The host base URL routinely
//! contains `.` and `..` segments (reverse proxies and notebook servers
//! both produce them), so joining is not plain concatenation.
//!
//! This is deliberately *not* a general URL library: percent-encoding,
//! query strings, and fragments are the caller's problem and must not be
//! passed in.  Both inputs are treated purely as `/`-delimited segment
//! lists.

/// Joins `base` and `relative` into one path, collapsing `.` and `..`.
///
/// A trailing slash on `base` is stripped before joining.  The segments
/// of `base` and then `relative` are processed left-to-right into one
/// output stack:
///
/// - `.` is skipped,
/// - `..` pops the last pushed segment — popping past the start is a
///   no-op rather than an error, mirroring permissive path collapse,
/// - anything else is pushed, including empty segments, which is what
///   keeps the `//` of a scheme prefix intact.
///
/// The result is the stack re-joined with `/`.  The function is pure and
/// total: identical inputs always produce identical output and no input
/// panics.
///
/// # Examples
///
/// ```rust
/// use sdui_core::urlpath::resolve;
///
/// assert_eq!(resolve("a/b", "../c"), "a/c");
/// assert_eq!(resolve("a/b/", "./c"), "a/b/c");
/// assert_eq!(resolve("http://host/nb/", "modules"), "http://host/nb/modules");
/// ```
pub fn resolve(base: &str, relative: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);

    let mut stack: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_join() {
        assert_eq!(resolve("a/b", "c"), "a/b/c");
    }

    #[test]
    fn test_parent_segment_pops_base() {
        assert_eq!(resolve("a/b", "../c"), "a/c");
    }

    #[test]
    fn test_current_segment_is_skipped() {
        assert_eq!(resolve("a/b/", "./c"), "a/b/c");
    }

    #[test]
    fn test_trailing_slash_on_base_is_stripped() {
        assert_eq!(resolve("a/b/", "c"), "a/b/c");
    }

    #[test]
    fn test_excess_parent_segments_never_panic() {
        // Popping past the start of the stack is a no-op
        assert_eq!(resolve("a", "../../x"), "x");
    }

    #[test]
    fn test_parent_segments_inside_base_collapse() {
        assert_eq!(resolve("a/b/../c", "d"), "a/c/d");
    }

    #[test]
    fn test_scheme_double_slash_is_preserved() {
        // "http:", "", "host" — the empty segment must survive the join
        assert_eq!(
            resolve("http://host/notebooks/", "web_modules"),
            "http://host/notebooks/web_modules"
        );
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let a = resolve("x/./y/../z", "../m/n");
        let b = resolve("x/./y/../z", "../m/n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_empty_segments_introduced() {
        // For inputs that contain no empty segments, the output contains
        // none either (the function never invents separators).
        let out = resolve("alpha/beta", "gamma/delta");
        assert!(out.split('/').all(|s| !s.is_empty()), "unexpected empty segment in {out}");
    }

    #[test]
    fn test_relative_can_be_multi_segment_with_dots() {
        assert_eq!(resolve("srv/base", "./mods/../pkg/entry.js"), "srv/base/pkg/entry.js");
    }
}
