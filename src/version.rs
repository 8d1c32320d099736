// src/version.rs

//! Segment-wise version string comparison
//!
//! Compares dot/dash-separated version strings the way RPM repositories
//! order them: aligned segments compare by numeric value when both sides
//! are all digits, lexicographically otherwise.

use std::cmp::Ordering;

/// Compare two version strings segment by segment.
///
/// Returns `Ordering::Greater` when `a` is newer than `b`. Strings are
/// split on every non-alphanumeric boundary, so "1.2-3" and "1.2.3" align
/// the same way. Leading segments dominate trailing ones; when the shared
/// prefix is equal, the string with segments left over is greater. Empty
/// strings compare equal.
pub fn compare(a: &str, b: &str) -> Ordering {
    let seg_a = split_segments(a);
    let seg_b = split_segments(b);

    for i in 0..seg_a.len().max(seg_b.len()) {
        let ord = match (seg_a.get(i), seg_b.get(i)) {
            (Some(x), Some(y)) => compare_segment(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, _) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn split_segments(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|seg| !seg.is_empty())
        .collect()
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    let numeric_a = a.bytes().all(|b| b.is_ascii_digit());
    let numeric_b = b.bytes().all(|b| b.is_ascii_digit());

    if numeric_a && numeric_b {
        // Numeric comparison without parsing: segments of arbitrary length
        // must not overflow an integer type.
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}
