//! Page range expressions such as `"1-3, 5, 8-10"`.

/// Parse a 1-based page range into sorted, unique, 0-based page indices.
///
/// * Parts are comma separated and trimmed.
/// * `a-b` is used only when both ends are non-zero integers; a reversed
///   range is swapped.
/// * Page numbers outside `1..=total` are dropped, as are parts that are not
///   integers.
///
/// An empty result is not an error here; callers decide what it means.
pub fn parse_page_range(range: &str, total: usize) -> Vec<usize> {
    let mut pages = Vec::new();
    for part in range.split(',').map(str::trim) {
        if part.contains('-') {
            let mut ends = part.split('-').map(|s| s.trim().parse::<usize>().ok());
            let (Some(Some(mut start)), Some(Some(mut end))) = (ends.next(), ends.next()) else {
                continue;
            };
            if start == 0 || end == 0 {
                continue;
            }
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
            pages.extend((start..=end.min(total)).map(|p| p - 1));
        } else if let Ok(page) = part.parse::<usize>() {
            if (1..=total).contains(&page) {
                pages.push(page - 1);
            }
        }
    }
    pages.sort_unstable();
    pages.dedup();
    pages
}
