pub const PAGE_LINKS: i64 = 8;
pub const PAGE_LINKS_BEFORE: i64 = PAGE_LINKS / 2;

/// Row offset of a 1-based page.
pub fn offset(page: i64, page_size: i64) -> i64 {
    page * page_size - page_size
}

/// Last page index for `total` rows; at least 1 so an empty result still has
/// a page to link to.
pub fn last_page(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 || total <= 0 {
        return 1;
    }
    (total + page_size - 1) / page_size
}

/// Page indexes for navigation links around `current`: up to four pages
/// before it, at most [`PAGE_LINKS`] entries, never past the last page.
pub fn page_window(current: i64, total: i64, page_size: i64) -> Vec<i64> {
    let last = last_page(total, page_size);
    let first = (current - PAGE_LINKS_BEFORE).max(1).min(last);
    (first..=last).take(PAGE_LINKS as usize).collect()
}

/// Parses a `p` query parameter, falling back to page 1.
pub fn normalize_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}
