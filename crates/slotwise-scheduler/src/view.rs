use serde::{Deserialize, Serialize};

/// Which projection the presentation layer is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Flat list of every occurrence.
    #[default]
    #[serde(alias = "timeslots")]
    Slots,
    /// One row per schedule.
    Schedules,
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slots" | "timeslots" => Ok(ViewMode::Slots),
            "schedules" => Ok(ViewMode::Schedules),
            other => Err(format!(
                "unknown view mode '{other}'. Valid options: slots, schedules"
            )),
        }
    }
}

/// One page of a projection. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Number of pages needed for `total_items`; an empty list still has one page.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1)).max(1)
}

/// Cut page `page` (1-based) out of `rows`, clamping into `1..=total_pages`.
pub fn paginate<T: Clone>(rows: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let pages = total_pages(rows.len(), page_size);
    let page = page.clamp(1, pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(rows.len());

    Page {
        items: rows[start..end].to_vec(),
        page,
        page_size,
        total_items: rows.len(),
        total_pages: pages,
    }
}

/// Validate a typed "jump to page" entry.
///
/// Returns the 1-based page only when it parses and is inside
/// `1..=total_pages`; anything else leaves the current page unchanged.
pub fn parse_jump(input: &str, total_pages: usize) -> Option<usize> {
    let page: usize = input.trim().parse().ok()?;
    (1..=total_pages).contains(&page).then_some(page)
}
