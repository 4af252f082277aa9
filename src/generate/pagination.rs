//! Blog listing pagination.
//!
//! Page 1 lives at `/blog/`, page `n` at `/blog/page/n/`. The page-number
//! strip always shows the first and last page and the current page ± 1, with
//! an ellipsis wherever numbers are skipped:
//!
//! ```text
//! total ≤ 7            1 2 3 4 5 6 7
//! current 1 of 20      1 2 … 20
//! current 10 of 20     1 … 9 10 11 … 20
//! current 20 of 20     1 … 19 20
//! ```

use serde::Serialize;

pub const POSTS_PER_PAGE: usize = 10;

/// Number of listing pages for `items` entries. Never less than one.
pub fn total_pages(items: usize, per_page: usize) -> usize {
    items.div_ceil(per_page.max(1)).max(1)
}

/// Page numbers to show; `None` marks an ellipsis.
pub fn page_numbers(current: usize, total: usize) -> Vec<Option<usize>> {
    if total <= 7 {
        return (1..=total).map(Some).collect();
    }

    let mut pages = vec![Some(1)];
    if current > 3 {
        pages.push(None);
    }
    for n in current.saturating_sub(1)..=current + 1 {
        if n > 1 && n < total {
            pages.push(Some(n));
        }
    }
    if current + 2 < total {
        pages.push(None);
    }
    pages.push(Some(total));
    pages
}

/// One entry of the page-number strip, as templates see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageLink {
    Page {
        number: usize,
        url: String,
        current: bool,
    },
    Ellipsis,
}

pub fn page_links(current: usize, total: usize) -> Vec<PageLink> {
    page_numbers(current, total)
        .into_iter()
        .map(|n| match n {
            Some(number) => PageLink::Page {
                number,
                url: page_url(number),
                current: number == current,
            },
            None => PageLink::Ellipsis,
        })
        .collect()
}

/// Site-relative URL of listing page `number`.
pub fn page_url(number: usize) -> String {
    if number <= 1 {
        "/blog".to_string()
    } else {
        format!("/blog/page/{number}")
    }
}

/// Output path of listing page `number`, relative to the output root.
pub fn page_path(number: usize) -> String {
    if number <= 1 {
        "blog/index.html".to_string()
    } else {
        format!("blog/page/{number}/index.html")
    }
}

/// The slice of `items` shown on page `number` (1-based).
pub fn page_slice<T>(items: &[T], number: usize, per_page: usize) -> &[T] {
    let start = (number.saturating_sub(1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(pages: &[Option<usize>]) -> String {
        pages
            .iter()
            .map(|p| p.map(|n| n.to_string()).unwrap_or_else(|| "…".into()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn twenty_three_posts_make_three_pages() {
        let posts: Vec<usize> = (0..23).collect();
        assert_eq!(total_pages(posts.len(), POSTS_PER_PAGE), 3);
        assert_eq!(page_slice(&posts, 1, POSTS_PER_PAGE).len(), 10);
        assert_eq!(page_slice(&posts, 3, POSTS_PER_PAGE), &[20, 21, 22]);
        assert_eq!(page_numbers(1, 3), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn zero_posts_still_one_page() {
        assert_eq!(total_pages(0, POSTS_PER_PAGE), 1);
        let empty: [u8; 0] = [];
        assert!(page_slice(&empty, 1, POSTS_PER_PAGE).is_empty());
    }

    #[test]
    fn exact_multiple() {
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(21, 10), 3);
    }

    #[test]
    fn seven_pages_listed_in_full() {
        assert_eq!(show(&page_numbers(4, 7)), "1 2 3 4 5 6 7");
    }

    #[test]
    fn ellipsis_shapes() {
        assert_eq!(show(&page_numbers(1, 20)), "1 2 … 20");
        assert_eq!(show(&page_numbers(3, 20)), "1 2 3 4 … 20");
        assert_eq!(show(&page_numbers(4, 20)), "1 … 3 4 5 … 20");
        assert_eq!(show(&page_numbers(10, 20)), "1 … 9 10 11 … 20");
        assert_eq!(show(&page_numbers(18, 20)), "1 … 17 18 19 20");
        assert_eq!(show(&page_numbers(20, 20)), "1 … 19 20");
    }

    #[test]
    fn links_mark_current_and_urls() {
        let links = page_links(2, 3);
        assert_eq!(
            links[0],
            PageLink::Page {
                number: 1,
                url: "/blog".into(),
                current: false
            }
        );
        assert_eq!(
            links[1],
            PageLink::Page {
                number: 2,
                url: "/blog/page/2".into(),
                current: true
            }
        );
        let json = serde_json::to_value(&page_links(1, 20)[2]).unwrap();
        assert_eq!(json["kind"], "ellipsis");
    }

    #[test]
    fn paths_for_pages() {
        assert_eq!(page_path(1), "blog/index.html");
        assert_eq!(page_path(3), "blog/page/3/index.html");
    }
}
