use serde::{Deserialize, Serialize};

/// Page-number pagination, DRF style: `?page=2&limit=10`. `limit` lets the
/// client override the configured page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    pub limit: Option<i64>,
}

fn default_page() -> i64 {
    1
}

impl Pagination {
    pub fn page_size(&self, default: i64) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(default)
    }

    pub fn offset(&self, page_size: i64) -> i64 {
        (self.page.max(1) - 1) * page_size
    }
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wraps one page of `results`, building relative next/previous links
    /// against `path`. `pairs` are the request's query parameters; every
    /// parameter except `page` is reproduced in the links so active filters
    /// survive page navigation.
    pub fn new(
        path: &str,
        pairs: &[(String, String)],
        p: Pagination,
        page_size: i64,
        count: i64,
        results: Vec<T>,
    ) -> Self {
        let page = p.page.max(1);
        let last_page = if count == 0 {
            1
        } else {
            (count + page_size - 1) / page_size
        };
        let link = |n: i64| {
            let mut query: Vec<String> = pairs
                .iter()
                .filter(|(key, _)| key != "page")
                .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
                .collect();
            query.push(format!("page={n}"));
            format!("{path}?{}", query.join("&"))
        };
        let next = (page < last_page).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(page: i64, limit: Option<i64>) -> Pagination {
        Pagination { page, limit }
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn limit_overrides_default_page_size() {
        assert_eq!(pagination(1, Some(20)).page_size(6), 20);
        assert_eq!(pagination(1, None).page_size(6), 6);
        assert_eq!(pagination(1, Some(0)).page_size(6), 6);
    }

    #[test]
    fn offset_starts_at_zero() {
        assert_eq!(pagination(1, None).offset(6), 0);
        assert_eq!(pagination(3, None).offset(6), 12);
        assert_eq!(pagination(0, None).offset(6), 0);
    }

    #[test]
    fn first_page_has_no_previous() {
        let page = Page::new("/api/recipes/", &[], pagination(1, None), 6, 20, vec![1, 2]);
        assert_eq!(page.previous, None);
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?page=2"));
    }

    #[test]
    fn middle_page_links_both_ways() {
        let pairs = pairs(&[("page", "2"), ("limit", "5")]);
        let page = Page::new("/api/recipes/", &pairs, pagination(2, Some(5)), 5, 20, vec![1]);
        assert_eq!(page.previous.as_deref(), Some("/api/recipes/?limit=5&page=1"));
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?limit=5&page=3"));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new("/api/recipes/", &[], pagination(4, None), 6, 20, vec![1, 2]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/recipes/?page=3"));
    }

    #[test]
    fn empty_result_set_has_no_links() {
        let page: Page<i32> = Page::new("/api/users/", &[], pagination(1, None), 6, 0, vec![]);
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn links_preserve_active_filters() {
        let pairs = pairs(&[("tags", "vegan"), ("tags", "breakfast"), ("page", "1")]);
        let page = Page::new("/api/recipes/", &pairs, pagination(1, None), 6, 20, vec![1]);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?tags=vegan&tags=breakfast&page=2")
        );
    }

    #[test]
    fn links_preserve_recipes_limit() {
        let pairs = pairs(&[("recipes_limit", "3"), ("page", "2")]);
        let page = Page::new(
            "/api/users/subscriptions/",
            &pairs,
            pagination(2, None),
            6,
            20,
            vec![1],
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/users/subscriptions/?recipes_limit=3&page=1")
        );
    }

    #[test]
    fn link_values_are_percent_encoded() {
        let pairs = pairs(&[("author", "a&b=c d")]);
        let page = Page::new("/api/recipes/", &pairs, pagination(1, None), 6, 20, vec![1]);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?author=a%26b%3Dc%20d&page=2")
        );
    }
}
