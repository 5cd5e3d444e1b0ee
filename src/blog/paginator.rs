/// Posts shown on one page of any feed.
pub const POSTS_PER_PAGE: u64 = 10;

/// Position of one page within a listing.
///
/// Requested page numbers are forgiving: a missing or non-numeric value
/// means the first page, and anything below 1 or past the end lands on the
/// last page. An empty listing still has a single (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
}

impl PageInfo {
    pub fn resolve(requested: Option<&str>, count: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = if count == 0 {
            1
        } else {
            count.div_ceil(per_page)
        };

        let number = match requested.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n < 1 => num_pages,
                Ok(n) => (n as u64).min(num_pages),
                // Integers too large for i64 are still past either end.
                Err(_) if is_integer(raw) => num_pages,
                Err(_) => 1,
            },
        };

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_page_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn page_range(&self) -> Vec<u64> {
        (1..=self.num_pages).collect()
    }
}

/// Optional sign followed by at least one ASCII digit.
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One page of items together with its navigation data.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
