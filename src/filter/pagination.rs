use serde::Deserialize;

use crate::database::DatabaseError;

/// Raw `page` / `size` query parameters, kept as strings so that any input
/// (including garbage) reaches the leading-integer parse below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Skip/limit slice of a result set. A limit of zero means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: i64,
    pub limit: i64,
}

impl PageQuery {
    pub fn new(page: Option<&str>, size: Option<&str>) -> Self {
        Self {
            page: page.map(str::to_string),
            size: size.map(str::to_string),
        }
    }

    /// Window to apply, or `None` to return the full result set.
    ///
    /// Pagination kicks in when either parameter is truthy (parses to a
    /// non-zero integer). `page=0&size=2` is therefore the first page, and
    /// `size=0` alone returns everything.
    pub fn window(&self) -> Option<Window> {
        let page = parse_int(self.page.as_deref());
        let size = parse_int(self.size.as_deref());

        if !is_truthy(page) && !is_truthy(size) {
            return None;
        }

        // NaN operands count as zero once pagination is on
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(0);

        Some(Window {
            skip: page.saturating_mul(size),
            limit: size.saturating_abs(),
        })
    }
}

impl Window {
    /// Stores refuse to skip backwards
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.skip < 0 {
            return Err(DatabaseError::InvalidArgument(format!(
                "skip requires a non-negative value, got {}",
                self.skip
            )));
        }
        Ok(())
    }

    /// Effective limit, `None` when unbounded
    pub fn limit(&self) -> Option<i64> {
        (self.limit != 0).then_some(self.limit)
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let iter = items.into_iter().skip(skip);
        match self.limit() {
            Some(limit) => iter.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect(),
            None => iter.collect(),
        }
    }
}

fn is_truthy(value: Option<i64>) -> bool {
    matches!(value, Some(n) if n != 0)
}

/// Leading-integer parse: optional whitespace and sign, then decimal digits
/// (or hex after a `0x` prefix). Trailing junk is ignored. `None` stands for
/// "not a number".
pub(crate) fn parse_int(input: Option<&str>) -> Option<i64> {
    let s = input?.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = i64::from_str_radix(&digits[..end], radix).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(page: Option<&str>, size: Option<&str>) -> Option<Window> {
        PageQuery::new(page, size).window()
    }

    #[test]
    fn parses_leading_integers() {
        assert_eq!(parse_int(Some("2")), Some(2));
        assert_eq!(parse_int(Some("  12abc")), Some(12));
        assert_eq!(parse_int(Some("-3")), Some(-3));
        assert_eq!(parse_int(Some("+4")), Some(4));
        assert_eq!(parse_int(Some("0x1A")), Some(26));
        assert_eq!(parse_int(Some("abc")), None);
        assert_eq!(parse_int(Some("")), None);
        assert_eq!(parse_int(Some("-")), None);
        assert_eq!(parse_int(None), None);
    }

    #[test]
    fn no_parameters_means_full_set() {
        assert_eq!(window(None, None), None);
    }

    #[test]
    fn first_page_via_truthy_size() {
        assert_eq!(window(Some("0"), Some("2")), Some(Window { skip: 0, limit: 2 }));
    }

    #[test]
    fn second_page() {
        assert_eq!(window(Some("1"), Some("2")), Some(Window { skip: 2, limit: 2 }));
    }

    #[test]
    fn zero_size_alone_skips_pagination() {
        assert_eq!(window(None, Some("0")), None);
        assert_eq!(window(Some("0"), Some("0")), None);
        assert_eq!(window(Some("abc"), Some("0")), None);
    }

    #[test]
    fn page_without_size_is_unbounded_window() {
        let w = window(Some("3"), None).unwrap();
        assert_eq!(w, Window { skip: 0, limit: 0 });
        assert_eq!(w.limit(), None);
    }

    #[test]
    fn negative_skip_is_invalid() {
        let w = window(Some("-1"), Some("2")).unwrap();
        assert!(matches!(w.validate(), Err(DatabaseError::InvalidArgument(_))));
    }

    #[test]
    fn negative_size_uses_magnitude_for_limit() {
        let w = window(Some("0"), Some("-2")).unwrap();
        assert_eq!(w.limit(), Some(2));
    }

    #[test]
    fn apply_slices_in_order() {
        let items: Vec<i32> = (1..=5).collect();
        assert_eq!(Window { skip: 2, limit: 2 }.apply(items.clone()), vec![3, 4]);
        assert_eq!(Window { skip: 4, limit: 2 }.apply(items.clone()), vec![5]);
        assert_eq!(Window { skip: 0, limit: 0 }.apply(items.clone()), items);
        assert!(Window { skip: 10, limit: 2 }.apply(items).is_empty());
    }
}
