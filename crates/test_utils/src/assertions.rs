//! Custom Test Assertions
//!
//! Assertion helpers for paged grid results and domain errors that give
//! more meaningful messages than bare `assert!`.

use core_kernel::Page;

/// Asserts the paging metadata of a page
///
/// # Panics
///
/// Panics if the total, the page number or the item count differ
pub fn assert_page<T>(page: &Page<T>, total: i64, page_number: u32, items: usize) {
    assert_eq!(page.total, total, "Expected {} rows in total, got {}", total, page.total);
    assert_eq!(page.page, page_number, "Expected page {}, got {}", page_number, page.page);
    assert_eq!(
        page.items.len(),
        items,
        "Expected {} items on page {}, got {}",
        items,
        page_number,
        page.items.len()
    );
}

/// Asserts that keys extracted from the items are in ascending order
pub fn assert_sorted_by<T, K: PartialOrd + std::fmt::Debug>(items: &[T], key: impl Fn(&T) -> K) {
    let keys: Vec<K> = items.iter().map(key).collect();
    for pair in keys.windows(2) {
        assert!(pair[0] <= pair[1], "Items not in ascending order: {:?}", keys);
    }
}

/// Asserts that keys extracted from the items are in descending order
pub fn assert_sorted_desc_by<T, K: PartialOrd + std::fmt::Debug>(items: &[T], key: impl Fn(&T) -> K) {
    let keys: Vec<K> = items.iter().map(key).collect();
    for pair in keys.windows(2) {
        assert!(pair[0] >= pair[1], "Items not in descending order: {:?}", keys);
    }
}

/// Asserts that a result is an error whose message contains `needle`
pub fn assert_error_contains<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, needle: &str) {
    match result {
        Ok(value) => panic!("Expected an error containing '{}', got Ok({:?})", needle, value),
        Err(e) => assert!(
            e.to_string().contains(needle),
            "Expected error containing '{}', got '{}'",
            needle,
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ListOptions;

    #[test]
    fn test_assert_page() {
        let page = Page::new(vec![1, 2], 12, &ListOptions::new(3, 5));
        assert_page(&page, 12, 3, 2);
    }

    #[test]
    fn test_sorted_helpers() {
        assert_sorted_by(&["a", "b", "b", "c"], |s| *s);
        assert_sorted_desc_by(&[3, 2, 2, 1], |n| *n);
    }

    #[test]
    #[should_panic(expected = "ascending")]
    fn test_unsorted_panics() {
        assert_sorted_by(&[2, 1], |n| *n);
    }

    #[test]
    fn test_error_contains() {
        assert_error_contains::<(), _>(Err("tag 'Volunteer' already exists"), "Volunteer");
    }
}
