//! Property tests for list options and paging

use core_kernel::{ListOptions, Page, MAX_PER_PAGE};
use proptest::prelude::*;

proptest! {
    #[test]
    fn options_are_always_clamped(page in 0u32..10_000, per_page in 0u32..10_000) {
        let options = ListOptions::new(page, per_page);
        prop_assert!(options.page >= 1);
        prop_assert!(options.per_page >= 1 && options.per_page <= MAX_PER_PAGE);
        prop_assert_eq!(options.offset(), (options.page as i64 - 1) * options.per_page as i64);
    }

    #[test]
    fn every_row_falls_on_some_page(total in 0i64..100_000, per_page in 1u32..=100) {
        let page: Page<()> = Page::new(vec![], total, &ListOptions::new(1, per_page));
        let pages = page.total_pages() as i64;
        prop_assert!(pages >= 1);
        prop_assert!(pages * per_page as i64 >= total);
        if total > 0 {
            prop_assert!((pages - 1) * (per_page as i64) < total);
        }
    }

    #[test]
    fn unknown_keys_become_filters(key in "[a-z_]{1,12}", value in "[a-zA-Z0-9]{0,12}") {
        prop_assume!(!["page", "per_page", "sort", "order", "q"].contains(&key.as_str()));
        let options = ListOptions::from_query_pairs(vec![(key.clone(), value.clone())]).unwrap();
        prop_assert_eq!(options.filters.get(&key), Some(&value));
    }
}
