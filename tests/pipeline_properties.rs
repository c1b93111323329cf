//! Laws of the filter → sort → paginate → export pipeline over generated
//! record sets.

use einvoice::dataset::Dataset;
use einvoice::export::{tabulate, to_csv};
use einvoice::filter::{SearchScope, filter};
use einvoice::paginate::{PageWindow, paginate};
use einvoice::record::{Record, Value};
use einvoice::sort::{SortSpec, sort};
use einvoice::view::{ViewAction, ViewController};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::num::NonZeroUsize;

fn records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(
        (
            prop::option::of(0u8..6),
            "[a-cA-C ]{0,6}",
            prop::sample::select(vec!["Paid", "Pending", "Cancelled"]),
        ),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (amount, customer, status))| {
                Record::new(format!("#{}", i))
                    .with("amount", amount.map(f64::from))
                    .with("customerName", customer)
                    .with("status", status)
            })
            .collect()
    })
}

fn key<'a>(record: &'a Record, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&Value::Null)
}

fn position(all: &[Record], record: &Record) -> usize {
    all.iter().position(|r| r.id() == record.id()).unwrap()
}

proptest! {
    #[test]
    fn filter_is_an_ordered_subset(all in records(), query in "[a-cA-C]{0,2}") {
        let hits = filter(&all, &query, &SearchScope::AllText);
        let positions: Vec<usize> = hits.iter().map(|r| position(&all, r)).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let needle = query.to_lowercase();
        for record in &all {
            let matched = record
                .fields()
                .iter()
                .filter_map(|(_, v)| v.as_text())
                .any(|t| t.to_lowercase().contains(&needle));
            prop_assert_eq!(matched, hits.iter().any(|r| r.id() == record.id()));
        }
    }

    #[test]
    fn empty_query_is_identity(all in records()) {
        let hits = filter(&all, "", &SearchScope::AllText);
        prop_assert_eq!(hits.len(), all.len());
        prop_assert!(hits.iter().zip(&all).all(|(a, b)| a.id() == b.id()));
    }

    #[test]
    fn sort_is_ordered_and_stable(all in records(), descending in any::<bool>()) {
        let spec = if descending {
            SortSpec::descending("amount")
        } else {
            SortSpec::ascending("amount")
        };
        let sorted = sort(all.iter().collect(), Some(&spec));
        prop_assert_eq!(sorted.len(), all.len());

        for pair in sorted.windows(2) {
            let mut order = key(pair[0], "amount").natural_cmp(key(pair[1], "amount"));
            if descending {
                order = order.reverse();
            }
            prop_assert_ne!(order, Ordering::Greater);
            if order == Ordering::Equal {
                prop_assert!(position(&all, pair[0]) < position(&all, pair[1]));
            }
        }
    }

    #[test]
    fn descending_reverses_only_distinct_keys(all in records()) {
        let asc = sort(all.iter().collect(), Some(&SortSpec::ascending("customerName")));
        let desc = sort(all.iter().collect(), Some(&SortSpec::descending("customerName")));
        let asc_keys: Vec<&Value> = asc.iter().map(|r| key(r, "customerName")).collect();
        let mut desc_keys: Vec<&Value> = desc.iter().map(|r| key(r, "customerName")).collect();
        desc_keys.reverse();
        prop_assert_eq!(asc_keys, desc_keys);
    }

    #[test]
    fn pages_cover_the_sequence_exactly(all in records(), size in 1usize..12) {
        let page_size = NonZeroUsize::new(size).unwrap();
        let first = paginate(&all, PageWindow::new(page_size, 1));
        prop_assert_eq!(first.total_pages, all.len().div_ceil(size).max(1));

        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            let chunk = paginate(&all, PageWindow::new(page_size, page));
            prop_assert!(chunk.items.len() <= size);
            seen.extend(chunk.items.into_iter().map(|r| r.id().to_string()));
        }
        let expected: Vec<String> = all.iter().map(|r| r.id().to_string()).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn requested_page_is_clamped(all in records(), size in 1usize..12, requested in 0usize..20) {
        let page = paginate(&all, PageWindow::new(NonZeroUsize::new(size).unwrap(), requested));
        prop_assert!(page.current_page >= 1);
        prop_assert!(page.current_page <= page.total_pages);
    }

    #[test]
    fn export_has_one_line_per_match_plus_header(all in records(), query in "[a-c]{0,1}") {
        let hits = filter(&all, &query, &SearchScope::AllText);
        let sorted = sort(hits, Some(&SortSpec::ascending("amount")));
        let table = tabulate(&sorted, Dataset::Invoices.columns());
        prop_assert_eq!(table.rows.len(), sorted.len());

        let csv = to_csv(&table);
        prop_assert_eq!(csv.lines().count(), sorted.len() + 1);
        for (line, record) in csv.lines().skip(1).zip(&sorted) {
            let prefix = format!("{},", record.id());
            prop_assert!(line.starts_with(&prefix));
        }
    }

    #[test]
    fn controller_page_never_leaves_range(
        all in records(),
        actions in prop::collection::vec(
            prop_oneof![
                "[a-c]{0,2}".prop_map(ViewAction::Search),
                Just(ViewAction::SortBy("amount".to_string())),
                Just(ViewAction::NextPage),
                Just(ViewAction::PrevPage),
                (0usize..10).prop_map(ViewAction::GoToPage),
                (0usize..6).prop_map(ViewAction::SetPageSize),
            ],
            1..15,
        ),
    ) {
        let mut controller = ViewController::new(Dataset::Invoices, NonZeroUsize::new(3).unwrap());
        let ticket = controller.begin_load();
        controller.finish_load(ticket, Ok(all));

        for action in actions {
            let view = controller.dispatch(action).unwrap();
            prop_assert!(view.current_page >= 1 && view.current_page <= view.total_pages);
            prop_assert_eq!(controller.state().page, view.current_page);
            prop_assert!(view.rows.len() <= view.page_size);
        }
    }
}

#[test]
fn invoice_sort_then_search_scenario() {
    let all = vec![
        Record::new("1").with("amount", 100.0).with("customerName", "Acme"),
        Record::new("2").with("amount", 50.0).with("customerName", "Globex"),
        Record::new("3").with("amount", 200.0).with("customerName", "Initech"),
    ];
    let sorted = sort(all.iter().collect(), Some(&SortSpec::ascending("amount")));
    let ids: Vec<&str> = sorted.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["2", "1", "3"]);

    let hits = filter(&all, "no-match-string", &SearchScope::AllText);
    let page = paginate(&hits, PageWindow::new(NonZeroUsize::new(10).unwrap(), 1));
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

#[test]
fn market_name_search_scenario() {
    let all = vec![
        Record::new("bitcoin").with("name", "Bitcoin").with("symbol", "btc"),
        Record::new("ethereum").with("name", "Ethereum").with("symbol", "eth"),
    ];
    let hits = filter(&all, "BIT", &Dataset::Crypto.search_scope());
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), "bitcoin");

    let hits = filter(&all, "btc", &Dataset::Crypto.search_scope());
    assert!(hits.is_empty());
}
