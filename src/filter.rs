//! Free-text search over record text fields.

use crate::record::Record;

/// Which fields a query is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Every text field of the record.
    #[default]
    AllText,
    /// Only the named text fields.
    Fields(Vec<String>),
}

impl SearchScope {
    fn matches(&self, record: &Record, needle: &str) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(needle);
        match self {
            SearchScope::AllText => record
                .fields()
                .iter()
                .filter_map(|(_, v)| v.as_text())
                .any(hit),
            SearchScope::Fields(names) => names
                .iter()
                .filter_map(|name| record.get(name).and_then(|v| v.as_text()))
                .any(hit),
        }
    }
}

/// Records whose searched text fields contain `query`, case-insensitively.
///
/// Numbers are never matched. An empty query passes everything through in
/// input order.
pub fn filter<'a>(records: &'a [Record], query: &str, scope: &SearchScope) -> Vec<&'a Record> {
    if query.is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| scope.matches(record, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoices() -> Vec<Record> {
        vec![
            Record::new("1")
                .with("customerName", "Acme Corp")
                .with("amount", 100.0),
            Record::new("2")
                .with("customerName", "Globex")
                .with("amount", 250.0),
            Record::new("3")
                .with("customerName", "ACME Hanoi")
                .with("amount", 100.0),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn empty_query_is_identity() {
        let records = invoices();
        let out = filter(&records, "", &SearchScope::AllText);
        assert_eq!(ids(&out), vec!["1", "2", "3"]);
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let records = invoices();
        let out = filter(&records, "aCmE", &SearchScope::AllText);
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn numbers_are_not_searched() {
        let records = invoices();
        assert!(filter(&records, "250", &SearchScope::AllText).is_empty());
    }

    #[test]
    fn id_field_is_searchable() {
        let records = invoices();
        assert_eq!(ids(&filter(&records, "2", &SearchScope::AllText)), vec!["2"]);
    }

    #[test]
    fn field_scope_ignores_other_text() {
        let records = vec![
            Record::new("bitcoin")
                .with("name", "Bitcoin")
                .with("image", "https://img.test/bitcoin.png"),
            Record::new("ether")
                .with("name", "Ethereum")
                .with("image", "https://img.test/eth.png"),
        ];
        let scope = SearchScope::Fields(vec!["name".to_string()]);
        assert!(filter(&records, "https", &scope).is_empty());
        assert_eq!(ids(&filter(&records, "eth", &scope)), vec!["ether"]);
    }
}
