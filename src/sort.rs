use serde::{Deserialize, Serialize};

use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Spec after a header click on `field`: same field flips, a new field
    /// starts ascending.
    pub fn toggle(current: Option<&SortSpec>, field: &str) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field: spec.field.clone(),
                direction: spec.direction.flipped(),
            },
            _ => SortSpec::ascending(field),
        }
    }
}

/// Stable sort on `spec.field`; `None` keeps input order.
///
/// Missing fields sort as `Null`. Descending reverses the comparison, so
/// equal keys keep their input order in both directions.
pub fn sort<'a>(mut records: Vec<&'a Record>, spec: Option<&SortSpec>) -> Vec<&'a Record> {
    let Some(spec) = spec else {
        return records;
    };
    let key = |r: &Record| r.get(&spec.field).cloned().unwrap_or(Value::Null);

    records.sort_by(|a, b| {
        let ord = key(a).natural_cmp(&key(b));
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Record> {
        vec![
            Record::new("a").with("amount", 100.0).with("date", "2024-01-02"),
            Record::new("b").with("amount", 50.0).with("date", "2024-01-03"),
            Record::new("c").with("amount", 200.0).with("date", "2024-01-01"),
            Record::new("d").with("amount", 50.0).with("date", "2024-01-04"),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn no_spec_keeps_input_order() {
        let records = sample();
        let out = sort(records.iter().collect(), None);
        assert_eq!(ids(&out), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn ascending_numeric_is_stable() {
        let records = sample();
        let out = sort(records.iter().collect(), Some(&SortSpec::ascending("amount")));
        assert_eq!(ids(&out), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn descending_keeps_ties_in_input_order() {
        let records = sample();
        let out = sort(records.iter().collect(), Some(&SortSpec::descending("amount")));
        assert_eq!(ids(&out), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn lexical_dates() {
        let records = sample();
        let out = sort(records.iter().collect(), Some(&SortSpec::ascending("date")));
        assert_eq!(ids(&out), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn missing_field_sorts_first_ascending() {
        let mut records = sample();
        records.push(Record::new("e"));
        let out = sort(records.iter().collect(), Some(&SortSpec::ascending("amount")));
        assert_eq!(out[0].id(), "e");
    }

    #[test]
    fn toggle_flips_same_field_and_resets_new_field() {
        let first = SortSpec::toggle(None, "amount");
        assert_eq!(first, SortSpec::ascending("amount"));
        let second = SortSpec::toggle(Some(&first), "amount");
        assert_eq!(second, SortSpec::descending("amount"));
        let third = SortSpec::toggle(Some(&second), "amount");
        assert_eq!(third, SortSpec::ascending("amount"));
        assert_eq!(
            SortSpec::toggle(Some(&second), "date"),
            SortSpec::ascending("date")
        );
    }
}
