use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::filter::SearchScope;
use crate::record::{CoinMarket, Invoice};
use crate::sort::SortSpec;

/// The two report screens the viewer serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Invoices,
    Crypto,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Invoices, Dataset::Crypto];

    pub fn slug(self) -> &'static str {
        match self {
            Dataset::Invoices => "invoices",
            Dataset::Crypto => "crypto",
        }
    }

    /// Declared column order, used for header-only exports of empty views.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Dataset::Invoices => &Invoice::COLUMNS,
            Dataset::Crypto => &CoinMarket::COLUMNS,
        }
    }

    pub fn sortable(self) -> &'static [&'static str] {
        match self {
            Dataset::Invoices => &["invoiceNumber", "date", "amount", "customerName", "status"],
            Dataset::Crypto => &["market_cap_rank", "current_price"],
        }
    }

    pub fn search_scope(self) -> SearchScope {
        match self {
            Dataset::Invoices => SearchScope::AllText,
            Dataset::Crypto => SearchScope::Fields(vec!["name".to_string()]),
        }
    }

    pub fn default_sort(self) -> Option<SortSpec> {
        match self {
            Dataset::Invoices => None,
            Dataset::Crypto => Some(SortSpec::ascending("market_cap_rank")),
        }
    }

    pub fn sheet_name(self) -> &'static str {
        match self {
            Dataset::Invoices => "Invoices",
            Dataset::Crypto => "Markets",
        }
    }

    /// Export file name without extension.
    pub fn file_stem(self) -> &'static str {
        self.slug()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dataset '{}'", s))
    }
}
