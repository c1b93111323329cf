//! Per-screen view state and the controller that derives what is shown.
//!
//! [`ViewState`] is a plain value updated by a pure reducer. The
//! [`ViewController`] owns a [`RecordStore`] and re-runs
//! `filter → sort → paginate` over the current snapshot on every action.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::num::NonZeroUsize;

use crate::dataset::Dataset;
use crate::error::{ExportError, FetchError, ViewError};
use crate::export::{self, Artifact, ExportFormat};
use crate::filter::filter;
use crate::paginate::{PageWindow, paginate};
use crate::record::Record;
use crate::sort::{SortSpec, sort};
use crate::store::{LoadOutcome, LoadStatus, LoadTicket, RecordSource, RecordStore};

pub const NO_RESULTS_MESSAGE: &str = "No results found for the given search query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadPhase::Idle => "idle",
            LoadPhase::Loading => "loading",
            LoadPhase::Ready => "ready",
            LoadPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl From<&LoadStatus> for LoadPhase {
    fn from(status: &LoadStatus) -> Self {
        match status {
            LoadStatus::Idle => LoadPhase::Idle,
            LoadStatus::Loading => LoadPhase::Loading,
            LoadStatus::Ready => LoadPhase::Ready,
            LoadStatus::Failed(_) => LoadPhase::Failed,
        }
    }
}

/// A user interaction on a report screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ViewAction {
    Search(String),
    /// Header click: toggles direction on the active field.
    SortBy(String),
    SetSort(Option<SortSpec>),
    NextPage,
    PrevPage,
    GoToPage(usize),
    SetPageSize(usize),
    /// Expands a row, or collapses it if it is already expanded.
    ToggleExpand(String),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub query: String,
    pub sort: Option<SortSpec>,
    pub page: usize,
    pub page_size: NonZeroUsize,
    pub expanded: Option<String>,
}

impl ViewState {
    pub fn new(page_size: NonZeroUsize, sort: Option<SortSpec>) -> Self {
        ViewState {
            query: String::new(),
            sort,
            page: 1,
            page_size,
            expanded: None,
        }
    }

    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page_size, self.page)
    }

    /// Pure transition. Paging past the end is clamped when the view is
    /// derived, not here, since the reducer does not know the row count.
    pub fn apply(self, action: ViewAction) -> ViewState {
        match action {
            ViewAction::Search(query) => ViewState { query, ..self },
            ViewAction::SortBy(field) => ViewState {
                sort: Some(SortSpec::toggle(self.sort.as_ref(), &field)),
                ..self
            },
            ViewAction::SetSort(sort) => ViewState { sort, ..self },
            ViewAction::NextPage => ViewState {
                page: self.page.saturating_add(1),
                ..self
            },
            ViewAction::PrevPage => {
                let page = self.window().prev().current_page;
                ViewState { page, ..self }
            }
            ViewAction::GoToPage(page) => ViewState {
                page: page.max(1),
                ..self
            },
            ViewAction::SetPageSize(size) => match NonZeroUsize::new(size) {
                // keep the first visible row on screen
                Some(page_size) => {
                    let first_row =
                        (self.page.max(1) - 1).saturating_mul(self.page_size.get());
                    ViewState {
                        page: first_row / page_size.get() + 1,
                        page_size,
                        ..self
                    }
                }
                None => self,
            },
            ViewAction::ToggleExpand(id) => {
                let expanded = match self.expanded {
                    Some(current) if current == id => None,
                    _ => Some(id),
                };
                ViewState { expanded, ..self }
            }
            ViewAction::Reset => ViewState::new(self.page_size, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    NoResults { message: String },
}

fn rows_as_json<S: Serializer>(rows: &[Record], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(rows.iter().map(Record::to_json))
}

/// What a report screen renders for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub dataset: Dataset,
    pub phase: LoadPhase,
    #[serde(serialize_with = "rows_as_json")]
    pub rows: Vec<Record>,
    pub total_matches: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub query: String,
    pub sort: Option<SortSpec>,
    pub expanded: Option<String>,
    pub notice: Option<Notice>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ViewController {
    dataset: Dataset,
    store: RecordStore,
    state: ViewState,
}

impl ViewController {
    pub fn new(dataset: Dataset, page_size: NonZeroUsize) -> Self {
        ViewController {
            dataset,
            store: RecordStore::new(dataset.slug()),
            state: ViewState::new(page_size, dataset.default_sort()),
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn phase(&self) -> LoadPhase {
        LoadPhase::from(self.store.status())
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        match self.store.status() {
            LoadStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.store.begin_load()
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Record>, FetchError>,
    ) -> LoadOutcome {
        let outcome = self.store.finish_load(ticket, result);
        if outcome == LoadOutcome::Applied && self.phase() == LoadPhase::Ready {
            self.settle_page();
        }
        outcome
    }

    pub async fn load<S: RecordSource>(&mut self, source: &S) -> Result<(), FetchError> {
        self.store.load(source).await?;
        self.settle_page();
        Ok(())
    }

    /// Apply an action and re-derive.
    ///
    /// The state change is kept even when the store is not ready yet; the
    /// view is then reported as [`ViewError::NotReady`].
    pub fn dispatch(&mut self, action: ViewAction) -> Result<DerivedView, ViewError> {
        if let ViewAction::SortBy(field) = &action {
            self.check_sortable(field)?;
        }
        if let ViewAction::SetSort(Some(spec)) = &action {
            self.check_sortable(&spec.field)?;
        }

        self.state = match action {
            ViewAction::Reset => {
                ViewState::new(self.state.page_size, self.dataset.default_sort())
            }
            other => self.state.clone().apply(other),
        };

        let view = self.derive()?;
        self.state.page = view.current_page;
        Ok(view)
    }

    pub fn derive(&self) -> Result<DerivedView, ViewError> {
        let phase = self.phase();
        if !matches!(phase, LoadPhase::Ready | LoadPhase::Failed) {
            return Err(ViewError::NotReady(phase));
        }

        let snapshot = self.store.snapshot();
        let sequence = self.sequence(&snapshot);
        let page = paginate(&sequence, self.state.window());

        let notice = (sequence.is_empty() && !self.state.query.is_empty()).then(|| {
            Notice::NoResults {
                message: NO_RESULTS_MESSAGE.to_string(),
            }
        });

        Ok(DerivedView {
            dataset: self.dataset,
            phase,
            rows: page.items.into_iter().cloned().collect(),
            total_matches: page.total_items,
            total_pages: page.total_pages,
            current_page: page.current_page,
            page_size: page.page_size,
            query: self.state.query.clone(),
            sort: self.state.sort.clone(),
            expanded: self.state.expanded.clone(),
            notice,
            error: self.last_error().map(ToString::to_string),
        })
    }

    /// Export the filtered and sorted rows (all pages).
    pub fn export(&self, format: ExportFormat) -> Result<Artifact, ExportError> {
        let phase = self.phase();
        if !matches!(phase, LoadPhase::Ready | LoadPhase::Failed) {
            return Err(ViewError::NotReady(phase).into());
        }
        let snapshot = self.store.snapshot();
        let sequence = self.sequence(&snapshot);
        let table = export::tabulate(&sequence, self.dataset.columns());
        export::render(&table, format, self.dataset.sheet_name(), self.dataset.file_stem())
    }

    fn sequence<'a>(&self, snapshot: &'a [Record]) -> Vec<&'a Record> {
        let filtered = filter(snapshot, &self.state.query, &self.dataset.search_scope());
        sort(filtered, self.state.sort.as_ref())
    }

    fn settle_page(&mut self) {
        let len = self.sequence(&self.store.snapshot()).len();
        let total = self.state.window().total_pages(len);
        self.state.page = self.state.page.clamp(1, total);
    }

    fn check_sortable(&self, field: &str) -> Result<(), ViewError> {
        if self.dataset.sortable().contains(&field) {
            Ok(())
        } else {
            Err(ViewError::UnknownSortField(field.to_string()))
        }
    }
}
