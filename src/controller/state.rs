use serde::Serialize;

use crate::core::SyncError;
use crate::mutation::Mutation;
use crate::query::QueryState;
use crate::store::PageResult;

/// What a resource table is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    /// A fetch is in flight. `previous` stays visible until it lands.
    Loading { previous: Option<PageResult> },
    Ready(PageResult),
    /// The last fetch or mutation failed. `previous` is the data shown before
    /// the failure; `failed` is the rejected mutation, if one caused it.
    Error {
        error: SyncError,
        previous: Option<PageResult>,
        failed: Option<Mutation>,
    },
    /// A mutation is in flight; `resume` is the state it started from, kept
    /// current by fetches that land meanwhile.
    Mutating {
        mutation: Mutation,
        resume: Box<ViewState>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    QueryChanged,
    FetchSucceeded(PageResult),
    FetchFailed(SyncError),
    MutationStarted(Mutation),
    MutationSucceeded(PageResult),
    MutationFailed(SyncError, Mutation),
}

impl ViewState {
    /// The page a UI should render in this state, if any.
    pub fn page(&self) -> Option<&PageResult> {
        match self {
            ViewState::Idle => None,
            ViewState::Loading { previous } | ViewState::Error { previous, .. } => {
                previous.as_ref()
            }
            ViewState::Ready(page) => Some(page),
            ViewState::Mutating { resume, .. } => resume.page(),
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            ViewState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        match self {
            ViewState::Loading { .. } => true,
            ViewState::Mutating { resume, .. } => resume.is_loading(),
            _ => false,
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self, ViewState::Mutating { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Loading { .. } => "loading",
            ViewState::Ready(_) => "ready",
            ViewState::Error { .. } => "error",
            ViewState::Mutating { .. } => "mutating",
        }
    }

    /// Pure transition function of the table state machine.
    pub fn next(self, event: ViewEvent) -> ViewState {
        match (self, event) {
            (ViewState::Mutating { resume, .. }, ViewEvent::MutationSucceeded(page)) => {
                if resume.is_loading() {
                    ViewState::Loading {
                        previous: Some(page),
                    }
                } else {
                    ViewState::Ready(page)
                }
            }
            (ViewState::Mutating { resume, .. }, ViewEvent::MutationFailed(error, failed)) => {
                ViewState::Error {
                    error,
                    previous: resume.page().cloned(),
                    failed: Some(failed),
                }
            }
            (state @ ViewState::Mutating { .. }, ViewEvent::MutationStarted(_)) => state,
            (ViewState::Mutating { mutation, resume }, event) => ViewState::Mutating {
                mutation,
                resume: Box::new(resume.next(event)),
            },

            (state, ViewEvent::QueryChanged) => ViewState::Loading {
                previous: state.page().cloned(),
            },
            (_, ViewEvent::FetchSucceeded(page)) => ViewState::Ready(page),
            (state, ViewEvent::FetchFailed(error)) => ViewState::Error {
                previous: state.page().cloned(),
                error,
                failed: None,
            },
            (state, ViewEvent::MutationStarted(mutation)) => ViewState::Mutating {
                mutation,
                resume: Box::new(state),
            },
            (_, ViewEvent::MutationSucceeded(page)) => ViewState::Ready(page),
            (state, ViewEvent::MutationFailed(error, failed)) => ViewState::Error {
                previous: state.page().cloned(),
                error,
                failed: Some(failed),
            },
        }
    }
}

/// What the controller publishes to its UI after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub view: ViewState,
    pub query: QueryState,
}

impl TableSnapshot {
    pub fn page(&self) -> Option<&PageResult> {
        self.view.page()
    }
}

/// Compact, serialisable summary of a snapshot, used for logging and the CLI.
#[derive(Debug, Serialize)]
pub struct SnapshotSummary {
    pub state: &'static str,
    pub page: u32,
    pub page_size: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
    pub rows: usize,
    pub error: Option<String>,
}

impl From<&TableSnapshot> for SnapshotSummary {
    fn from(snapshot: &TableSnapshot) -> Self {
        let page = snapshot.page();
        Self {
            state: snapshot.view.name(),
            page: snapshot.query.page(),
            page_size: snapshot.query.page_size(),
            total: page.map(|p| p.total),
            total_pages: page.map(PageResult::total_pages),
            rows: page.map_or(0, |p| p.records.len()),
            error: snapshot.view.error().map(SyncError::display_message),
        }
    }
}
