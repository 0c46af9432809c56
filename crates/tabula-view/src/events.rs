use serde::{Deserialize, Serialize};

use crate::sort::SortDirection;

/// Notifications for the embedding application, drained after each change.
///
/// In engine-paginated mode sort and filter changes are applied locally and
/// reported with [`Sort`](Self::Sort) / [`FilterChanged`](Self::FilterChanged).
/// In passthrough mode they are not applied; the `*External` variants ask the
/// data source to re-fetch instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    Sort {
        column: String,
    },
    FilterChanged {
        expr: String,
    },
    SortExternal {
        column: String,
        /// `None` when the sort was cleared
        direction: Option<SortDirection>,
    },
    FilterExternal {
        expr: String,
    },
    /// Passthrough mode only: the source must fetch another page
    PageChanged {
        page: usize,
        page_size: usize,
    },
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: Vec<ViewEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: ViewEvent) {
        tracing::trace!(?event, "view event");
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}
