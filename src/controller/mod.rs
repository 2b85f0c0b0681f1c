//! Live results controller and its observer interface.

mod fetched;
mod observer;

pub use fetched::{ControllerState, FetchedResultsController};
pub use observer::ResultsObserver;
