pub mod tracker;
pub use tracker::{
    DetailsUpdate, LibraryFilter, ModalView, SyncReport, ToggleOutcome, ToggleScope, TrackerError,
    TrackerService, derive_status, is_stale,
};

pub mod tracker_impl;
pub use tracker_impl::SeaOrmTrackerService;
