pub mod media;

pub use media::{EpisodeEntry, MediaKind, MediaRecord, SeasonEntry, WatchStatus};
