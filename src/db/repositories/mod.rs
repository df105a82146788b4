pub mod episode;
pub mod media;
pub mod season;
