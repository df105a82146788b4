pub use super::episode::Entity as Episode;
pub use super::media::Entity as Media;
pub use super::season::Entity as Season;
