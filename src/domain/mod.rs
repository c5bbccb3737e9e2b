pub mod cycle;
pub mod models;
pub mod playlists;
pub mod schedule;
pub mod stats;
