//! Renders an animated SVG "now playing" card for the track a user is
//! listening to, or recently listened to, on Spotify or Last.fm.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod server;
pub mod widget;

pub use error::WidgetError;
pub use pipeline::{RenderedWidget, WidgetPipeline};
