//! Shared helpers for end-to-end tests.

#![allow(dead_code)]

mod fakes;
mod server;

pub use fakes::{solid_png, FakeArtwork, FakeProvider};
pub use server::TestServer;
