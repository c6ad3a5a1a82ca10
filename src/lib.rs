#![doc(html_root_url = "https://docs.rs/stream-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Renders declarative [`Template`](`template::Template`)s into a DOM-like tree and keeps it live with cancellable streams.
//!
//! Use [`render::mount`] with a [`memory::MemoryDom`] (anywhere) or [`web::WebDom::spawn_mount`] (in a browser).
//!
//! # Logging
//!
//! This crate reports through [`tracing`].
//! Page content (text and attribute values) is redacted in log output unless the `"dangerous-logging"` feature is enabled.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod cancel;
pub mod construct;
pub mod dom;
pub mod drive;
pub mod dynamic_list;
pub mod error;
pub mod memory;
pub mod relay;
pub mod render;
pub mod stream;
pub mod template;
pub mod web;

mod redact;
