//! Paragraph direction and alignment commands for a structured rich text tree.
//!
//! [`bidi::BidiEditor`] runs the commands against a [`tree::Document`] and a selection.
//! The other modules load documents ([`import`], [`text`], [`tree::markup`]), describe
//! the host engine ([`profile`], [`config`]) and draw a terminal preview ([`render`]).

pub mod bidi;
pub mod config;
pub mod import;
pub mod profile;
pub mod range;
pub mod render;
pub mod text;
pub mod theme;
pub mod tree;
