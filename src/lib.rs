#![allow(clippy::enum_variant_names, clippy::module_inception)]

//! An in-memory filesystem with a small shell on top.
//!
//! [`filesystem::FileTree`] is the engine, [`shell::Session`] runs command
//! lines against it, and [`application::Application`] wires both to a
//! terminal.

pub mod application;
pub mod cli;
pub mod config;
mod ext;
pub mod filesystem;
pub mod shell;
