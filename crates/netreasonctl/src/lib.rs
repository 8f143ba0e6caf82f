//! netreasonctl library - exposes the shell modules for testing

pub mod cli;
pub mod display;
pub mod repl;
pub mod spinner;
