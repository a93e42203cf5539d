//! Read-only translators from legacy note-taking formats.

pub mod cherrytree;
pub mod notecase;
