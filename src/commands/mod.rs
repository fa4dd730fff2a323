pub mod completions;
pub mod config;
pub mod layout;
pub mod merge;
pub mod persona;
pub mod similarity;
