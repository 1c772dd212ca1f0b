pub mod app;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod history;
pub mod identifiers;
pub mod logger;
pub mod output;
pub mod spreadsheet;
pub mod toolkit;
pub mod workspace;
