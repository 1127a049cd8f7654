pub mod assemble;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod index;
pub mod output;
pub mod resolver;
