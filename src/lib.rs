pub mod alignment;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod oracle;
pub mod tree;
// cmd and reports are binary modules, declared in main.rs.
