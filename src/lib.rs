pub mod config;
pub mod fetch;
pub mod frame;
pub mod olist;
pub mod validate;
pub mod warehouse;
