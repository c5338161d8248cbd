pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod premium;
pub mod subscription;
pub mod video;
pub mod watermark;
