pub mod actors;
pub mod alerts;
pub mod api;
pub mod config;
pub mod faults;
pub mod lifecycle;
pub mod monitors;
pub mod storage;
pub mod util;
