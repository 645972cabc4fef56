pub mod app;
pub mod extension;
