//! Headless client for FreeFEM plot streams: receives framed payloads over
//! TCP, builds their geometries and keeps them packed for drawing.

pub mod app;
pub mod config;
pub mod frame;
pub mod net;
pub mod scene;
