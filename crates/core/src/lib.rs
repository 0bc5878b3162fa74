//! Core of the ember flame graph widget.
//!
//! ```text
//!   TreeProvider ──▶ FlamegraphData ──▶ layout ──▶ RenderNode[] ──▶ canvas ──▶ RenderCommand[]
//!        ▲            (snapshot)          ▲                           ▲
//!        │                                │                           │
//!   FlamegraphState ◀── filters      ZoomRegion ◀── interaction ──────┘
//! ```

pub mod cache;
pub mod canvas;
pub mod color;
pub mod config;
pub mod filters;
pub mod interaction;
pub mod layout;
pub mod model;
pub mod parsers;
pub mod provider;
pub mod svg;
pub mod tooltip;
pub mod widget;

pub use config::FlamegraphConfig;
pub use widget::{FlamegraphWidget, WidgetOutput};
