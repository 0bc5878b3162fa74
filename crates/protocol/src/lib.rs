pub mod commands;
pub mod shared_str;
pub mod theme;
pub mod types;
pub mod units;

pub use commands::{RenderCommand, TextAlign};
pub use shared_str::SharedStr;
pub use theme::ThemeToken;
pub use types::{Color, CursorIcon, Point, Rect};
pub use units::{ValueUnit, format_percentage};
