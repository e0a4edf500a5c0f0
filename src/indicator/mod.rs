pub mod rolling;

pub use rolling::{window_stats, RollingWindow, Window, WindowStats};
