mod app;
mod confirm;
pub mod event;
pub mod hooks;
mod ui;

pub use app::App;
pub use hooks::DesktopHooks;
