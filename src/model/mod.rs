pub mod apps;
pub mod displays;
pub mod ids;
pub mod spaces;
pub mod windows;

pub use apps::Apps;
pub use displays::Displays;
pub use spaces::Spaces;
pub use windows::Windows;

/// The four indexed collections, grouped for convenience where a
/// reconciler pipeline step needs more than one of them at once.
#[derive(Debug, Default)]
pub struct State {
    pub windows: Windows,
    pub spaces: Spaces,
    pub displays: Displays,
    pub apps: Apps,
}
