//! Everything that turns the outside world into [BrowserEvent](super::events::BrowserEvent)s:
//! the bridge reader, the periodic save alarm and the mirror of open tabs.

pub mod alarm;
pub mod reader;
pub mod tabs;
