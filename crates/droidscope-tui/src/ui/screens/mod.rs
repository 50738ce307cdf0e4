mod panes;

pub use panes::PanesScreen;
