//! Interactive visualization module for real-time audibility testing

mod viewer;

pub use viewer::InteractiveViewer;
