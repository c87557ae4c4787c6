//! The notifications the controller sends to whatever renders it.
//!
//! Implementations are purely reactive; they keep no playback logic.

use crate::chunker::ElementId;

pub const READ_ALOUD_LABEL: &str = "Read Aloud";
pub const RESUME_LABEL: &str = "Resume";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

pub trait PresentationSurface {
    fn set_status(&mut self, message: &str, severity: Severity);
    /// Prev/next are only offered while this is on.
    fn set_playing(&mut self, playing: bool);
    fn set_idle_label(&mut self, label: &str);
    fn show_missing_credential(&mut self);
    fn hide_missing_credential(&mut self);
    fn set_visible(&mut self, visible: bool);
}

/// Marks the elements behind the chunk being spoken.
pub trait Highlighter {
    /// Highlight `elements` and bring the first one into view.
    fn highlight(&mut self, elements: &[ElementId]);
    fn clear(&mut self, elements: &[ElementId]);
}
