//! Frame compositing: camera moves, subtitle layout and the `vello_cpu` render engine.

/// Separable Gaussian blur on premultiplied RGBA8 buffers.
pub(crate) mod blur;
/// [`RenderEngine`](cpu::RenderEngine): composites one frame for a timeline position.
pub mod cpu;
/// Per-effect camera transforms.
pub mod effects;
/// Rendered frame buffers.
pub mod frame;
pub(crate) mod images;
/// Word timing and per-word subtitle styling.
pub mod subtitles;
pub(crate) mod text;
