pub mod canvas;
pub mod figure;
pub mod view;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::{Canvas, Placement};
pub use figure::{render_figure, FIGURE_HEIGHT, FIGURE_WIDTH};
pub use view::View3d;
#[cfg(feature = "desktop")]
pub use window::PlotWindow;
