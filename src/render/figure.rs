use super::canvas::Canvas;
use super::view::View3d;
use crate::model::{Detections, Skeleton};
use crate::source::Frame;

pub const FIGURE_WIDTH: usize = 1000;
pub const FIGURE_HEIGHT: usize = 520;

pub const BACKGROUND_COLOR: u32 = 0xFFFFFF;
pub const BOX_COLOR: u32 = 0x000000;
pub const AXES_COLOR: u32 = 0xC0C0C0;

/// One colour per edge, cycling.
pub const PALETTE: [u32; 10] = [
    0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD,
    0x8C564B, 0xE377C2, 0x7F7F7F, 0xBCBD22, 0x17BECF,
];

const JOINT_RADIUS: i32 = 2;

/// Side-by-side debug figure: the image with boxes and 2D skeletons on the
/// left, the 3D skeletons on the right.
pub fn render_figure(frame: &Frame, detections: &Detections, skeleton: &Skeleton) -> Canvas {
    let mut canvas = Canvas::new(FIGURE_WIDTH, FIGURE_HEIGHT, BACKGROUND_COLOR);
    let panel_w = FIGURE_WIDTH / 2;

    let placement = canvas.blit_fit(frame, 0, 0, panel_w, FIGURE_HEIGHT);
    for b in &detections.boxes {
        let (x0, y0) = placement.map(b[0], b[1]);
        let (x1, y1) = placement.map(b[0] + b[2], b[1] + b[3]);
        canvas.draw_rect(x0, y0, x1 - x0, y1 - y0, BOX_COLOR);
    }
    for pose in &detections.poses2d {
        for (i, edge) in skeleton.edges.iter().enumerate() {
            let (Some(a), Some(b)) = (pose.get(edge[0]), pose.get(edge[1])) else { continue };
            let (x0, y0) = placement.map(a[0], a[1]);
            let (x1, y1) = placement.map(b[0], b[1]);
            canvas.draw_line(x0, y0, x1, y1, PALETTE[i % PALETTE.len()]);
        }
        for p in pose {
            let (x, y) = placement.map(p[0], p[1]);
            canvas.draw_circle(x, y, JOINT_RADIUS, PALETTE[0]);
        }
    }

    let view = View3d::default();
    let to_panel = |pt: (f32, f32)| view.to_panel(pt, panel_w, 0, panel_w, FIGURE_HEIGHT);
    for (a, b) in view.box_edges() {
        let (x0, y0) = to_panel(view.project_axes(a));
        let (x1, y1) = to_panel(view.project_axes(b));
        canvas.draw_line(x0, y0, x1, y1, AXES_COLOR);
    }
    for pose in &detections.poses3d {
        for (i, edge) in skeleton.edges.iter().enumerate() {
            let (Some(&a), Some(&b)) = (pose.get(edge[0]), pose.get(edge[1])) else { continue };
            let (x0, y0) = to_panel(view.project(a));
            let (x1, y1) = to_panel(view.project(b));
            canvas.draw_line(x0, y0, x1, y1, PALETTE[i % PALETTE.len()]);
        }
        for &p in pose {
            let (x, y) = to_panel(view.project(p));
            canvas.draw_circle(x, y, JOINT_RADIUS, PALETTE[0]);
        }
    }

    canvas
}
