/// Orthographic 3D view of camera-space poses.
///
/// Poses arrive with Y pointing down and Z pointing away from the camera.
/// They are turned 90 degrees about X so that depth runs into the screen
/// and height points up, then projected for the given elevation/azimuth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View3d {
    pub elevation_deg: f32,
    pub azimuth_deg: f32,
    pub x_limits: (f32, f32),
    pub depth_limits: (f32, f32),
    pub height_limits: (f32, f32),
}

impl Default for View3d {
    fn default() -> Self {
        Self {
            elevation_deg: 5.0,
            azimuth_deg: -85.0,
            x_limits: (-1500.0, 1500.0),
            depth_limits: (0.0, 3000.0),
            height_limits: (-1500.0, 1500.0),
        }
    }
}

fn normalize(v: f32, (lo, hi): (f32, f32)) -> f32 {
    (v - (lo + hi) / 2.0) / (hi - lo)
}

impl View3d {
    /// Camera-space point -> unit-cube axes `(x, depth, height)`, each in -0.5..0.5 inside the limits.
    pub fn to_axes(&self, p: [f32; 3]) -> [f32; 3] {
        [
            normalize(p[0], self.x_limits),
            normalize(p[2], self.depth_limits),
            normalize(-p[1], self.height_limits),
        ]
    }

    /// Unit-cube axes -> screen `(right, up)`.
    pub fn project_axes(&self, a: [f32; 3]) -> (f32, f32) {
        let az = self.azimuth_deg.to_radians();
        let el = self.elevation_deg.to_radians();
        let right = -a[0] * az.sin() + a[1] * az.cos();
        let up = -a[0] * el.sin() * az.cos() - a[1] * el.sin() * az.sin() + a[2] * el.cos();
        (right, up)
    }

    pub fn project(&self, p: [f32; 3]) -> (f32, f32) {
        self.project_axes(self.to_axes(p))
    }

    /// Maps a projected point into a `w x h` panel at `(x, y)`.
    pub fn to_panel(&self, (right, up): (f32, f32), x: usize, y: usize, w: usize, h: usize) -> (i32, i32) {
        let scale = 0.9 * w.min(h) as f32;
        let cx = x as f32 + w as f32 / 2.0;
        let cy = y as f32 + h as f32 / 2.0;
        ((cx + right * scale).round() as i32, (cy - up * scale).round() as i32)
    }

    /// Edges of the limit box, for drawing the axes frame.
    pub fn box_edges(&self) -> Vec<([f32; 3], [f32; 3])> {
        let corners: Vec<[f32; 3]> = (0..8)
            .map(|i| {
                [
                    if i & 1 == 0 { -0.5 } else { 0.5 },
                    if i & 2 == 0 { -0.5 } else { 0.5 },
                    if i & 4 == 0 { -0.5 } else { 0.5 },
                ]
            })
            .collect();
        let mut edges = Vec::with_capacity(12);
        for i in 0..8usize {
            for bit in [1usize, 2, 4] {
                if i & bit == 0 {
                    edges.push((corners[i], corners[i | bit]));
                }
            }
        }
        edges
    }
}
