use std::f32::consts::TAU;

use eframe::egui::{Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2};

const GLOW_SEGMENTS: u32 = 24;

/// Drawing primitives the frame pipeline needs. Coordinates are field
/// coordinates with the origin at the surface's top-left corner; colors are
/// passed opaque and `opacity` sets their alpha.
pub(crate) trait Surface {
    fn clear(&mut self, color: Color32);

    /// Disc of `radius` filled with a radial gradient that starts at
    /// `opacity` in the center and would reach zero at twice the radius.
    fn fill_glow(&mut self, center: Pos2, radius: f32, color: Color32, opacity: f32);

    /// Soft shadow ring fading from `opacity` at `radius` to nothing at
    /// `radius + blur`.
    fn halo(&mut self, center: Pos2, radius: f32, blur: f32, color: Color32, opacity: f32);

    fn line(&mut self, start: Pos2, end: Pos2, width: f32, color: Color32, opacity: f32);

    fn outline_rect(&mut self, rect: Rect, width: f32, color: Color32, opacity: f32);
}

pub(crate) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn unit_direction(segment: u32) -> Vec2 {
    let angle = (segment as f32 / GLOW_SEGMENTS as f32) * TAU;
    vec2(angle.cos(), angle.sin())
}

fn radial_fan(center: Pos2, radius: f32, inner: Color32, rim: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    mesh.colored_vertex(center, inner);
    for segment in 0..GLOW_SEGMENTS {
        mesh.colored_vertex(center + unit_direction(segment) * radius, rim);
    }
    for segment in 0..GLOW_SEGMENTS {
        let current = 1 + segment;
        let next = 1 + (segment + 1) % GLOW_SEGMENTS;
        mesh.add_triangle(0, current, next);
    }
    mesh
}

fn radial_ring(center: Pos2, inner_radius: f32, outer_radius: f32, inner: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for segment in 0..GLOW_SEGMENTS {
        let direction = unit_direction(segment);
        mesh.colored_vertex(center + direction * inner_radius, inner);
        mesh.colored_vertex(center + direction * outer_radius, Color32::TRANSPARENT);
    }
    for segment in 0..GLOW_SEGMENTS {
        let inner_current = segment * 2;
        let outer_current = inner_current + 1;
        let inner_next = ((segment + 1) % GLOW_SEGMENTS) * 2;
        let outer_next = inner_next + 1;
        mesh.add_triangle(inner_current, outer_current, inner_next);
        mesh.add_triangle(inner_next, outer_current, outer_next);
    }
    mesh
}

pub(crate) struct PainterSurface<'a> {
    painter: &'a Painter,
    rect: Rect,
}

impl<'a> PainterSurface<'a> {
    pub(crate) fn new(painter: &'a Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }

    fn to_screen(&self, point: Pos2) -> Pos2 {
        self.rect.min + point.to_vec2()
    }
}

impl Surface for PainterSurface<'_> {
    fn clear(&mut self, color: Color32) {
        self.painter.rect_filled(self.rect, 0.0, color);
    }

    fn fill_glow(&mut self, center: Pos2, radius: f32, color: Color32, opacity: f32) {
        if radius <= 0.0 || opacity <= 0.0 {
            return;
        }
        // The gradient would fade out at 2r; the disc stops at r, halfway down.
        let inner = with_opacity(color, opacity);
        let rim = with_opacity(color, opacity * 0.5);
        let mesh = radial_fan(self.to_screen(center), radius, inner, rim);
        self.painter.add(Shape::mesh(mesh));
    }

    fn halo(&mut self, center: Pos2, radius: f32, blur: f32, color: Color32, opacity: f32) {
        if blur <= 0.0 || opacity <= 0.0 {
            return;
        }
        let mesh = radial_ring(
            self.to_screen(center),
            radius,
            radius + blur,
            with_opacity(color, opacity),
        );
        self.painter.add(Shape::mesh(mesh));
    }

    fn line(&mut self, start: Pos2, end: Pos2, width: f32, color: Color32, opacity: f32) {
        if opacity <= 0.0 {
            return;
        }
        self.painter.line_segment(
            [self.to_screen(start), self.to_screen(end)],
            Stroke::new(width, with_opacity(color, opacity)),
        );
    }

    fn outline_rect(&mut self, rect: Rect, width: f32, color: Color32, opacity: f32) {
        let stroke = Stroke::new(width, with_opacity(color, opacity));
        let top_left = self.to_screen(rect.min);
        let top_right = self.to_screen(pos2(rect.max.x, rect.min.y));
        let bottom_right = self.to_screen(rect.max);
        let bottom_left = self.to_screen(pos2(rect.min.x, rect.max.y));

        self.painter.line_segment([top_left, top_right], stroke);
        self.painter.line_segment([top_right, bottom_right], stroke);
        self.painter.line_segment([bottom_right, bottom_left], stroke);
        self.painter.line_segment([bottom_left, top_left], stroke);
    }
}
