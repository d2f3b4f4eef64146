//! Immediate-mode HUD widgets.

use macroquad::prelude::*;

pub const BTN_FONT_SIZE: f32 = 18.0;

pub fn draw_panel(rect: Rect) {
    draw_rectangle(
        rect.x,
        rect.y,
        rect.w,
        rect.h,
        Color::new(0.10, 0.10, 0.12, 0.88),
    );
    draw_rectangle_lines(
        rect.x,
        rect.y,
        rect.w,
        rect.h,
        1.0,
        Color::new(0.28, 0.28, 0.30, 1.0),
    );
}

/// A disabled button draws dim and never reports a click, so the caller
/// cannot fire an operation the session does not permit.
pub fn button(rect: Rect, label: &str, enabled: bool) -> bool {
    let (mx, my) = mouse_position();
    let hovered = rect.contains(vec2(mx, my));
    let clicked = enabled && hovered && is_mouse_button_pressed(MouseButton::Left);

    let bg = if !enabled {
        Color::new(0.12, 0.12, 0.12, 1.0)
    } else if hovered {
        Color::new(0.25, 0.25, 0.25, 1.0)
    } else {
        Color::new(0.18, 0.18, 0.18, 1.0)
    };

    draw_rectangle(rect.x, rect.y, rect.w, rect.h, bg);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, GRAY);
    draw_text(
        label,
        rect.x + 10.0,
        rect.y + rect.h * 0.72,
        BTN_FONT_SIZE,
        if enabled { WHITE } else { GRAY },
    );

    clicked
}

pub fn led_row(x: f32, y: f32, leds: &[bool]) {
    for (i, &on) in leds.iter().enumerate() {
        let cx = x + i as f32 * 20.0;
        let fill = if on {
            Color::new(0.18, 0.63, 0.26, 1.0)
        } else {
            Color::new(0.14, 0.17, 0.14, 1.0)
        };
        draw_circle(cx, y, 6.0, fill);
        draw_circle_lines(cx, y, 6.0, 1.0, DARKGRAY);
    }
}

pub fn mode_badge(rect: Rect, hardware: bool) {
    let (label, bg) = if hardware {
        ("HARDWARE", Color::new(0.55, 0.30, 0.08, 1.0))
    } else {
        ("SIMULATION", Color::new(0.12, 0.33, 0.16, 1.0))
    };
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, bg);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, GRAY);
    draw_text(
        label,
        rect.x + 10.0,
        rect.y + rect.h * 0.72,
        BTN_FONT_SIZE,
        WHITE,
    );
}
