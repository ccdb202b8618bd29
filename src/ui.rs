use imgui::{Condition, StyleColor, StyleVar, TreeNodeFlags, WindowFlags};

use crate::{assets::LoadStatus, host::Host, view::ViewState};

const ERROR_COLOR: [f32; 4] = [1.0, 0.35, 0.35, 1.0];
const FALLBACK_FONT_SCALE: f32 = 2.0;

pub fn draw(ui: &imgui::Ui, host: &mut Host) {
    match host.view_state() {
        ViewState::ShowingFallback => draw_fallback(ui, host),
        ViewState::Showing3D | ViewState::FadingOut => {
            draw_controls(ui, host);
            draw_debug_panel(ui, host);
        }
    }
}

fn overlay_flags() -> WindowFlags {
    WindowFlags::NO_DECORATION
        | WindowFlags::NO_MOVE
        | WindowFlags::NO_SAVED_SETTINGS
        | WindowFlags::ALWAYS_AUTO_RESIZE
        | WindowFlags::NO_BACKGROUND
}

/// Start button in the top-left corner, plus load status when something went wrong.
fn draw_controls(ui: &imgui::Ui, host: &mut Host) {
    let label = host.config().view.start_label;
    let can_start = host.can_start();

    let mut start_clicked = false;
    let mut retry_clicked = false;

    ui.window("##controls")
        .position([10.0, 10.0], Condition::Always)
        .flags(overlay_flags())
        .build(|| {
            {
                let _disabled = ui.begin_disabled(!can_start);
                start_clicked = ui.button(label);
            }

            match host.load_status() {
                Some(LoadStatus::Loading(kind)) => {
                    ui.text_disabled(format!("Loading {:?}...", kind));
                }
                Some(LoadStatus::Failed { kind, error }) => {
                    ui.text_colored(ERROR_COLOR, format!("Failed to load {:?}: {}", kind, error));
                    retry_clicked = ui.button("Retry");
                }
                Some(LoadStatus::Ready) | None => {}
            }
        });

    if start_clicked {
        host.start_animation();
    }

    if retry_clicked {
        host.retry_loads();
    }
}

fn draw_debug_panel(ui: &imgui::Ui, host: &mut Host) {
    let Some(session) = host.session_mut() else {
        return;
    };

    if session.panel.is_disposed() {
        return;
    }

    let display_size = ui.io().display_size;
    let panel = &mut session.panel;
    let light = &mut session.lights.projector;

    let mut open = panel.open;
    ui.window("Debug")
        .position([display_size[0] - 10.0, 10.0], Condition::FirstUseEver)
        .position_pivot([1.0, 0.0])
        .size([280.0, 0.0], Condition::FirstUseEver)
        .opened(&mut open)
        .build(|| {
            if !ui.collapsing_header(panel.title, TreeNodeFlags::DEFAULT_OPEN) {
                return;
            }

            for (index, control) in panel.controls().iter().enumerate() {
                let mut value = control.property.get(light);
                let changed = ui
                    .slider_config(control.label, control.range.min, control.range.max)
                    .build(&mut value);

                if changed {
                    panel.apply(index, value, light);
                }
            }
        });
    panel.open = open;
}

/// Full-window white surface with the centered placeholder text.
fn draw_fallback(ui: &imgui::Ui, host: &Host) {
    let text = host.config().view.fallback_text;
    let display_size = ui.io().display_size;

    let _background = ui.push_style_color(StyleColor::WindowBg, [1.0, 1.0, 1.0, 1.0]);
    let _text_color = ui.push_style_color(StyleColor::Text, [0.0, 0.0, 0.0, 1.0]);
    let _padding = ui.push_style_var(StyleVar::WindowPadding([0.0, 0.0]));
    let _border = ui.push_style_var(StyleVar::WindowBorderSize(0.0));

    ui.window("##fallback")
        .position([0.0, 0.0], Condition::Always)
        .size(display_size, Condition::Always)
        .flags(
            WindowFlags::NO_DECORATION
                | WindowFlags::NO_MOVE
                | WindowFlags::NO_SAVED_SETTINGS
                | WindowFlags::NO_BRING_TO_FRONT_ON_FOCUS,
        )
        .build(|| {
            ui.set_window_font_scale(FALLBACK_FONT_SCALE);

            let [text_width, text_height] = ui.calc_text_size(text);
            ui.set_cursor_pos([
                ((display_size[0] - text_width) * 0.5).max(0.0),
                ((display_size[1] - text_height) * 0.5).max(0.0),
            ]);
            ui.text(text);
        });
}
