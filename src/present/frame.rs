// src/present/frame.rs

//! Frame composition: turning a [`View`] into positioned drawables.
//!
//! Layout is for an 800x450 logical display with 30 px banners at the top
//! and bottom. A backend scales it to the physical screen.

use crate::present::assets::ImageHandle;
use crate::session::{MenuChoice, Phase, View};
use crate::types::InstallState;

pub const DISPLAY_WIDTH: u32 = 800;
pub const DISPLAY_HEIGHT: u32 = 450;
const BANNER_HEIGHT: u32 = 30;
const THUMB_SIZE: u32 = 180;
const SIDE_THUMB_SIZE: u32 = 120;
const WHEEL_SPACING: i32 = 220;
const LOGO_SIZE: u32 = 495;

const BACKGROUND: [u8; 3] = [40, 40, 40];
const BOOT_BACKGROUND: [u8; 3] = [30, 30, 30];
const BANNER: [u8; 3] = [90, 90, 90];
const OVERLAY: [u8; 3] = [20, 20, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// A `w` x `h` rectangle centred on `(cx, cy)`.
    pub fn centered(cx: i32, cy: i32, w: u32, h: u32) -> Self {
        Self::new(cx - (w / 2) as i32, cy - (h / 2) as i32, w, h)
    }
}

/// Images the backend knows how to find on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sprite {
    Logo,
    /// Shared fallback for entries without a usable thumbnail.
    DefaultThumbnail,
    Thumbnail(ImageHandle),
    Connectivity { online: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drawable {
    Fill { rgb: [u8; 3], alpha: u8 },
    Image { sprite: Sprite, alpha: u8 },
    Text { text: String, size: u16 },
}

/// Layers in paint order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub layers: Vec<(Drawable, Rect)>,
}

impl Frame {
    pub fn compose(view: &View) -> Self {
        let mut frame = Frame::default();
        let full = Rect::new(0, 0, DISPLAY_WIDTH, DISPLAY_HEIGHT);
        let (cx, cy) = ((DISPLAY_WIDTH / 2) as i32, (DISPLAY_HEIGHT / 2) as i32);

        if view.phase == Phase::Booting {
            frame.fill(BOOT_BACKGROUND, 255, full);
            frame.image(
                Sprite::Logo,
                view.boot_alpha,
                Rect::centered(cx, cy, LOGO_SIZE, LOGO_SIZE),
            );
            return frame;
        }

        frame.fill(BACKGROUND, 255, full);
        frame.wheel(view, cx, cy);
        frame.banners(view);

        match &view.phase {
            Phase::EntryMenu { choice, notice } => {
                frame.overlay(cx, cy);
                let name = selected_name(view);
                frame.text(name, 28, Rect::centered(cx, cy - 50, 400, 32));
                let (run, back) = match choice {
                    MenuChoice::Run => ("> Run", "  Back"),
                    MenuChoice::Back => ("  Run", "> Back"),
                };
                frame.text(run, 24, Rect::centered(cx - 70, cy + 10, 120, 28));
                frame.text(back, 24, Rect::centered(cx + 70, cy + 10, 120, 28));
                if let Some(notice) = notice {
                    frame.text(notice, 16, Rect::centered(cx, cy + 60, 480, 20));
                }
            }
            Phase::InstallPrompt { installing } => {
                frame.overlay(cx, cy);
                let name = selected_name(view);
                if *installing {
                    frame.text(
                        &format!("Installing {name}... please wait"),
                        24,
                        Rect::centered(cx, cy, 480, 28),
                    );
                } else {
                    frame.text(
                        &format!("{name} needs to install its dependencies."),
                        20,
                        Rect::centered(cx, cy - 20, 480, 24),
                    );
                    frame.text(
                        "Confirm to install, cancel to go back",
                        16,
                        Rect::centered(cx, cy + 20, 480, 20),
                    );
                }
            }
            Phase::Running { entry } => {
                frame.fill(OVERLAY, 200, full);
                let name = view
                    .entries
                    .iter()
                    .find(|e| &e.id == entry)
                    .map_or(entry.as_str(), |e| e.display_name.as_str());
                frame.text(&format!("Running {name}"), 24, Rect::centered(cx, cy, 480, 28));
            }
            Phase::Booting | Phase::Browsing | Phase::Stopped => {}
        }

        frame.notifications(view);
        frame
    }

    /// All text layers, in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().filter_map(|(d, _)| match d {
            Drawable::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn fill(&mut self, rgb: [u8; 3], alpha: u8, rect: Rect) {
        self.layers.push((Drawable::Fill { rgb, alpha }, rect));
    }

    fn image(&mut self, sprite: Sprite, alpha: u8, rect: Rect) {
        self.layers.push((Drawable::Image { sprite, alpha }, rect));
    }

    fn text(&mut self, text: &str, size: u16, rect: Rect) {
        self.layers.push((
            Drawable::Text {
                text: text.to_string(),
                size,
            },
            rect,
        ));
    }

    fn wheel(&mut self, view: &View, cx: i32, cy: i32) {
        let neighbours: &[isize] = if view.entries.len() > 2 { &[-1, 1] } else { &[] };
        for &offset in neighbours {
            if let Some(entry) = view.neighbour(offset) {
                let x = cx + offset as i32 * WHEEL_SPACING;
                self.image(
                    thumbnail_sprite(entry.thumbnail.as_ref()),
                    140,
                    Rect::centered(x, cy - 10, SIDE_THUMB_SIZE, SIDE_THUMB_SIZE),
                );
            }
        }
        if let Some(entry) = view.selected_entry() {
            self.image(
                thumbnail_sprite(entry.thumbnail.as_ref()),
                255,
                Rect::centered(cx, cy - 20, THUMB_SIZE, THUMB_SIZE),
            );
            let label = match entry.install_state {
                InstallState::NotInstalled => format!("{} (not installed)", entry.display_name),
                InstallState::Failed => format!("{} (install failed)", entry.display_name),
                _ => entry.display_name.clone(),
            };
            self.text(&label, 22, Rect::centered(cx, cy + 95, 400, 26));
        }
    }

    fn banners(&mut self, view: &View) {
        let bottom = (DISPLAY_HEIGHT - BANNER_HEIGHT) as i32;
        self.fill(BANNER, 255, Rect::new(0, 0, DISPLAY_WIDTH, BANNER_HEIGHT));
        self.fill(BANNER, 255, Rect::new(0, bottom, DISPLAY_WIDTH, BANNER_HEIGHT));
        self.image(
            Sprite::Connectivity {
                online: view.online,
            },
            255,
            Rect::new(DISPLAY_WIDTH as i32 - 70, 0, 30, 30),
        );
        let position = format!("{}/{}", view.selected + 1, view.entries.len());
        self.text(&position, 16, Rect::new(10, bottom + 6, 100, 20));
    }

    fn overlay(&mut self, cx: i32, cy: i32) {
        self.fill(OVERLAY, 220, Rect::centered(cx, cy, 520, 180));
    }

    fn notifications(&mut self, view: &View) {
        for (i, message) in view.notifications.iter().enumerate() {
            let y = (BANNER_HEIGHT + 8) as i32 + i as i32 * 26;
            self.fill([150, 30, 30], 230, Rect::new(DISPLAY_WIDTH as i32 - 410, y, 400, 24));
            self.text(message, 14, Rect::new(DISPLAY_WIDTH as i32 - 404, y + 4, 392, 18));
        }
    }
}

fn thumbnail_sprite(thumbnail: Option<&ImageHandle>) -> Sprite {
    match thumbnail {
        Some(img) => Sprite::Thumbnail(img.clone()),
        None => Sprite::DefaultThumbnail,
    }
}

fn selected_name(view: &View) -> &str {
    view.selected_entry().map_or("", |e| e.display_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EntryView;
    use crate::types::RunKind;

    fn view(phase: Phase) -> View {
        View {
            phase,
            boot_alpha: 120,
            entries: vec![EntryView {
                id: "demo".to_string(),
                display_name: "Demo".to_string(),
                thumbnail: None,
                run_kind: RunKind::Script,
                install_state: InstallState::NotInstalled,
            }],
            selected: 0,
            online: false,
            notifications: vec!["Pong crashed: boom".to_string()],
        }
    }

    #[test]
    fn boot_frame_is_just_the_logo() {
        let frame = Frame::compose(&view(Phase::Booting));
        assert_eq!(frame.layers.len(), 2);
        assert!(matches!(
            frame.layers[1].0,
            Drawable::Image {
                sprite: Sprite::Logo,
                alpha: 120
            }
        ));
    }

    #[test]
    fn menu_shows_notice_and_notifications() {
        let frame = Frame::compose(&view(Phase::EntryMenu {
            choice: MenuChoice::Back,
            notice: Some("No network connection".to_string()),
        }));
        let texts: Vec<_> = frame.texts().collect();
        assert!(texts.contains(&"Demo (not installed)"));
        assert!(texts.contains(&"> Back"));
        assert!(texts.contains(&"No network connection"));
        assert!(texts.contains(&"Pong crashed: boom"));
        assert!(frame.layers.iter().any(|(d, _)| matches!(
            d,
            Drawable::Image {
                sprite: Sprite::Connectivity { online: false },
                ..
            }
        )));
    }

    #[test]
    fn installing_shows_progress() {
        let frame = Frame::compose(&view(Phase::InstallPrompt { installing: true }));
        assert!(frame.texts().any(|t| t.starts_with("Installing Demo")));
    }
}
