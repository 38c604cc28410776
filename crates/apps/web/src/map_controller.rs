//! Pointer interaction on the map: info popup, context menu, long press.
//!
//! Pure state machine. The wasm layer feeds it DOM events and carries out the
//! returned effects; nothing here touches the DOM.

use foundation::coords::LatLng;
use foundation::screen::ScreenPoint;
use foundation::time::Millis;
use scene::actions::Action;
use scene::state::Tab;

/// A touch must last longer than this to count as a long press.
pub const LONG_PRESS_MS: f64 = 100.0;
/// ...and move less than this many pixels.
pub const LONG_PRESS_MAX_MOVE_PX: f64 = 20.0;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    InfoPopupOpen {
        position: LatLng,
    },
    ContextMenuOpen {
        position: LatLng,
        screen: ScreenPoint,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    LeftClick {
        screen: ScreenPoint,
        position: LatLng,
    },
    RightClick {
        screen: ScreenPoint,
        position: LatLng,
    },
    TouchStart {
        screen: ScreenPoint,
        position: LatLng,
        at: Millis,
    },
    TouchEnd {
        screen: ScreenPoint,
        at: Millis,
    },
    /// Explicit close button of either popup.
    Close,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControllerEffect {
    /// Also triggers the elevation and locate lookups for `position`.
    OpenInfoPopup { position: LatLng },
    CloseInfoPopup,
    OpenContextMenu { position: LatLng, screen: ScreenPoint },
    CloseContextMenu,
}

/// Entries of the context menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    DirectionsFrom,
    AddVia,
    DirectionsTo,
    SetCenter,
}

impl MenuChoice {
    pub fn for_tab(tab: Tab) -> &'static [MenuChoice] {
        match tab {
            Tab::Directions => &[
                MenuChoice::DirectionsFrom,
                MenuChoice::AddVia,
                MenuChoice::DirectionsTo,
            ],
            Tab::Isochrones => &[MenuChoice::SetCenter],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::DirectionsFrom => "Directions from here",
            MenuChoice::AddVia => "Add as via point",
            MenuChoice::DirectionsTo => "Directions to here",
            MenuChoice::SetCenter => "Set center here",
        }
    }

    pub fn action(self, position: LatLng) -> Action {
        match self {
            MenuChoice::DirectionsFrom => Action::DirectionsFrom(position),
            MenuChoice::AddVia => Action::AddVia(position),
            MenuChoice::DirectionsTo => Action::DirectionsTo(position),
            MenuChoice::SetCenter => Action::SetIsoCenter(position),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct TouchStart {
    screen: ScreenPoint,
    position: LatLng,
    at: Millis,
}

#[derive(Debug, Clone, Default)]
pub struct MapController {
    state: InteractionState,
    draw_mode: bool,
    touch: Option<TouchStart>,
    /// Set by a long press; swallows the synthetic click that follows it.
    long_press_handled: bool,
}

impl MapController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn draw_mode(&self) -> bool {
        self.draw_mode
    }

    /// Entering draw mode closes whatever is open; clicks then belong to the
    /// drawing tool.
    pub fn set_draw_mode(&mut self, active: bool) -> Vec<ControllerEffect> {
        self.draw_mode = active;
        self.touch = None;
        if active {
            self.close()
        } else {
            Vec::new()
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<ControllerEffect> {
        if self.draw_mode {
            return Vec::new();
        }
        match event {
            PointerEvent::LeftClick { position, .. } => self.left_click(position),
            PointerEvent::RightClick { screen, position } => self.open_menu(position, screen),
            PointerEvent::TouchStart {
                screen,
                position,
                at,
            } => {
                // A click owed to the previous long press never came.
                self.long_press_handled = false;
                self.touch = Some(TouchStart {
                    screen,
                    position,
                    at,
                });
                Vec::new()
            }
            PointerEvent::TouchEnd { screen, at } => {
                let Some(start) = self.touch.take() else {
                    return Vec::new();
                };
                let held = at.elapsed_since(start.at);
                let moved = screen.distance(start.screen);
                if held > LONG_PRESS_MS && moved < LONG_PRESS_MAX_MOVE_PX {
                    self.long_press_handled = true;
                    self.open_menu(start.position, start.screen)
                } else {
                    Vec::new()
                }
            }
            PointerEvent::Close => {
                self.long_press_handled = false;
                self.close()
            }
        }
    }

    /// Carries out a context-menu entry. `None` if no menu is open.
    pub fn choose(&mut self, choice: MenuChoice) -> Option<(Action, Vec<ControllerEffect>)> {
        let InteractionState::ContextMenuOpen { position, .. } = self.state else {
            return None;
        };
        self.state = InteractionState::Idle;
        self.long_press_handled = false;
        Some((choice.action(position), vec![ControllerEffect::CloseContextMenu]))
    }

    fn left_click(&mut self, position: LatLng) -> Vec<ControllerEffect> {
        if std::mem::take(&mut self.long_press_handled) {
            return Vec::new();
        }
        match self.state {
            InteractionState::Idle => {
                self.state = InteractionState::InfoPopupOpen { position };
                vec![ControllerEffect::OpenInfoPopup { position }]
            }
            InteractionState::InfoPopupOpen { .. } | InteractionState::ContextMenuOpen { .. } => {
                self.close()
            }
        }
    }

    fn open_menu(&mut self, position: LatLng, screen: ScreenPoint) -> Vec<ControllerEffect> {
        let mut out = Vec::new();
        if let InteractionState::InfoPopupOpen { .. } = self.state {
            out.push(ControllerEffect::CloseInfoPopup);
        }
        self.state = InteractionState::ContextMenuOpen { position, screen };
        out.push(ControllerEffect::OpenContextMenu { position, screen });
        out
    }

    fn close(&mut self) -> Vec<ControllerEffect> {
        let effect = match self.state {
            InteractionState::Idle => return Vec::new(),
            InteractionState::InfoPopupOpen { .. } => ControllerEffect::CloseInfoPopup,
            InteractionState::ContextMenuOpen { .. } => ControllerEffect::CloseContextMenu,
        };
        self.state = InteractionState::Idle;
        vec![effect]
    }
}
