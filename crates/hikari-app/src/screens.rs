//! Screen visibility stack
//!
//! The shell shows one screen at a time: the landing page, the full
//! catalog, a release detail page, or the player overlay. Opening the
//! player remembers which screen it covered so closing restores exactly
//! that one; a resolution failure never reaches `enter_player`, which is
//! how the previous screen stays visible on error.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Catalog,
    Details,
    Player,
}

#[derive(Debug)]
pub struct ScreenStack {
    active: Screen,
    /// Browse screen the next "back" from details returns to
    last_browse: Screen,
    /// Screen the player overlay covered
    before_player: Screen,
}

impl ScreenStack {
    pub fn new() -> Self {
        Self {
            active: Screen::Home,
            last_browse: Screen::Home,
            before_player: Screen::Home,
        }
    }

    pub fn active(&self) -> Screen {
        self.active
    }

    /// Switch between the browse screens (home/catalog)
    pub fn show_browse(&mut self, screen: Screen) {
        debug_assert!(matches!(screen, Screen::Home | Screen::Catalog));
        self.active = screen;
        self.last_browse = screen;
    }

    pub fn show_details(&mut self) {
        self.active = Screen::Details;
    }

    /// Back from a detail page returns to the last browse screen
    pub fn back_from_details(&mut self) {
        self.active = self.last_browse;
    }

    pub fn enter_player(&mut self) {
        if self.active != Screen::Player {
            self.before_player = self.active;
        }
        self.active = Screen::Player;
    }

    /// Restore the screen the player covered
    pub fn close_player(&mut self) {
        self.active = self.before_player;
    }
}

impl Default for ScreenStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_restores_covered_screen() {
        let mut screens = ScreenStack::new();
        screens.show_browse(Screen::Catalog);
        screens.show_details();

        screens.enter_player();
        assert_eq!(screens.active(), Screen::Player);

        screens.close_player();
        assert_eq!(screens.active(), Screen::Details);
    }

    #[test]
    fn back_from_details_returns_to_last_browse() {
        let mut screens = ScreenStack::new();
        screens.show_browse(Screen::Catalog);
        screens.show_details();
        screens.back_from_details();
        assert_eq!(screens.active(), Screen::Catalog);

        screens.show_browse(Screen::Home);
        screens.show_details();
        screens.back_from_details();
        assert_eq!(screens.active(), Screen::Home);
    }

    #[test]
    fn reentering_player_keeps_original_restore_target() {
        let mut screens = ScreenStack::new();
        screens.show_details();
        screens.enter_player();
        // Episode switch while the player is already up
        screens.enter_player();
        screens.close_player();
        assert_eq!(screens.active(), Screen::Details);
    }
}
