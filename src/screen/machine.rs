use super::state::{transition, Screen, ScreenEvent, Transition};

/// Holds the one active screen. Only [`ScreenMachine::apply`] moves it.
#[derive(Debug, Clone, Default)]
pub struct ScreenMachine {
    current: Screen,
}

impl ScreenMachine {
    /// A returning user skips onboarding and starts on [`Screen::RESUME`].
    pub fn new(onboarding_complete: bool) -> Self {
        let current = if onboarding_complete {
            Screen::RESUME
        } else {
            Screen::Intro
        };
        Self { current }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Commits the next screen, then hands back the effects to run.
    pub fn apply(&mut self, event: ScreenEvent) -> Transition {
        let next = transition(self.current, event);
        self.current = next.to;
        next
    }
}
