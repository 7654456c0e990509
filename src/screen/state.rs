use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Intro,
    Consent1,
    Consent2,
    Permission,
    PermissionGranted,
    AskNotify,
    Monitor,
    Stats,
    Chat,
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Intro
    }
}

impl Screen {
    pub const ALL: [Screen; 9] = [
        Screen::Intro,
        Screen::Consent1,
        Screen::Consent2,
        Screen::Permission,
        Screen::PermissionGranted,
        Screen::AskNotify,
        Screen::Monitor,
        Screen::Stats,
        Screen::Chat,
    ];

    /// Where a returning user lands once onboarding has been completed:
    /// the screen the monitor falls back to when a session stops.
    pub const RESUME: Screen = Screen::AskNotify;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ScreenEvent {
    Advance,
    Accept,
    Decline,
    Start,
    Stop,
    OpenStats,
    OpenChat,
    Back,
}

impl ScreenEvent {
    pub const ALL: [ScreenEvent; 8] = [
        ScreenEvent::Advance,
        ScreenEvent::Accept,
        ScreenEvent::Decline,
        ScreenEvent::Start,
        ScreenEvent::Stop,
        ScreenEvent::OpenStats,
        ScreenEvent::OpenChat,
        ScreenEvent::Back,
    ];
}

/// Work the coordinator performs after a transition has been committed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SideEffect {
    RequestCamera,
    PersistOnboarding,
    RequestNotifications,
    StartConnection,
    StopConnection,
    PublishCharts,
    TearDownCharts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Screen,
    pub to: Screen,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    /// True when the event is not handled on the current screen.
    pub fn is_ignored(&self) -> bool {
        self.from == self.to && self.effects.is_empty()
    }
}

/// The screen flow. Total over every (screen, event) pair: anything not
/// listed keeps the current screen and triggers nothing.
pub fn transition(screen: Screen, event: ScreenEvent) -> Transition {
    let (to, effects): (Screen, Vec<SideEffect>) = match (screen, event) {
        (Screen::Intro, ScreenEvent::Advance) => (Screen::Consent1, vec![]),
        (Screen::Consent1, ScreenEvent::Advance) => (Screen::Consent2, vec![]),
        (Screen::Consent2, ScreenEvent::Advance) => {
            (Screen::Permission, vec![SideEffect::RequestCamera])
        }
        (Screen::Permission, ScreenEvent::Advance) => (Screen::PermissionGranted, vec![]),
        (Screen::PermissionGranted, ScreenEvent::Accept | ScreenEvent::Decline) => {
            (Screen::AskNotify, vec![SideEffect::PersistOnboarding])
        }
        (Screen::AskNotify, ScreenEvent::Advance) => {
            (Screen::Monitor, vec![SideEffect::RequestNotifications])
        }
        (Screen::Monitor, ScreenEvent::Start) => (Screen::Monitor, vec![SideEffect::StartConnection]),
        (Screen::Monitor, ScreenEvent::Stop) => {
            (Screen::AskNotify, vec![SideEffect::StopConnection])
        }
        (Screen::Monitor, ScreenEvent::OpenStats) => (Screen::Stats, vec![SideEffect::PublishCharts]),
        (Screen::Stats, ScreenEvent::Back) => (Screen::Monitor, vec![SideEffect::TearDownCharts]),
        (Screen::Monitor, ScreenEvent::OpenChat) => (Screen::Chat, vec![]),
        (Screen::Chat, ScreenEvent::Back) => (Screen::Monitor, vec![]),
        (current, _) => (current, vec![]),
    };

    Transition {
        from: screen,
        to,
        effects,
    }
}
