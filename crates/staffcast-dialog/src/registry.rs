//! The state table: which states exist and how each routes events.

use std::collections::HashMap;

use crate::handlers::{callbacks, menu, misc, wizard};
use crate::model::MailingKind;
use crate::state::{Handler, StateDef, StateId, text_routes};

/// Immutable lookup table of state definitions, supplied once at startup.
pub struct StateRegistry {
    states: HashMap<StateId, StateDef>,
}

impl StateRegistry {
    pub fn new(states: HashMap<StateId, StateDef>) -> Self {
        Self { states }
    }

    pub fn get(&self, id: StateId) -> Option<&StateDef> {
        self.states.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateId, &StateDef)> {
        self.states.iter()
    }
}

/// The production state table.
pub fn default_registry() -> StateRegistry {
    let mut states = HashMap::new();

    // System-wide commands; checked for every event whatever the actor's
    // local state is.
    let mut global = StateDef::empty();
    global.global = true;
    global.no_context = true;
    global.skip_entrance = true;
    global.catch_all = true;
    global.catch_all_callback = true;
    global.catch_all_text = Handler::new("", misc::global_text_fallthrough);
    global.catch_all_callback_handler = Handler::new("", callbacks::global_callback);
    global.text_routes = text_routes(vec![
        (
            "/start",
            Handler::new(
                "Sends the greeting and pins the instruction message.",
                misc::start,
            ),
        ),
        (
            "/menu",
            Handler::new("Opens the admin menu.", menu::open),
        ),
        ("menu", Handler::new("Opens the admin menu.", menu::open)),
        (
            "close",
            Handler::new("Closes the menu and clears the dialog state.", misc::close),
        ),
        (
            "/help",
            Handler::new("Lists every command.", misc::help),
        ),
        (
            "/mailings",
            Handler::new("Lists the active mailings.", menu::active_mailings),
        ),
    ]);
    states.insert(StateId::Global, global);

    // The admin menu.
    let mut menu_state = StateDef::empty();
    menu_state.skip_entrance = true;
    menu_state.text_routes = text_routes(vec![
        (
            "new mailing",
            Handler::new("Starts the mailing creation wizard.", wizard::new_mailing),
        ),
        (
            "active mailings",
            Handler::new("Lists the active mailings.", menu::active_mailings),
        ),
        (
            "refresh data",
            Handler::new(
                "Offers the datasets that can be refreshed.",
                menu::refresh_prompt,
            ),
        ),
        (
            "restart bot",
            Handler::new("Restarts the bot process.", menu::restart),
        ),
    ]);
    states.insert(StateId::Menu, menu_state);

    // Wizard step 1: what kind of mailing.
    let mut kind_state = StateDef::empty();
    kind_state.skip_entrance = true;
    kind_state.text_routes = text_routes(vec![
        ("direct messages", wizard::choose_kind(MailingKind::DirectMessage)),
        ("manager chat", wizard::choose_kind(MailingKind::ManagerChat)),
        ("team chat", wizard::choose_kind(MailingKind::TeamChat)),
        ("back", Handler::new("Returns to the admin menu.", menu::open)),
    ]);
    states.insert(StateId::ChoosingMailingKind, kind_state);

    // Wizard step 2: which cohort. Free text is the cohort name.
    let mut cohort_state = StateDef::empty();
    cohort_state.skip_entrance = true;
    cohort_state.catch_all = true;
    cohort_state.catch_all_text =
        Handler::new("Selects the cohort for the mailing.", wizard::cohort_catch_all);
    cohort_state.text_routes = text_routes(vec![(
        "back",
        Handler::new("Returns to the mailing-kind step.", wizard::back_to_kind),
    )]);
    states.insert(StateId::ChoosingCohort, cohort_state);

    // Wizard step 3: the mailing text. Free text is the draft.
    let mut text_state = StateDef::empty();
    text_state.skip_entrance = true;
    text_state.catch_all = true;
    text_state.catch_all_text =
        Handler::new("Captures the mailing text.", wizard::draft_catch_all);
    text_state.text_routes = text_routes(vec![
        (
            "send",
            Handler::new("Sends the prepared mailing.", wizard::send_mailing),
        ),
        (
            "back",
            Handler::new("Returns to the previous step.", wizard::back_from_text),
        ),
    ]);
    states.insert(StateId::EnterMailingText, text_state);

    StateRegistry::new(states)
}
