//! Theme preference commands.

use clap::Subcommand;

use torodo_core::ThemePreference;
use torodo_storefront::state::AppState;

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Show the preference and whether dark colors apply
    Show {
        /// Assume the system uses a dark color scheme
        #[arg(long)]
        system_dark: bool,
    },
    /// Set the preference
    Set {
        /// light, dark or system
        preference: ThemePreference,
    },
}

#[allow(clippy::print_stdout)]
pub fn run(state: &mut AppState, action: ThemeAction) {
    match action {
        ThemeAction::Show { system_dark } => {
            let preference = state.theme.preference();
            let mode = if state.theme.is_dark(system_dark) { "dark" } else { "light" };
            println!("{preference} ({mode})");
        }
        ThemeAction::Set { preference } => {
            state.theme.set(preference);
            println!("Theme set to {preference}");
        }
    }
}
