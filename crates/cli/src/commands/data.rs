//! Stored data maintenance.

use clap::Subcommand;

use torodo_storefront::state::AppState;

use super::CliError;

#[derive(Subcommand)]
pub enum DataAction {
    /// Delete every stored value (cart, stock, customers, subscriptions, sales, theme)
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[allow(clippy::print_stdout)]
pub async fn run(state: &mut AppState, action: DataAction) -> Result<(), CliError> {
    match action {
        DataAction::Clear { yes: false } => {
            return Err(CliError::InvalidArgument(
                "refusing to delete all data without --yes".to_string(),
            ));
        }
        DataAction::Clear { yes: true } => {
            state.clear_all().await?;
            println!("All data cleared");
        }
    }
    Ok(())
}
