use anyhow::Result;
use console::Term;
use dialoguer::Confirm;

/// Ask before a destructive step
///
/// `--yes` answers for the user. Without a terminal to ask on, the answer
/// is no.
pub fn confirm(prompt: &str, assume_yes: bool, json: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if json || !Term::stderr().is_term() {
        tracing::info!("Not confirmed (no terminal): {}", prompt);
        return Ok(false);
    }

    let confirmed = Confirm::new().with_prompt(prompt).default(false).interact()?;
    Ok(confirmed)
}
