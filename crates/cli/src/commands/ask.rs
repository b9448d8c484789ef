//! `chatmate ask` — answer one question and exit.

use std::path::Path;
use tokio_util::sync::CancellationToken;

pub async fn run(
    config_path: Option<&Path>,
    message: &str,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let mut session = super::new_session(&config)?;

    let display = stream.then(|| super::live::spawn(session.events()));
    let cancel = cancel_on_ctrl_c();

    let result = session.ask_with_cancel(message, &cancel).await;
    cancel.cancel();
    if let Some(display) = display {
        let _ = display.await;
    }

    let outcome = result?;
    println!("{}", super::format_answer(&outcome));
    Ok(())
}

/// A token that fires on Ctrl+C. Cancelling it also stops the watcher.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = trigger.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    trigger.cancel();
                }
            }
        }
    });
    cancel
}
