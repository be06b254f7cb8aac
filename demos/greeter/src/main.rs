//! A bot that walks into a region and greets every avatar that arrives.
//!
//! Settings come from the environment:
//!
//! ```text
//! HABITAT_HOST     server host             (default 127.0.0.1)
//! HABITAT_PORT     server port             (default 1337)
//! HABITAT_USER     account name            (default greeter)
//! HABITAT_CONTEXT  region to enter         (default context-Downtown_5f)
//! ```

use std::time::Duration;

use neohab::prelude::*;
use neohab::{MessageKind, Pending};

struct Settings {
    host: String,
    port: u16,
    user: String,
    context: String,
}

impl Settings {
    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        Ok(Self {
            host: var("HABITAT_HOST", "127.0.0.1"),
            port: var("HABITAT_PORT", "1337").parse()?,
            user: var("HABITAT_USER", "greeter"),
            context: var("HABITAT_CONTEXT", "context-Downtown_5f"),
        })
    }
}

/// Logs a queued command's failure instead of dropping it silently.
fn report(what: &'static str, pending: Pending<ClientError>) {
    tokio::spawn(async move {
        if let Err(e) = pending.await {
            tracing::warn!(what, error = %e, "command failed");
        }
    });
}

fn greet(client: &HabitatClient, avatar: &ObjectRecord) {
    if client.get_avatar().is_some_and(|me| me.reference == avatar.reference) {
        return;
    }
    tracing::info!(name = %avatar.name, "greeting");
    if let Some(direction) = client.get_direction(avatar) {
        report("face", client.face_direction(direction));
    }
    report("wave", client.do_posture(Posture::Wave));
    report("say", client.say(format!("Hello, {}!", avatar.name)));
    report("pause", client.wait(Duration::from_secs(2)));
    report("stand", client.do_posture(Posture::StandUp));
}

fn on_arrival(client: &HabitatClient, msg: Option<&Message>) {
    let Some(msg) = msg else { return };
    match msg.classify() {
        Ok(MessageKind::Make(record) | MessageKind::HereIs(record)) if record.is_avatar() => {
            greet(client, &record);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "ignoring arrival"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let client = HabitatClient::builder(&settings.host, settings.port)
        .username(&settings.user)
        .build();

    let context = settings.context.clone();
    client.on("connected", move |client, _| {
        tracing::info!(%context, "entering context");
        report("entercontext", client.goto_context(context.clone()));
    });

    client.on("enteredRegion", |client, _| {
        let client = client.clone();
        tokio::spawn(async move {
            match client.ensure_corporated().await {
                Ok(()) => report("say", client.say("Hi everyone!")),
                Err(e) => tracing::error!(error = %e, "could not corporate"),
            }
        });
    });

    client.on("make", on_arrival);
    client.on("HEREIS_$", on_arrival);

    client.on("disconnected", |_, _| {
        tracing::warn!("lost connection to server");
    });

    client.connect().await?;
    tracing::info!(host = %settings.host, port = settings.port, user = %settings.user, "greeter running");

    tokio::signal::ctrl_c().await?;
    Ok(())
}
