use anyhow::Result;
use serde::Serialize;

use weighlog_core::auth::{AuthGate, Credentials};
use weighlog_core::error::LogError;
use weighlog_core::models::User;

use crate::backend::identity_provider;
use crate::config::Config;
use crate::session::{self, Backend, StoredSession};

use super::helpers::{json_error, prompt_line};

#[derive(Serialize)]
struct WhoAmI<'a> {
    backend: Backend,
    #[serde(flatten)]
    user: &'a User,
}

pub(crate) async fn cmd_login(
    config: &Config,
    backend: Backend,
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt_line("Email: ")?,
    };
    let password = match (backend, password) {
        (Backend::Firebase, None) => Some(prompt_line("Password: ")?),
        (_, p) => p,
    };
    let credentials = Credentials {
        email,
        password,
        display_name: name,
    };

    let provider = identity_provider(config, backend)?;
    let gate = AuthGate::new();
    gate.on_auth_change(|user| {
        if let Some(u) = user {
            tracing::info!(uid = %u.uid, "signed in");
        }
    });
    let session = gate
        .sign_in(provider.as_ref(), &credentials)
        .await
        .map_err(LogError::from)?;

    let stored = StoredSession { backend, session };
    session::save(&config.session_path, &stored)?;

    if json {
        let out = WhoAmI {
            backend,
            user: &stored.session.user,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Signed in as {}", stored.session.user.label());
    }
    Ok(())
}

pub(crate) async fn cmd_logout(config: &Config, json: bool) -> Result<()> {
    let Some(stored) = session::load(&config.session_path)? else {
        if json {
            println!("{}", json_error("Not signed in"));
        } else {
            println!("Not signed in.");
        }
        return Ok(());
    };

    let provider = identity_provider(config, stored.backend)?;
    let gate = AuthGate::restored(Some(stored.session.user.clone()));
    gate.sign_out(provider.as_ref(), &stored.session)
        .await
        .map_err(LogError::from)?;
    session::clear(&config.session_path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "signed_out": stored.session.user.uid })
        );
    } else {
        println!("Signed out {}", stored.session.user.label());
    }
    Ok(())
}

pub(crate) fn cmd_whoami(config: &Config, json: bool) -> Result<()> {
    match session::load(&config.session_path)? {
        Some(stored) => {
            if json {
                let out = WhoAmI {
                    backend: stored.backend,
                    user: &stored.session.user,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let user = &stored.session.user;
                println!("{} ({:?} backend)", user.label(), stored.backend);
                if let Some(ref email) = user.email {
                    println!("  Email: {email}");
                }
                println!("  UID:   {}", user.uid);
            }
        }
        None => {
            if json {
                println!("{}", json_error("Not signed in"));
            } else {
                println!("Not signed in. Run `weighlog login` first.");
            }
        }
    }
    Ok(())
}
