//! Session command handlers: login, logout, status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use nutridash_api::TokenStore;
use nutridash_core::{CoreError, Dashboard};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn login(
    dashboard: &Dashboard,
    email: Option<String>,
    password: Option<String>,
    profile_email: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = match email.or_else(|| profile_email.map(str::to_owned)) {
        Some(email) => email,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = match password {
        Some(password) => SecretString::from(password),
        None => SecretString::from(rpassword::prompt_password("Password: ")?),
    };

    let pair = dashboard.login(&email, &password).await?;
    if !global.quiet {
        match pair.refresh_expires_at {
            Some(expires) => eprintln!("Signed in as {email} (session valid until {expires})"),
            None => eprintln!("Signed in as {email}"),
        }
    }
    Ok(())
}

pub fn logout(store: &Arc<dyn TokenStore>, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    store.clear().map_err(CoreError::from)?;
    if !global.quiet {
        eprintln!("Signed out of profile '{profile}'");
    }
    Ok(())
}

#[derive(Serialize)]
struct SessionStatus {
    profile: String,
    signed_in: bool,
    access_expires_at: Option<DateTime<Utc>>,
    refresh_expires_at: Option<DateTime<Utc>>,
}

pub fn status(store: &Arc<dyn TokenStore>, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let tokens = store.load();
    let status = SessionStatus {
        profile: profile.to_owned(),
        signed_in: tokens.is_some(),
        access_expires_at: tokens.as_ref().and_then(|t| t.access_expires_at),
        refresh_expires_at: tokens.as_ref().and_then(|t| t.refresh_expires_at),
    };

    let out = output::render_single(&global.output, &status, status_detail, |s| {
        s.signed_in.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn status_detail(status: &SessionStatus) -> String {
    if !status.signed_in {
        return format!("Profile '{}': not signed in", status.profile);
    }
    let mut lines = vec![format!("Profile '{}': signed in", status.profile)];
    let now = Utc::now();
    if let Some(expires) = status.access_expires_at {
        lines.push(describe_expiry("Access token", expires, now));
    }
    if let Some(expires) = status.refresh_expires_at {
        lines.push(describe_expiry("Session", expires, now));
    }
    lines.join("\n")
}

fn describe_expiry(label: &str, expires: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if expires <= now {
        format!("{label} expired at {expires}")
    } else {
        format!("{label} valid until {expires}")
    }
}

fn prompt_err(e: dialoguer::Error) -> CliError {
    CliError::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn expiry_wording() {
        let now = Utc::now();
        assert!(describe_expiry("Session", now - TimeDelta::minutes(1), now).contains("expired"));
        assert!(describe_expiry("Session", now + TimeDelta::hours(1), now).contains("valid until"));
    }

    #[test]
    fn signed_out_detail() {
        let status = SessionStatus {
            profile: "default".into(),
            signed_in: false,
            access_expires_at: None,
            refresh_expires_at: None,
        };
        assert_eq!(status_detail(&status), "Profile 'default': not signed in");
    }
}
