// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Logs in with the `ident` module and installs the returned session.

use anyhow::{bail, Context};
use mage_core::{ClientConfig, ErrorKind, RpcClient};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mage_core=info".parse()?),
        )
        .init();

    let client = RpcClient::new(ClientConfig::new("game"))?;

    let auth = json!({
        "engineName": "cms",
        "credentials": { "username": "username", "password": "password" }
    });

    let user = match client.call("ident.login", &auth) {
        Ok(user) => user,
        Err(e) if e.kind() == ErrorKind::Application => bail!("Login failed: {}", e.code()),
        Err(e) => return Err(e).context("Could not login"),
    };

    println!(
        "Login succeeded, you are: {} (id: {})",
        user["user"]["displayName"], user["user"]["userId"]
    );

    let session_key = user["session"]["key"]
        .as_str()
        .context("login response carries no session key")?;
    client.set_session(session_key);

    let profile = client.call("user.getProfile", &json!({}))?;
    println!("user.getProfile: {}", profile);

    client.clear_session();
    Ok(())
}
