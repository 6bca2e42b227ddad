// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Calls one user command and prints the response.
//!
//! Reads `MAGE_APPLICATION`, `MAGE_DOMAIN` and `MAGE_PROTOCOL`; defaults
//! to the `game` application on `localhost:8080`.

use mage_core::{ClientConfig, MageError, RpcClient};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mage_core=info".parse()?),
        )
        .init();

    let mut config = ClientConfig::from_env();
    if config.application.is_empty() {
        config = config.with_application("game");
    }
    let client = RpcClient::new(config)?;

    let params = json!({
        "somethings": "test",
        "one": { "two": { "three": 4 } }
    });

    match client.call("mymodule.mycommand", &params) {
        Ok(response) => println!("mymodule.mycommand: {}", response),
        Err(MageError::Application { code }) => {
            eprintln!("mymodule.mycommand responded with an error: {}", code)
        }
        Err(e) => eprintln!("{} (code {})", e, e.code()),
    }

    Ok(())
}
