// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Anonymous login, then prints every event pushed by the server.
//!
//! The server sends `session.set` during login; the observer installs the
//! session, which the poller needs.

use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use mage_core::{ClientConfig, EventObserver, HttpTransport, PollingMode, RpcClient};
use serde_json::{json, Value};

struct PrintingObserver {
    client: Weak<RpcClient<HttpTransport>>,
}

impl EventObserver for PrintingObserver {
    fn receive_event(&self, name: &str, data: Option<&Value>) {
        println!("Receive event: {}", name);
        if let Some(data) = data {
            println!("data: {}", data);
        }

        if name == "session.set" {
            let key = data.and_then(|d| d["key"].as_str());
            if let (Some(client), Some(key)) = (self.client.upgrade(), key) {
                client.set_session(key);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mage_core=info".parse()?),
        )
        .init();

    let client = Arc::new(RpcClient::new(ClientConfig::new("game"))?);
    let observer = Arc::new(PrintingObserver {
        client: Arc::downgrade(&client),
    });
    client.add_observer(&observer);

    let auth = json!({
        "engineName": "anonymous",
        "credentials": null,
        "options": { "access": "user" }
    });
    client.call_future("ident.login", auth, true)?.wait()?;

    client.start_polling(PollingMode::LongPolling)?;
    thread::sleep(Duration::from_secs(60));
    client.stop_polling();

    Ok(())
}
