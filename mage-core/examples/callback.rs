// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Background calls: callback futures and fire-and-forget tasks.

use std::thread;
use std::time::Duration;

use mage_core::{ClientConfig, MageResult, RpcClient};
use serde_json::{json, Value};

fn report(label: &str, result: MageResult<Value>) {
    match result {
        Ok(response) => println!("{}: {}", label, response),
        Err(e) => eprintln!("{} failed: {} (code {})", label, e, e.code()),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mage_core=info".parse()?),
        )
        .init();

    let client = RpcClient::new(ClientConfig::new("game"))?;
    let params = json!({ "password": "test" });

    // Runs now on its own thread; `wait` returns once the callback did.
    let registered = client.call_with_callback(
        "user.register",
        params.clone(),
        |result| report("user.register", result),
        true,
    )?;
    registered.wait();

    let first = client.spawn_call("user.register", params.clone(), |result| {
        thread::sleep(Duration::from_secs(1));
        report("1:user.register", result);
    })?;
    let second = client.spawn_call("user.register", params, |result| {
        thread::sleep(Duration::from_secs(1));
        report("2:user.register", result);
    })?;

    println!("Spawned {} and {}", first, second);
    client.cancel(second);
    client.join(first);

    Ok(())
}
