// Copyright 2025 The Manet Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Driver glue (spec §4.10): a tick source and a packet source wired to `manet_core::RoutingNode`.
//!
//! The transport here is a two-node in-process `tokio::sync::mpsc` loopback, not a network
//! implementation — it exists purely to exercise the tick/packet entry points end to end. A real
//! deployment swaps this module for whatever link (ESP-NOW, a raw socket, ...) it actually has.

use std::process::exit;
use std::time::Duration;

use colorful::{
    Color,
    Colorful,
};
use log::{
    error,
    info,
    warn,
    LevelFilter,
};
use manet_common::LinkAddr;
use manet_core::{
    NodeConfig,
    RoutingNode,
};
use simple_logger::SimpleLogger;
use tokio::sync::mpsc;
use tokio::time;

const BANNER: &str = r#"
 __  __    _    _   _ _____ _____
|  \/  |  / \  | \ | | ____|_   _|
| |\/| | / _ \ |  \| |  _|   | |
| |  | |/ ___ \| |\  | |___  | |
|_|  |_/_/   \_\_| \_|_____| |_|
   Link-State Routing Node"#;

/// Builds the two demonstration nodes and drives the tick/loopback event loop. Split out of
/// `main` so its fallible setup (`RoutingNode::new`) can use `?` against `anyhow::Result`, the
/// way the teacher's `connect_database` does for its own fallible startup step.
async fn run() -> anyhow::Result<()> {
    let node_a_addr = LinkAddr::from_mac([0x02, 0, 0, 0, 0, 0x0a]);
    let node_b_addr = LinkAddr::from_mac([0x02, 0, 0, 0, 0, 0x0b]);

    let mut node_a = RoutingNode::new(node_a_addr, NodeConfig::default(), vec![0])?;
    let mut node_b = RoutingNode::new(node_b_addr, NodeConfig::default(), vec![0])?;

    info!("starting two-node loopback demonstration over an in-process channel");

    // A's outbox, read as B's inbox, and vice versa.
    let (tx_a, mut rx_a_outbox) = mpsc::channel::<Vec<u8>>(64);
    let (tx_b, mut rx_b_outbox) = mpsc::channel::<Vec<u8>>(64);

    let mut ticker = time::interval(Duration::from_secs(1));
    let mut now: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                now += 1;
                match node_a.on_tick(now) {
                    Ok(frames) => {
                        for frame in frames {
                            let _ = tx_a.send(frame).await;
                        }
                    }
                    Err(error) => warn!("node A tick failed => {error}"),
                }
                match node_b.on_tick(now) {
                    Ok(frames) => {
                        for frame in frames {
                            let _ = tx_b.send(frame).await;
                        }
                    }
                    Err(error) => warn!("node B tick failed => {error}"),
                }
            }
            Some(frame) = rx_b_outbox.recv() => {
                match node_a.on_packet(node_b_addr, &frame, now) {
                    Ok(forwarded) => {
                        for out in forwarded {
                            let _ = tx_a.send(out).await;
                        }
                    }
                    Err(error) => warn!("node A failed to process a frame from B => {error}"),
                }
            }
            Some(frame) = rx_a_outbox.recv() => {
                match node_b.on_packet(node_a_addr, &frame, now) {
                    Ok(forwarded) => {
                        for out in forwarded {
                            let _ = tx_b.send(out).await;
                        }
                    }
                    Err(error) => warn!("node B failed to process a frame from A => {error}"),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = SimpleLogger::new().with_level(LevelFilter::Info).init() {
        println!("Unable to initialize logging => {error}");
        exit(1);
    }
    println!("{}\n", BANNER.gradient(Color::Green).bold());

    if let Err(error) = run().await {
        error!("Unable to start the routing demonstration => {error}");
        exit(1);
    }
}
