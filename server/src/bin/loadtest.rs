//! Load test for the driving server.
//!
//! Spawns multiple fake drivers that:
//! - Connect to the server and build a replica from the welcome snapshot
//! - Periodically send random control inputs
//! - Replay every session event and compare checkpoints against the replica
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of drivers to spawn (default: 20)
//!   --duration S     Test duration in seconds (default: 30)
//!   --input-rate R   Input changes per second per driver (default: 4)
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use driving_shared::protocol::{hash_hex, ClientMsg, ServerMsg};
use driving_shared::{ControlInputs, WorldSimulation};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    ticks_received: AtomicU64,
    inputs_sent: AtomicU64,
    checkpoints_ok: AtomicU64,
    desyncs: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

// === Driver task ===

async fn run_driver(
    driver_id: u32,
    url: String,
    input_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if driver_id < 5 {
                eprintln!("Driver {} failed to connect: {}", driver_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for welcome message before doing anything else
    let welcome = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                match serde_json::from_str::<ServerMsg>(&text) {
                    Ok(ServerMsg::Welcome(w)) => return Some(w),
                    Ok(ServerMsg::Rejected { reason }) => {
                        if driver_id < 5 {
                            eprintln!("Driver {} rejected: {}", driver_id, reason);
                        }
                        return None;
                    }
                    _ => {}
                }
            }
        }
        None
    })
    .await;

    let welcome = match welcome {
        Ok(Some(w)) => w,
        _ => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };

    let mut world = WorldSimulation::from_snapshot(welcome.config, welcome.snapshot);
    for wire in welcome.inputs {
        world.set_control_inputs(wire.id, wire.inputs);
    }

    let input_interval = if input_rate > 0.0 {
        Duration::from_secs_f64(1.0 / input_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut input_timer = tokio::time::interval(input_interval);
    input_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = input_timer.tick() => {
                let inputs = {
                    let mut rng = rand::thread_rng();
                    ControlInputs::from_keys(
                        rng.gen_bool(0.8),
                        rng.gen_bool(0.1),
                        rng.gen_bool(0.3),
                        rng.gen_bool(0.3),
                    )
                };
                let json = match serde_json::to_string(&ClientMsg::SetInputs { inputs }) {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.inputs_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        let Ok(event) = serde_json::from_str::<ServerMsg>(&text) else {
                            continue;
                        };
                        match event {
                            ServerMsg::Joined { id, .. } => {
                                world.add_participant(id);
                            }
                            ServerMsg::Left { id, .. } => {
                                world.remove_participant(id);
                            }
                            ServerMsg::Inputs { id, inputs, .. } => {
                                world.set_control_inputs(id, inputs);
                            }
                            ServerMsg::Tick { dt, .. } => {
                                world.tick(dt);
                                metrics.ticks_received.fetch_add(1, Ordering::Relaxed);
                            }
                            ServerMsg::Checkpoint { hash, .. } => {
                                if hash == hash_hex(world.state_hash()) {
                                    metrics.checkpoints_ok.fetch_add(1, Ordering::Relaxed);
                                } else {
                                    metrics.desyncs.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            ServerMsg::Welcome(_) | ServerMsg::Rejected { .. } => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if driver_id < 3 {
                            eprintln!("Driver {} error: {}", driver_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_drivers: u32 = 20;
    let mut duration_secs: u64 = 30;
    let mut input_rate: f64 = 4.0;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_drivers = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--input-rate" => {
                i += 1;
                input_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(4.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Driving Server Load Test ===");
    println!("Drivers: {}", num_drivers);
    println!("Duration: {}s", duration_secs);
    println!("Input rate: {}/s per driver", input_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_drivers as usize);
    for driver_id in 0..num_drivers {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            run_driver(driver_id, url, input_rate, duration, metrics).await;
        }));

        // Stagger joins so late-joiner snapshots get exercised too
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();
        loop {
            interval.tick().await;
            println!(
                "[{:3}s] connected={}, msgs={}, ticks={}, inputs={}, checkpoints_ok={}, desyncs={}, errors={}",
                start.elapsed().as_secs(),
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.ticks_received.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.checkpoints_ok.load(Ordering::Relaxed),
                metrics_clone.desyncs.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let ticks = metrics.ticks_received.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!(
        "Total messages received: {}",
        metrics.messages_received.load(Ordering::Relaxed)
    );
    println!("Total inputs sent: {}", metrics.inputs_sent.load(Ordering::Relaxed));
    println!(
        "Checkpoints matched: {}",
        metrics.checkpoints_ok.load(Ordering::Relaxed)
    );
    println!("Desyncs: {}", metrics.desyncs.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }
    println!(
        "Ticks per driver per second: {:.1}",
        ticks as f64 / num_drivers.max(1) as f64 / duration_secs.max(1) as f64
    );
}
