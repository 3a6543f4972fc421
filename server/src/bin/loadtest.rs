//! Load test for the disaster server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the server
//! - Repeatedly drag their own shape around via update_shape
//! - Receive and count shape_changed / time_update broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --move-rate R    Shape moves per second per client (default: 10)
//!   --url URL        Server URL (default: ws://127.0.0.1:9001/ws)

use disaster_shared::protocol::{ClientMsg, ServerMsg, ShapeWire};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    shape_changes_received: AtomicU64,
    time_updates_received: AtomicU64,
    own_echoes_received: AtomicU64,
    moves_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            shape_changes_received: AtomicU64::new(0),
            time_updates_received: AtomicU64::new(0),
            own_echoes_received: AtomicU64::new(0),
            moves_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    move_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let move_interval = if move_rate > 0.0 {
        Duration::from_secs_f64(1.0 / move_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };

    let mut move_timer = tokio::time::interval(move_interval);
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shape_id = format!("loadtest-{}", client_id);
    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = move_timer.tick() => {
                let (left, top) = {
                    let mut rng = rand::thread_rng();
                    (rng.gen_range(0.0..1024.0), rng.gen_range(0.0..768.0))
                };
                let msg = ClientMsg::UpdateShape(ShapeWire {
                    id: shape_id.clone(),
                    left,
                    top,
                    full: false,
                });
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.moves_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::ShapeChanged(shape)) => {
                                metrics.shape_changes_received.fetch_add(1, Ordering::Relaxed);
                                if shape.id == shape_id {
                                    metrics.own_echoes_received.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Ok(ServerMsg::TimeUpdate(_)) => {
                                metrics.time_updates_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::SessionEnded(end)) => {
                                if client_id == 0 {
                                    println!(
                                        "Session ended: {} survivors, {} victims",
                                        end.survivor_count, end.victim_count
                                    );
                                }
                            }
                            Ok(_) => {}
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => {}
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

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut move_rate: f64 = 10.0;
    let mut url = "ws://127.0.0.1:9001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--move-rate" => {
                i += 1;
                move_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Disaster Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Move rate: {}/s per client", move_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, move_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, shape_changes={}, time_updates={}, moves={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.shape_changes_received.load(Ordering::Relaxed),
                metrics_clone.time_updates_received.load(Ordering::Relaxed),
                metrics_clone.moves_sent.load(Ordering::Relaxed),
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
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let shape_changes = metrics.shape_changes_received.load(Ordering::Relaxed);
    let time_updates = metrics.time_updates_received.load(Ordering::Relaxed);
    let echoes = metrics.own_echoes_received.load(Ordering::Relaxed);
    let moves = metrics.moves_sent.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total shape_changed messages: {}", shape_changes);
    println!("Total time_update messages: {}", time_updates);
    println!("Own shape echoes (should be 0): {}", echoes);
    println!("Total update_shape sent: {}", moves);
    println!("Total errors: {}", errors);

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    // At most one shape_changed per 40ms tick reaches each client.
    let per_client = shape_changes as f64 / num_clients.max(1) as f64;
    let ceiling = duration_secs as f64 * 25.0;
    println!();
    println!("Shape changes per client: {:.1}", per_client);
    println!("Rate ceiling per client: {:.1}", ceiling);
    println!(
        "Coalesced away: {:.1}%",
        if moves > 0 {
            100.0 - (shape_changes as f64 / (moves as f64 * (num_clients.max(2) - 1) as f64))
                * 100.0
        } else {
            0.0
        }
    );
}
