//! A single store: load, observe, reload and reset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storekeeper::{StartOptions, Store};

#[derive(Clone, Debug, Default)]
struct User {
    name: String,
    email: String,
}

#[derive(Clone, Debug)]
struct Accidents(u32);

async fn fetch_user(id: &'static str) -> anyhow::Result<User> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(match id {
        "leela" => User {
            name: "Leela".to_string(),
            email: "turanga.leela@futurama.co".to_string(),
        },
        _ => User {
            name: "Bender".to_string(),
            email: "bender.rodriguez@futurama.co".to_string(),
        },
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    println!("=== Store Example: Users ===\n");

    let store: Store<&'static str, User, Accidents> = Store::builder(User::default, fetch_user)
        .summarizer(|_id, user: User| async move {
            Ok(Accidents(if user.name == "Bender" { 10 } else { 1 }))
        })
        .build();

    let called = Arc::new(AtomicUsize::new(0));
    let _subscription = store.subscribe("demo", {
        let store = store.clone();
        let called = called.clone();
        move || {
            called.fetch_add(1, Ordering::SeqCst);
            if store.is_ready() {
                println!("   [Store Update] {:?}", store.state());
            } else {
                println!("   [Store Update] {:?}", store.readiness());
            }
        }
    });

    println!("1. Loading bender");
    store.start("bender", StartOptions::default()).await;
    println!("   accidents = {:?}", store.summary());

    println!("\n2. Loading again without forcing (skipped)");
    store.start("leela", StartOptions::default()).await;

    println!("\n3. Forcing a reload of leela");
    store.start("leela", StartOptions::forced()).await;
    println!("   accidents = {:?}", store.summary());

    println!("\n4. Resetting");
    store.reset();
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("   state = {:?}, summary = {:?}", store.state(), store.summary());

    println!("\ncalled = {}", called.load(Ordering::SeqCst));
}
