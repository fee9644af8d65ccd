//! A collection of two user groups whose accident counts are summed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storekeeper::{Collection, StartOptions, Store};

#[derive(Clone, Debug, Default)]
struct User {
    name: String,
    email: String,
}

#[derive(Clone, Debug, Default)]
struct Accidents(u32);

type Users = Store<&'static str, User, Accidents>;

fn users(_group: &&'static str) -> Users {
    Store::builder(User::default, |group: &'static str| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(if group == "RELIABLE" {
            User {
                name: "Leela".to_string(),
                email: "turanga.leela@futurama.co".to_string(),
            }
        } else {
            User {
                name: "Bender".to_string(),
                email: "bender.rodriguez@futurama.co".to_string(),
            }
        })
    })
    .summarizer(|_group, user: User| async move {
        Ok(Accidents(if user.name == "Bender" { 10 } else { 1 }))
    })
    .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Collection Example: Accidents ===\n");

    let collection = Collection::builder(["RELIABLE", "UNRELIABLE"], users)
        .zero_summary(Accidents::default)
        .reducer(|acc: Accidents, users: &Users| match users.summary() {
            Some(Accidents(n)) => Accidents(acc.0 + n),
            None => acc,
        })
        .build()?;

    let called = Arc::new(AtomicUsize::new(0));
    let subscription = collection.subscribe("demo", {
        let collection = collection.clone();
        let called = called.clone();
        move || {
            called.fetch_add(1, Ordering::SeqCst);
            if collection.is_ready() {
                for (group, users) in collection.members() {
                    println!("   {group} users: {:?}", users.state());
                }
            } else {
                println!("   ...not ready yet...");
            }
        }
    });

    collection.start(StartOptions::default());
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\ncalled = {}", called.load(Ordering::SeqCst));
    println!("ready = {}", collection.is_ready());
    println!("accidents = {:?}", collection.summary().map(|a| a.0));

    subscription.unsubscribe();
    Ok(())
}
