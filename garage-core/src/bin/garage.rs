//! Garage CLI — build, train and race hidden-attribute cars
//!
//! Commands:
//!   garage fund     — credit a wallet on the local mock ledger
//!   garage balance  — show a wallet balance
//!   garage create   — buy a new car
//!   garage list     — list the cars in a garage
//!   garage train    — train a car into a new generation
//!   garage test     — free speed test
//!   garage race     — enter a race
//!   garage races    — race history for a wallet
//!   garage demo     — run a full demo

use futures::future::join_all;
use garage_core::{Attribute, Garage, GarageConfig, MockLedger, RaceManager};
use std::env;

const LEDGER_FILE: &str = "garage-ledger.json";

fn print_usage() {
    println!(
        r#"
Garage — hidden-attribute racing on a paid ledger

Usage: garage <command> [options]

Commands:
  fund     <seed> <address> <amount>            Credit a wallet on the mock ledger
  balance  <address>                            Show a wallet balance
  create   <address> <seed>                     Buy a new car
  list     <address>                            List cars in a garage
  train    <car-id> <address> <seed> [idx...]   Train a car (indices 0-9, default all)
  test     <car-id> <address>                   Free speed test
  race     <car-id> <address> <seed>            Enter a race
  races    <address>                            Race history
  demo                                          Run full demo

Attributes:
  0=tyres 1=brakes 2=engine 3=aerodynamics 4=suspension
  5=transmission 6=fuel_system 7=electronics 8=chassis 9=cooling

Environment:
  GARAGE_CONFIG   JSON config file
  GARAGE_STORE    registry snapshot path
  RUST_LOG        log filter (default: info)
"#
    );
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let config = match GarageConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    match args[1].as_str() {
        "fund" => cmd_fund(config, &args[2..]).await,
        "balance" => cmd_balance(config, &args[2..]).await,
        "create" => cmd_create(config, &args[2..]).await,
        "list" => cmd_list(config, &args[2..]).await,
        "train" => cmd_train(config, &args[2..]).await,
        "test" => cmd_test(config, &args[2..]).await,
        "race" => cmd_race(config, &args[2..]).await,
        "races" => cmd_races(config, &args[2..]).await,
        "demo" => cmd_demo(config).await,
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
        }
    }
}

/// Load registry and ledger snapshots. Only missing files start fresh;
/// an unreadable snapshot aborts so the next save cannot overwrite it.
fn load_manager(config: GarageConfig) -> RaceManager<MockLedger> {
    let garage = match Garage::open(&config.store_path) {
        Ok(garage) => garage,
        Err(e) => {
            eprintln!("  Could not read garage {}: {}", config.store_path, e);
            std::process::exit(1);
        }
    };
    let ledger = match MockLedger::open(LEDGER_FILE, config.treasury_address.clone()) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("  Could not read ledger {}: {}", LEDGER_FILE, e);
            std::process::exit(1);
        }
    };
    println!("  {}", garage.summary());
    RaceManager::with_garage(config, garage, ledger)
}

async fn save_manager(mgr: &RaceManager<MockLedger>) {
    if let Err(e) = mgr.save().await {
        eprintln!("  Failed to save garage: {}", e);
    }
    if let Err(e) = mgr.payments().save(LEDGER_FILE).await {
        eprintln!("  Failed to save ledger: {}", e);
    }
}

async fn cmd_fund(config: GarageConfig, args: &[String]) {
    if args.len() < 3 {
        eprintln!("Usage: garage fund <seed> <address> <amount>");
        return;
    }
    let amount: f64 = match args[2].parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("  amount must be a number");
            return;
        }
    };
    let mgr = load_manager(config);
    match mgr.payments().fund(&args[0], &args[1], amount).await {
        Ok(balance) => println!("\n  {} balance: {:.2} XRP", args[1], balance),
        Err(e) => eprintln!("  Funding failed: {}", e),
    }
    save_manager(&mgr).await;
}

async fn cmd_balance(config: GarageConfig, args: &[String]) {
    let Some(address) = args.first() else {
        eprintln!("Usage: garage balance <address>");
        return;
    };
    let mgr = load_manager(config);
    match mgr.balance(address).await {
        Ok(balance) => println!("\n  {} balance: {:.2} XRP", address, balance),
        Err(e) => eprintln!("  {}", e),
    }
}

async fn cmd_create(config: GarageConfig, args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: garage create <address> <seed>");
        return;
    }
    let mgr = load_manager(config);
    match mgr.create_car(&args[0], &args[1]).await {
        Ok(car) => {
            println!("\n  Created car: {}", car.id);
            println!("  Cost: {} XRP", mgr.config.pricing.create_cost);
        }
        Err(e) => eprintln!("  Car creation failed: {}", e),
    }
    save_manager(&mgr).await;
}

async fn cmd_list(config: GarageConfig, args: &[String]) {
    let Some(owner) = args.first() else {
        eprintln!("Usage: garage list <address>");
        return;
    };
    let mgr = load_manager(config);
    let cars = mgr.list_garage(owner).await;
    if cars.is_empty() {
        println!("\n  No cars. Use 'garage create' or 'garage demo' to get started.");
        return;
    }
    println!("\n  Garage of {} ({} cars):", owner, cars.len());
    println!("  {}", "-".repeat(80));
    for car in cars {
        let trained = car
            .last_trained_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  [{}] generation={} created={} trained={}",
            car.id,
            car.generation_count,
            car.created_at.format("%Y-%m-%d %H:%M:%S"),
            trained
        );
    }
}

async fn cmd_train(config: GarageConfig, args: &[String]) {
    if args.len() < 3 {
        eprintln!("Usage: garage train <car-id> <address> <seed> [idx...]");
        return;
    }
    let mut indices = Vec::new();
    for raw in &args[3..] {
        match raw.parse::<usize>() {
            Ok(i) => indices.push(i),
            Err(_) => {
                eprintln!("  attribute index '{}' is not a number", raw);
                return;
            }
        }
    }
    let mgr = load_manager(config);
    match mgr.train(&args[0], &args[1], &args[2], Some(indices.as_slice())).await {
        Ok(outcome) => {
            println!("\n  Trained {} -> new car {}", args[0], outcome.car.id);
            println!("  Generation: {}", outcome.generation_count);
            println!("  Trained: {}", outcome.trained_attributes.join(", "));
            println!("  Payment tx: {}", outcome.tx_reference);
        }
        Err(e) => eprintln!("  Training failed: {}", e),
    }
    save_manager(&mgr).await;
}

async fn cmd_test(config: GarageConfig, args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: garage test <car-id> <address>");
        return;
    }
    let mgr = load_manager(config);
    match mgr.test_speed(&args[0], &args[1]).await {
        Ok(test) => {
            println!("\n  Speed: {:.2} km/h", test.speed);
            println!(
                "  {}",
                if test.improved { "Faster than its previous generation" } else { "No improvement" }
            );
        }
        Err(e) => eprintln!("  Speed test failed: {}", e),
    }
    save_manager(&mgr).await;
}

async fn cmd_race(config: GarageConfig, args: &[String]) {
    if args.len() < 3 {
        eprintln!("Usage: garage race <car-id> <address> <seed>");
        return;
    }
    let mgr = load_manager(config);
    match mgr.enter_race(&args[0], &args[1], &args[2]).await {
        Ok(outcome) => {
            println!(
                "\n  You placed #{} of {}. Winner: {}",
                outcome.rank, outcome.participant_count, outcome.winner_id
            );
            if outcome.prize_awarded {
                println!("  You won! Prize: {} XRP", mgr.config.pricing.race_prize);
            }
        }
        Err(e) => eprintln!("  Race entry failed: {}", e),
    }
    save_manager(&mgr).await;
}

async fn cmd_races(config: GarageConfig, args: &[String]) {
    let Some(owner) = args.first() else {
        eprintln!("Usage: garage races <address>");
        return;
    };
    let mgr = load_manager(config);
    let history = mgr.race_history(owner).await;
    println!("\n  Races for {} ({}):", owner, history.len());
    for record in history {
        println!("  {}", record.summary());
    }
}

async fn cmd_demo(config: GarageConfig) {
    println!("\n=== Garage Demo ===\n");
    let treasury = config.treasury_address.clone();
    let mgr = RaceManager::new(config, MockLedger::new(treasury.clone()));
    let owner = "rDemoWallet";
    let seed = "sDemoSecret";

    // 1. Fund a wallet
    println!("[1/5] Funding demo wallet...");
    if let Err(e) = mgr.payments().fund(seed, owner, 20.0).await {
        eprintln!("  Funding failed: {}", e);
        return;
    }

    // 2. Buy two cars
    println!("[2/5] Buying two cars...");
    let mut cars = Vec::new();
    for _ in 0..2 {
        match mgr.create_car(owner, seed).await {
            Ok(car) => {
                println!("  Created {}", car.id);
                cars.push(car);
            }
            Err(e) => {
                eprintln!("  Creation failed: {}", e);
                return;
            }
        }
    }

    // 3. Train the first car's tyres and brakes
    println!("[3/5] Training {} ({}, {})...", cars[0].id, Attribute::Tyres, Attribute::Brakes);
    let trained = match mgr.train(&cars[0].id, owner, seed, Some(&[0, 1][..])).await {
        Ok(outcome) => {
            println!("  New generation {}: {}", outcome.generation_count, outcome.car.id);
            outcome.car
        }
        Err(e) => {
            eprintln!("  Training failed: {}", e);
            return;
        }
    };

    // 4. Speed test
    println!("[4/5] Speed testing...");
    match mgr.test_speed(&trained.id, owner).await {
        Ok(test) => println!("  {:.2} km/h, improved={}", test.speed, test.improved),
        Err(e) => eprintln!("  Speed test failed: {}", e),
    }

    // 5. Race every car
    println!("[5/5] Racing the whole garage...");
    let garage = mgr.list_garage(owner).await;
    let results = join_all(garage.iter().map(|car| mgr.enter_race(&car.id, owner, seed))).await;
    for (car, result) in garage.iter().zip(results) {
        match result {
            Ok(outcome) => println!(
                "  {} placed #{} of {}{}",
                car.id,
                outcome.rank,
                outcome.participant_count,
                if outcome.prize_awarded { " (won)" } else { "" }
            ),
            Err(e) => eprintln!("  {} could not race: {}", car.id, e),
        }
    }

    if let Ok(balance) = mgr.balance(owner).await {
        println!("\n  Wallet balance: {:.2} XRP", balance);
    }
    if let Ok(balance) = mgr.balance(&treasury).await {
        println!("  Treasury balance: {:.2} XRP", balance);
    }
    println!("  {}", mgr.summary().await);
    println!("\n=== Demo complete ===");
}
