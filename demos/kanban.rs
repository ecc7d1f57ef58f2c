//! Ticket board persisted to a directory per state.
//!
//! Run with `RUST_LOG=bitstate=debug cargo run --example kanban` to watch
//! the synchronizer move files around.

use bitstate::builder::{EngineBuilder, RegistryConfig};
use bitstate::persist::PersistenceSynchronizer;
use bitstate::store::FileStoreFactory;
use tracing_subscriber::EnvFilter;

const BOARD: &str = r#"{
    "bit_width": 5,
    "default_state": "backlog",
    "states": ["pending", "blocked", "doing", "review", "finished"],
    "aliases": [
        { "name": "startblock", "states": ["blocked", "pending"] },
        { "name": "doingblock", "states": ["blocked", "doing"] }
    ]
}"#;

fn show(board: &PersistenceSynchronizer<FileStoreFactory>, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = board.current_state(key)?;
    let name = board.engine().state_name(state)?;
    let content = board
        .content(key)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_else(|| "-".to_string());
    println!("{key:<6} {name:<12} {content}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let config = RegistryConfig::from_json(BOARD)?;
    let engine = EngineBuilder::new().config(&config)?.build()?;
    let registry = engine.registry().clone();
    let mut board = PersistenceSynchronizer::new(engine, FileStoreFactory::new(dir.path()));

    // stays in the backlog forever
    board.assign("foo", None, None)?;
    show(&board, "foo")?;

    board.assign("bar", None, Some(b"baz".to_vec()))?;
    board.advance("bar")?;
    show(&board, "bar")?;

    board.assign("inky", None, Some(b"pinky".to_vec()))?;
    board.move_to("inky", registry.value_of("doing")?)?;
    board.set_bit("inky", registry.value_of("blocked")?)?;
    show(&board, "inky")?;

    board.replace_content("inky", Some(b"blinky".to_vec()))?;
    show(&board, "inky")?;

    board.move_to("inky", registry.value_of("review")?)?;
    show(&board, "inky")?;

    if let Some(path) = board.locate(registry.value_of("review")?, Some("inky"))? {
        println!("inky is stored at {path}");
    }

    // a second process sees the same board after reconciling
    let engine = EngineBuilder::new().config(&config)?.build()?;
    let mut replica = PersistenceSynchronizer::new(engine, FileStoreFactory::new(dir.path()));
    let imported = replica.reconcile(None)?;
    println!("replica imported {imported} tickets");
    for key in ["foo", "bar", "inky"] {
        show(&replica, key)?;
    }

    Ok(())
}
