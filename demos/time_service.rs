//! # Example: Time Service Console
//!
//! Interactive pool of "time service" workers. Each worker gets a random average
//! latency on spawn and answers every request with the current time.
//!
//! Commands (one per line on stdin):
//! - `spawn`: start a worker and add it to the rotation
//! - `kill`:  terminate a random worker (its handle is evicted on the next dispatch)
//! - `time`:  ask the pool for the time, waiting at most `--reply-timeout`
//! - `list`:  show the running workers and the rotation
//! - `quit`:  shut down
//!
//! Run with:
//! ```text
//! RUST_LOG=poolvisor=info cargo run --example time_service --features logging -- --workers 3
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use poolvisor::{
    BackpressurePolicy, Config, LogWriter, Pool, PoolBuilder, RequestError, Selector, Subscribe,
    WorkerFn, WorkerRef, WorkerSpec,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workers started before the console opens
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Capacity of each worker inbox
    #[arg(long, default_value_t = 10)]
    inbox: usize,

    /// Seconds a `time` request waits for its answer (0 = forever)
    #[arg(long, default_value_t = 5)]
    reply_timeout: u64,

    /// Full-inbox handling: wait, retry or evict
    #[arg(long, default_value = "retry")]
    backpressure: String,

    /// Remove a worker's handle as soon as it stops
    #[arg(long, default_value_t = false)]
    evict_on_stop: bool,

    /// Seconds to wait for workers on shutdown
    #[arg(long, default_value_t = 5)]
    grace: u64,
}

/// Answer of a time service worker.
#[derive(Debug)]
struct Tick {
    now: SystemTime,
    took: Duration,
}

const COMMANDS: &str = "commands: spawn | kill | time | list | quit";

/// Worker with a random average latency of up to 3s; each request takes
/// `avg + 1s - rand(0..1s)`.
fn time_service() -> WorkerRef<(), Tick> {
    let avg = Duration::from_secs_f64(rand::rng().random_range(0.0..3.0));
    WorkerFn::arc("time_service", move |()| async move {
        let took = avg + Duration::from_secs(1)
            - Duration::from_secs_f64(rand::rng().random_range(0.0..1.0));
        tokio::time::sleep(took).await;
        Tick {
            now: SystemTime::now(),
            took,
        }
    })
}

fn config(args: &Args) -> anyhow::Result<Config> {
    let backpressure = match args.backpressure.as_str() {
        "wait" => BackpressurePolicy::Wait,
        "retry" => BackpressurePolicy::default(),
        "evict" => BackpressurePolicy::Evict,
        other => anyhow::bail!("unknown backpressure policy {other:?} (wait | retry | evict)"),
    };
    Ok(Config {
        inbox_capacity: args.inbox,
        reply_timeout: Duration::from_secs(args.reply_timeout),
        grace: Duration::from_secs(args.grace),
        backpressure,
        evict_on_stop: args.evict_on_stop,
        ..Config::default()
    })
}

async fn spawn(pool: &Pool<(), Tick>) {
    let spec = WorkerSpec::with_defaults(time_service(), pool.config());
    let id = pool.spawn_worker(spec).await;
    println!("spawned {id}");
}

async fn ask_time(pool: Arc<Pool<(), Tick>>) {
    match pool.request(()).await {
        Ok(tick) => {
            let secs = tick.now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            println!("time: {secs} (unix seconds), served in {:.2?}", tick.took);
        }
        Err(RequestError::Dispatch(err)) => println!("no time for you: {err}"),
        Err(RequestError::Reply(err)) => println!("time request failed: {err}"),
        Err(err) => println!("time request failed: {err}"),
    }
}

async fn list(pool: &Pool<(), Tick>) {
    for (id, name) in pool.manager().list().await {
        println!("  running  {id}  {name}");
    }
    println!("  rotation {:?}", pool.workers().await);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("poolvisor=info")),
        )
        .init();

    let args = Args::parse();
    let cfg = config(&args)?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let pool = Arc::new(PoolBuilder::new(cfg).with_subscribers(subs).build::<(), Tick>());
    for _ in 0..args.workers {
        spawn(&pool).await;
    }

    println!("{COMMANDS}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("interrupted");
                break;
            }
        };
        let Some(line) = line else { break };

        match line.trim() {
            "spawn" => spawn(&pool).await,
            "kill" => match pool.terminate(Selector::Random).await {
                Some(id) => println!("killed {id}"),
                None => println!("nothing to kill"),
            },
            "time" => {
                tokio::spawn(ask_time(Arc::clone(&pool)));
            }
            "list" => list(&pool).await,
            "quit" | "exit" => break,
            "" => {}
            _ => println!("{COMMANDS}"),
        }
    }

    if let Err(err) = pool.shutdown().await {
        tracing::error!(error = %err, label = err.as_label(), "shutdown incomplete");
    }
    Ok(())
}
