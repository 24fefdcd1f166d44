use std::time::{SystemTime, UNIX_EPOCH};

use checkkit::rate::{get_rate, FileStore, RateError};

// Usage: cargo run --example counter_rate -- 1234
//
// Feed it an increasing counter value on each run; the store file keeps
// the previous sample between invocations, just like the value store a
// monitoring host provides to its plugins.

fn main() -> anyhow::Result<()> {
    let counter: f64 = std::env::args()
        .nth(1)
        .expect("provide a counter value")
        .parse()?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs_f64();

    let mut store = FileStore::open(std::env::temp_dir().join("checkkit-counter-rate.json"))?;
    match get_rate(&mut store, "demo.counter", now, counter) {
        Ok(rate) => println!("rate: {:.2}/s", rate),
        Err(RateError::Uninitialized(_)) => println!("counter initialized, run again"),
        Err(err) => println!("rate unavailable: {}", err),
    }
    store.persist()?;

    Ok(())
}
