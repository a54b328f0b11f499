use clap::Parser;
use paged_hash::LongLongHashMap;
use paged_hash::PagePool;
use paged_hash::PoolConfig;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "entries", default_value_t = 100_000)]
    entries: usize,
    #[arg(short = 'c', long = "initial_capacity", default_value_t = 0)]
    initial_capacity: usize,
    #[arg(short = 'l', long = "load_factor", default_value_t = 0.6)]
    load_factor: f32,
    #[arg(short = 's', long = "stride", default_value_t = 1)]
    stride: i64,
    #[arg(short = 'p', long = "page_words", default_value_t = 2048)]
    page_words: usize,
}

fn main() -> paged_hash::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pool = PagePool::new(PoolConfig::default().page_words(args.page_words))?;
    let mut map = LongLongHashMap::with_capacity(args.initial_capacity, args.load_factor, &pool)?;
    println!(
        "Created map: {} buckets, load factor {}",
        map.capacity(),
        args.load_factor
    );

    for i in 0..args.entries as i64 {
        map.put(i * args.stride, i)?;
    }

    println!("Inserted {} entries", map.len());
    println!(
        "Final capacity: {} buckets ({:.2}% full)",
        map.capacity(),
        map.len() as f64 / map.capacity() as f64 * 100.0
    );
    println!(
        "Pool: {} pages in use, {} cached, {} words per page",
        pool.pages_in_use(),
        pool.pages_cached(),
        pool.page_words()
    );
    map.probe_histogram().print();

    map.release();
    println!(
        "After release: {} pages in use, {} cached",
        pool.pages_in_use(),
        pool.pages_cached()
    );
    Ok(())
}
