//! Headless factory: a few ore → plate lines running with no renderer.
//!
//! Builds stacked production lines, runs them for a number of simulated
//! seconds in one-second frames and logs money and item counts as it goes.
//!
//! Run with: `cargo run -p beltworks-examples --example headless_factory -- [seconds] [config] [save]`
//!
//! - `seconds`: simulated time to run (default 60)
//! - `config`: a `.ron`, `.toml` or `.json` sim config
//! - `save`: where to write a binary save when the run ends
//!
//! Set `RUST_LOG=debug` to watch inference passes and tile rebuilds.

use beltworks_core::config::SimConfig;
use beltworks_core::event::{Event, EventKind};
use beltworks_core::world::World;
use beltworks_examples::{build_plate_line, init_tracing, plate_line_width};
use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{error, info};

const LINES: u32 = 3;
const GAP: u32 = 2;

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let seconds: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60);
    let config_path = args.next().map(PathBuf::from);
    let save_path = args.next().map(PathBuf::from);

    let config = match &config_path {
        Some(path) => match beltworks_data::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };

    let mut world = match World::with_config(plate_line_width(GAP), LINES * 2, config) {
        Ok(world) => world,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    for row in 0..LINES {
        build_plate_line(&mut world, (row * 2) as i32, GAP);
    }
    info!(
        width = world.grid().width(),
        height = world.grid().height(),
        tiles = world.entities().count(),
        "factory built"
    );

    let sold = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&sold);
    world.events_mut().on(
        EventKind::ItemSold,
        Box::new(move |e| {
            if let Event::ItemSold { amount, .. } = e {
                counter.set(counter.get() + u64::from(*amount));
            }
        }),
    );

    for second in 1..=seconds {
        world.update(1.0);
        if second % 10 == 0 || second == seconds {
            info!(
                second,
                tick = world.tick(),
                money = world.economy().balance(),
                in_flight = world.item_count(),
                sold = sold.get(),
                "progress"
            );
        }
    }

    info!(
        earned = world.economy().earned(),
        sold = sold.get(),
        state_hash = %format!("{:016X}", world.state_hash()),
        "run finished"
    );

    if let Some(path) = save_path
        && let Err(e) = beltworks_data::write_save_file(&world, &path)
    {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
