extern crate driver;
extern crate env_logger;

#[macro_use]
extern crate log;

use std::env;

use driver::Config;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("USAGE: gogame configpath");
        std::process::exit(1);
    }

    let config = match Config::from_file(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Could not load {}: {}", args[1], e);
            std::process::exit(1);
        }
    };
    info!("Playing against {}", config.server);

    if let Err(e) = driver::run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}
