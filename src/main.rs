use flockpaint::prelude::*;

fn main() {
    env_logger::init();

    let result = Simulation::new()
        .with_parameters(SimulationParameters::flocking_preset())
        .run();

    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
