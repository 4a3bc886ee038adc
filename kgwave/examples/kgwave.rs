use common::{grid::Grid, interfaces::SimulatorInterface};
use kgwave::{
    decomposer::{Decomposer, DecompositionConfig},
    simulator::FieldSimulator,
};

/// A plucked string: a triangle released from rest.
fn plucked(x: f64) -> f64 {
    if x < 0.3 {
        x / 0.3
    } else {
        (1.0 - x) / 0.7
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let config = DecompositionConfig::<f64>::from_env()?;
    let grid = Grid::<f64>::uniform(200);
    let y0: Vec<f64> = grid.points().iter().copied().map(plucked).collect();
    let ydot0 = vec![0.0; grid.len()];

    let solution = Decomposer::new(config)?.par_from_initial_data(grid.points(), &y0, &ydot0)?;
    println!(
        "# mu = {}, modes = {}, energy = {}",
        config.mu(),
        solution.len(),
        solution.energy()
    );

    let mut simulator = FieldSimulator::new(solution, grid);
    println!("time,total_energy,midpoint_field");
    for _ in 0..50 {
        simulator.update(2e-2);
        let frame = simulator.current();
        println!(
            "{:.3},{:.9},{:.6}",
            frame.time,
            frame.total_energy,
            frame.field[frame.field.len() / 2]
        );
    }
    println!("# energy drift = {:e}", simulator.energy_drift());

    Ok(())
}
