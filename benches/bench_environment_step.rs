// benches/bench_environment_step.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use signal_rl_env::{Action, Actions, EnvConfig, Environment, Frame, Script, ScriptedSimulator};
use std::time::Duration;

// Helper to build an environment over `n` scripted intersections.
fn create_environment(n: usize) -> Environment<ScriptedSimulator> {
    let frames: Vec<Frame> = (0..20)
        .map(|i| {
            let occupancy = (i as f64 * 0.05, 1.0 - i as f64 * 0.05);
            Frame::new((i / 5 % 2) * 2, occupancy, (i, 20 - i))
        })
        .collect();
    let mut script = Script::default();
    for i in 0..n {
        script = script.with_intersection(format!("tls_{}", i), frames.clone());
    }
    let mut config = EnvConfig::new("bench.sumocfg");
    config.episode_length = f64::MAX;
    Environment::new(ScriptedSimulator::new(script), config).unwrap()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("environment_step");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Benchmark for environments with 1, 16, and 64 signals.
    for &size in [1usize, 16, 64].iter() {
        group.bench_function(format!("signals_{}", size), |b| {
            let mut env = create_environment(size);
            env.reset().unwrap();
            let mut toggle = false;
            b.iter(|| {
                toggle = !toggle;
                let action = if toggle { Action::Keep } else { Action::Change };
                let actions: Actions = env
                    .intersection_ids()
                    .map(|id| (id.clone(), action))
                    .collect();
                black_box(env.step(&actions).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
