use rand::rngs::StdRng;
use rand::SeedableRng;
use scan_rnn::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn main() -> Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            TrainingConfiguration::from_json_file(path)?
        }
        None => TrainingConfiguration::default(),
    };
    info!("{:?}", config);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let train_data = generate_parity_data(config.train_examples, &mut rng);
    let mut network = config.build_network(&mut rng);

    let first = &train_data.examples()[0];
    println!("Input:\n{}", first);
    println!("Prediction before training:\n{}", network.predict(first)?);

    let stop = config.stop_condition();
    let report = match config.optimizer {
        OptimizerKind::GradientDescent => {
            let train = train_gd_host(
                &network,
                train_data.examples(),
                train_data.labels(),
                config.learning_rate,
            )?;
            fit_steps(&mut network, train, &stop, config.report_every)?
        }
        OptimizerKind::AdamW => {
            let objective =
                network.prepare_objective(train_data.examples(), train_data.labels())?;
            let mut optimizer = config.build_optimizer();
            fit(
                &mut network,
                &objective,
                optimizer.as_mut(),
                &stop,
                config.report_every,
            )?
        }
    };
    info!(
        "Trained {} epochs, final loss {} ({})",
        report.epochs, report.final_loss, report.stop_reason
    );

    println!("Label:\n{}", train_data.labels()[0]);
    println!("Prediction after training:\n{}", network.predict(first)?);

    let test_data = generate_parity_data(config.test_examples, &mut rng);
    for (example, label) in test_data.iter() {
        println!("Test input:\n{}", example);
        println!("Label:\n{}", label);
        println!("Prediction:\n{}", network.predict(example)?);
    }
    if !test_data.is_empty() {
        let eval = network.evaluate(&test_data)?;
        info!(
            "Test loss {:.5}, accuracy {:.3}",
            eval.loss, eval.accuracy
        );
    }
    Ok(())
}
