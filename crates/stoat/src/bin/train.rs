// train — run or evaluate a named experiment from the built-in registry

use clap::Parser;

use stoat::{evaluate, train, ModelRegistry};
use stoat_config::experiments;

#[derive(Parser)]
#[command(name = "train", about = "Train or evaluate a configured experiment")]
struct Args {
    /// Experiment name from the registry (see --list)
    #[arg(required_unless_present = "list")]
    experiment: Option<String>,

    /// Override the experiment's task
    #[arg(short, long)]
    task: Option<String>,

    /// Override the experiment's model type
    #[arg(short, long)]
    model: Option<String>,

    /// Evaluate on the test split instead of training
    #[arg(long)]
    eval: bool,

    /// List registered experiments and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> stoat::Result<()> {
    let registry = experiments::builtin()?;

    if args.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    // clap guarantees the name is present when --list is absent
    let name = args.experiment.unwrap_or_default();
    let cfg = registry.resolve_with(&name, args.task.as_deref(), args.model.as_deref())?;

    if let Some(description) = &cfg.description {
        println!("{description}");
    }
    print!("{}", cfg.dump());

    let models = ModelRegistry::with_defaults();
    if args.eval {
        match evaluate(&cfg, &models)? {
            Some((loss, accuracy)) => println!("test loss {loss:.4}, accuracy {accuracy:.4}"),
            None => println!("test split is empty, nothing to evaluate"),
        }
    } else {
        match train(&cfg, &models)? {
            Some(outcome) => println!("{outcome}"),
            None => println!("training split is empty, nothing to train"),
        }
    }
    Ok(())
}
