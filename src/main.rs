// src/main.rs

use kiosk::{apply_overrides, cli, config, config_path, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("kiosk error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let mut cfg = config::load_and_validate(config_path(&args))?;
    apply_overrides(&mut cfg, &args);
    logging::init_logging(args.log_level, cfg.session.session_log.as_deref())?;
    run(args, cfg).await
}
