use beehive_cli::{App, logging};
use beehive_config::ConfigStore;
use beehive_util::Console;

#[tokio::main]
async fn main() {
    let config = ConfigStore::from_default_location();
    if let Err(err) = logging::init(config.main().ok()) {
        eprintln!("warning: logging disabled ({err:#})");
    }

    let mut app = App::new(config, Console::stdio());
    let outcome = app.run_until(std::env::args(), shutdown_signal()).await;
    if let Err(err) = &outcome {
        app.report(err);
    }
    std::process::exit(App::exit_code(&outcome));
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
