use careintake::RunMode;

#[tokio::main]
async fn main() {
    careintake::init_tracing();

    let mode = if std::env::args().skip(1).any(|arg| arg == "--cli") {
        RunMode::Terminal
    } else {
        RunMode::Http
    };

    if let Err(e) = careintake::run(mode).await {
        tracing::error!(error = %e, "CareIntake failed");
        std::process::exit(1);
    }
}
