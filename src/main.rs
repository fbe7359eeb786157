// Headless NEO orbit viewer

use neo_orbit_viewer::config::ViewerConfig;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ViewerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(2);
        }
    };

    if let Err(err) = neo_orbit_viewer::run(config).await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
