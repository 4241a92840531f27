use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,chartwatch=debug";

/// JSON lines when asked for or when stderr is not a terminal
pub fn init(force_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let json = force_json || !atty::is(atty::Stream::Stderr);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}
