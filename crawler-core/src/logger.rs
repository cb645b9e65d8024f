use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initializes the process-wide logger. `rank` is prefixed onto every line so
/// that interleaved coordinator/worker logs (e.g. when tee'd together by an
/// external supervisor) stay attributable.
pub fn init_logger(rank: usize, is_verbose: bool) -> log4rs::Handle {
    let pattern = PatternEncoder::new(&format!(
        "{{d(%Y-%m-%d %H:%M:%S%.3f)}} [rank {rank}] [{{M}}:{{L}} {{T}}] {{h({{l}})}} {{m}}{{n}}"
    ));

    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(pattern))
        .build();

    let root_level = if is_verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(console)))
        .logger(Logger::builder().build("rustls", log::LevelFilter::Error))
        .logger(Logger::builder().build("tarpc", log::LevelFilter::Error))
        .build(Root::builder().appender("stderr").build(root_level))
        .expect("could not configure logger");

    log4rs::init_config(config).expect("could not start logger")
}
