//! Tracing setup for hosts embedding the detector.
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

const CRATE_TARGET: &str = "crypto_detection_core";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    /// Per-unit summaries and every emitted finding.
    Verbose,
    Debug,
    /// Resolution steps, hook deliveries and trace rejections.
    Trace,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives. Findings are logged by the handler at debug,
    /// so `Verbose` lifts that module alone.
    fn directives(self) -> String {
        let level = self.level();
        match self {
            Self::Verbose => format!("{CRATE_TARGET}={level},{CRATE_TARGET}::handler=debug"),
            _ => format!("{CRATE_TARGET}={level}"),
        }
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity level. Returns `false` when
/// a subscriber was already installed (embedding hosts, repeated test setup).
pub fn init(verbosity: Verbosity) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(verbosity >= Verbosity::Debug)
        .with_file(verbosity >= Verbosity::Trace)
        .with_line_number(verbosity >= Verbosity::Trace)
        .compact();

    let installed = match verbosity {
        Verbosity::Quiet => subscriber.with_writer(std::io::sink).try_init(),
        Verbosity::Normal | Verbosity::Verbose => subscriber.without_time().try_init(),
        _ => subscriber.try_init(),
    };
    installed.is_ok()
}
