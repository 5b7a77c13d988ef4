//! Tracing subscriber bootstrap.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber for the whole process.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. `"warn"` or
/// `"lumen_ecs=debug,info"`) is used. Returns `false` if a global subscriber
/// was already installed, so calling this more than once is harmless.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init("warn");
        assert!(!init("debug"));
    }
}
