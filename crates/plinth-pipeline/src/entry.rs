//! Top-level entry plan.

use std::fmt;

use crate::context::Mode;

/// Long-running parts of the default invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Build,
    Watch,
    DevServer,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Service::Build => "build",
            Service::Watch => "watch",
            Service::DevServer => "dev-server",
        })
    }
}

/// Services the default invocation runs, concurrently.
pub fn plan_services(mode: Mode) -> Vec<Service> {
    match mode {
        Mode::Development => vec![Service::Build, Service::Watch, Service::DevServer],
        Mode::Production => vec![Service::Build],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_only_builds() {
        assert_eq!(plan_services(Mode::Production), vec![Service::Build]);
    }

    #[test]
    fn development_watches_and_serves() {
        let plan = plan_services(Mode::Development);
        assert!(plan.contains(&Service::Build));
        assert!(plan.contains(&Service::Watch));
        assert!(plan.contains(&Service::DevServer));
    }
}
