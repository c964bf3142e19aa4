use super::stack::Stack;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which stacks a package name is meant to be used from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageScope {
    BackendOnly,
    FrontendOnly,
    Shared,
}

/// Closed set of package names accepted by the ingestion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    // backend
    Cache,
    Controller,
    CronJob,
    Db,
    Domain,
    Handler,
    Repository,
    Route,
    Service,
    // frontend
    Api,
    Component,
    Hook,
    Page,
    State,
    Style,
    // shared
    Auth,
    Config,
    Middleware,
    Utils,
}

impl Package {
    pub const ALL: [Package; 19] = [
        Package::Cache,
        Package::Controller,
        Package::CronJob,
        Package::Db,
        Package::Domain,
        Package::Handler,
        Package::Repository,
        Package::Route,
        Package::Service,
        Package::Api,
        Package::Component,
        Package::Hook,
        Package::Page,
        Package::State,
        Package::Style,
        Package::Auth,
        Package::Config,
        Package::Middleware,
        Package::Utils,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Package::Cache => "cache",
            Package::Controller => "controller",
            Package::CronJob => "cron_job",
            Package::Db => "db",
            Package::Domain => "domain",
            Package::Handler => "handler",
            Package::Repository => "repository",
            Package::Route => "route",
            Package::Service => "service",
            Package::Api => "api",
            Package::Component => "component",
            Package::Hook => "hook",
            Package::Page => "page",
            Package::State => "state",
            Package::Style => "style",
            Package::Auth => "auth",
            Package::Config => "config",
            Package::Middleware => "middleware",
            Package::Utils => "utils",
        }
    }

    pub fn scope(&self) -> PackageScope {
        match self {
            Package::Cache
            | Package::Controller
            | Package::CronJob
            | Package::Db
            | Package::Domain
            | Package::Handler
            | Package::Repository
            | Package::Route
            | Package::Service => PackageScope::BackendOnly,
            Package::Api
            | Package::Component
            | Package::Hook
            | Package::Page
            | Package::State
            | Package::Style => PackageScope::FrontendOnly,
            Package::Auth | Package::Config | Package::Middleware | Package::Utils => {
                PackageScope::Shared
            }
        }
    }

    pub fn is_allowed_in(&self, stack: Stack) -> bool {
        matches!(
            (self.scope(), stack),
            (PackageScope::Shared, _)
                | (PackageScope::BackendOnly, Stack::Backend)
                | (PackageScope::FrontendOnly, Stack::Frontend)
        )
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Package {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Package::ALL
            .into_iter()
            .find(|package| package.as_str() == s)
            .ok_or(())
    }
}
